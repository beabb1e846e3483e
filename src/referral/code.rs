/// 추천 코드
/// 형식: `CX` + 회원 id 앞 8자리(16진수)를 대문자로
use crate::error::ServiceError;

pub const CODE_PREFIX: &str = "CX";
const CODE_BODY_LEN: usize = 8;

/// 회원 id로부터 추천 코드 생성
pub fn referral_code_for(user_id: &str) -> Result<String, ServiceError> {
    let body: String = user_id.chars().take(CODE_BODY_LEN).collect();
    if body.chars().count() < CODE_BODY_LEN || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ServiceError::InvalidCode(format!(
            "회원 id로 추천 코드를 만들 수 없습니다: {}",
            user_id
        )));
    }
    Ok(format!("{}{}", CODE_PREFIX, body.to_ascii_uppercase()))
}

/// 입력된 추천 코드를 정규화 (공백 제거, 대문자)
pub fn normalize_code(code: &str) -> Result<String, ServiceError> {
    let normalized = code.trim().to_ascii_uppercase();
    let valid = normalized
        .strip_prefix(CODE_PREFIX)
        .map(|body| body.len() == CODE_BODY_LEN && body.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if !valid {
        return Err(ServiceError::InvalidCode(code.to_string()));
    }
    Ok(normalized)
}

/// 공유 링크
pub fn share_url(code: &str) -> String {
    format!("https://app.cathay-universe.com?ref={}", code)
}

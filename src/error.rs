// region:    --- Imports
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Service Error
/// 엔진이 호출자에게 동기적으로 돌려주는 도메인 오류
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("현재 상태에서 허용되지 않는 요청입니다: {0}")]
    InvalidState(String),
    #[error("입찰 금액이 너무 낮습니다: {amount} (최소 {minimum})")]
    BidTooLow { amount: i64, minimum: i64 },
    #[error("유효하지 않은 추천 코드입니다: {0}")]
    InvalidCode(String),
    #[error("본인을 추천할 수 없습니다.")]
    SelfReferral,
    #[error("대상을 찾을 수 없습니다: {0}")]
    NotFound(String),
    #[error("마일리지가 부족합니다: 필요 {required}, 보유 {available}")]
    InsufficientMiles { required: i64, available: i64 },
    #[error("잘못된 요청입니다: {0}")]
    BadRequest(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidState(_) => "INVALID_STATE",
            ServiceError::BidTooLow { .. } => "BID_TOO_LOW",
            ServiceError::InvalidCode(_) => "INVALID_CODE",
            ServiceError::SelfReferral => "SELF_REFERRAL",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::InsufficientMiles { .. } => "INSUFFICIENT_MILES",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidState(_) => StatusCode::CONFLICT,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BidTooLow { .. }
            | ServiceError::InvalidCode(_)
            | ServiceError::SelfReferral
            | ServiceError::InsufficientMiles { .. }
            | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}
// endregion: --- Service Error

// region:    --- App Error
/// HTTP 계층 오류
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Service(e) => (e.status(), e.code(), e.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
// endregion: --- App Error

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_codes_and_statuses() {
        let low = ServiceError::BidTooLow {
            amount: 10400,
            minimum: 10500,
        };
        assert_eq!(low.code(), "BID_TOO_LOW");
        assert_eq!(low.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::InvalidState("ended".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::NotFound("auction 1".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ServiceError::SelfReferral.code(), "SELF_REFERRAL");
    }

    #[test]
    fn app_error_keeps_service_status() {
        let response = AppError::from(ServiceError::InvalidCode("CX1".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

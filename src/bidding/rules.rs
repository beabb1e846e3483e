/// 입찰 규칙
/// 1. 최소 입찰가 (현재가 + 호가 단위)
/// 2. 마감 직전 입찰 시 마감 연장
// region:    --- Imports
use crate::error::ServiceError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Constants
/// 마감 전 이 시간 안에 들어온 입찰은 마감을 연장시킨다.
pub fn closing_window() -> Duration {
    Duration::minutes(5)
}

/// 한 번의 연장 폭
pub fn extension() -> Duration {
    Duration::minutes(5)
}

/// 낙찰자가 낙찰 물품을 교환해야 하는 기한
pub fn claim_window() -> Duration {
    Duration::days(7)
}

/// 유찰 보증금 환불 보장 기한
pub fn refund_deadline() -> Duration {
    Duration::hours(24)
}

/// "곧 종료" 판단 기준
pub fn ending_soon_window() -> Duration {
    Duration::hours(1)
}
// endregion: --- Constants

// region:    --- Bid Policy
/// 호가 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BidPolicy {
    /// 현재가 + 호가 단위 이상이면 자유롭게 입찰
    #[default]
    AtLeastIncrement,
    /// 정확히 현재가 + 호가 단위만 허용
    ExactIncrement,
}

/// 다음 최소 입찰가. i64 범위를 넘으면 None (더 이상 입찰 불가)
pub fn minimum_next_bid(current_bid: i64, bid_increment: i64) -> Option<i64> {
    current_bid.checked_add(bid_increment)
}

/// 입찰 금액 검증
pub fn check_bid_amount(
    policy: BidPolicy,
    current_bid: i64,
    bid_increment: i64,
    amount: i64,
) -> Result<(), ServiceError> {
    let out_of_range =
        || ServiceError::BadRequest("입찰 가능한 금액 범위를 넘었습니다.".to_string());
    let minimum = minimum_next_bid(current_bid, bid_increment).ok_or_else(out_of_range)?;
    // 수락된 입찰 뒤에도 다음 최소 입찰가를 계산할 수 있어야 한다.
    minimum_next_bid(amount, bid_increment).ok_or_else(out_of_range)?;
    let accepted = match policy {
        BidPolicy::AtLeastIncrement => amount >= minimum,
        BidPolicy::ExactIncrement => amount == minimum,
    };
    if !accepted {
        return Err(ServiceError::BidTooLow { amount, minimum });
    }
    Ok(())
}
// endregion: --- Bid Policy

// region:    --- Extension
/// 마감 연장 계산
/// 마감 5분 전 이내의 입찰이면 연장된 마감 시간을 돌려준다.
pub fn extended_end(ends_at: DateTime<Utc>, placed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if placed_at < ends_at && ends_at - placed_at <= closing_window() {
        Some(ends_at + extension())
    } else {
        None
    }
}
// endregion: --- Extension

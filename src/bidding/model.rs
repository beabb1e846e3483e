use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 입찰 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub auction_item_id: i64,
    pub bidder_id: String,
    pub amount: i64,
    pub placed_at: DateTime<Utc>,
    /// 이 입찰로 새로 묶인 보증금 (이미 묶여 있었다면 0)
    pub deposit_amount: i64,
}

// 보증금 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldStatus {
    /// 마일리지에서 차감되어 보관 중
    Held,
    /// 유찰로 환불됨
    Refunded,
    /// 낙찰 교환 대금에 충당됨
    Applied,
    /// 낙찰 미교환(기한 경과)으로 반환됨
    Released,
}

// 보증금 모델 (경매, 입찰자당 하나)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositHold {
    pub auction_item_id: i64,
    pub bidder_id: String,
    pub amount: i64,
    pub status: HoldStatus,
    pub held_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl DepositHold {
    pub fn is_held(&self) -> bool {
        self.status == HoldStatus::Held
    }
}

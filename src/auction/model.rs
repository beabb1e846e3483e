use crate::bidding::rules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 경매 상태 (upcoming -> active -> ended)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Upcoming,
    Active,
    Ended,
}

impl AuctionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuctionStatus::Upcoming => "upcoming",
            AuctionStatus::Active => "active",
            AuctionStatus::Ended => "ended",
        }
    }
}

// 낙찰 처리 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinStatus {
    Pending,
    Redeemed,
    Forfeited,
}

// 경매 상품 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub status: AuctionStatus,
    pub starting_bid: i64,
    pub current_bid: i64,
    pub bid_increment: i64,
    pub bidder_count: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub deposit_required: i64,
    pub highlight: bool,
    pub winner_id: Option<String>,
    pub ended_at: Option<DateTime<Utc>>,
    pub win_status: Option<WinStatus>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl AuctionItem {
    pub fn minimum_next_bid(&self) -> Option<i64> {
        rules::minimum_next_bid(self.current_bid, self.bid_increment)
    }

    /// 진행 중이며 마감까지 1시간 미만
    pub fn is_ending_soon(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Active && self.ends_at - now < rules::ending_soon_window()
    }

    pub fn is_hot(&self) -> bool {
        self.bidder_count > 10 || self.highlight
    }

    /// 낙찰 교환 기한
    pub fn claim_deadline(&self) -> Option<DateTime<Utc>> {
        self.ended_at.map(|ended_at| ended_at + rules::claim_window())
    }
}

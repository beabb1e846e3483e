/// 조회 응답 모델
use crate::auction::model::{AuctionItem, AuctionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 경매 상품 + 화면에서 쓰는 파생 값
#[derive(Debug, Clone, Serialize)]
pub struct AuctionView {
    #[serde(flatten)]
    pub item: AuctionItem,
    pub minimum_next_bid: Option<i64>,
    pub is_hot: bool,
    pub is_ending_soon: bool,
    pub seconds_left: i64,
}

impl AuctionView {
    pub fn new(item: AuctionItem, now: DateTime<Utc>) -> Self {
        Self {
            minimum_next_bid: item.minimum_next_bid(),
            is_hot: item.is_hot(),
            is_ending_soon: item.is_ending_soon(now),
            seconds_left: (item.ends_at - now).num_seconds().max(0),
            item,
        }
    }
}

/// 경매 목록 요약 (진행 중 건수, 총 입찰 수)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuctionStats {
    pub active_count: usize,
    pub total_bids: i64,
}

impl AuctionStats {
    pub fn from_items(items: &[AuctionItem]) -> Self {
        Self {
            active_count: items
                .iter()
                .filter(|i| i.status == AuctionStatus::Active)
                .count(),
            total_bids: items.iter().map(|i| i.bidder_count).sum(),
        }
    }
}

/// 경매 목록 응답
#[derive(Debug, Clone, Serialize)]
pub struct AuctionListView {
    pub stats: AuctionStats,
    pub items: Vec<AuctionView>,
}

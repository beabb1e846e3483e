use crate::auction::model::AuctionItem;
use crate::event_store::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum AuctionEvent {
    // 경매 등록 이벤트
    AuctionCreated {
        item: AuctionItem,
    },
    // 경매 시작 이벤트
    AuctionStarted {
        item_id: i64,
        timestamp: DateTime<Utc>,
    },
    // 입찰 이벤트
    BidPlaced {
        item_id: i64,
        bid_id: i64,
        bidder_id: String,
        bid_amount: i64,
        deposit_held: i64,
        bidder_count: i64,
        timestamp: DateTime<Utc>,
    },
    // 마감 연장 이벤트
    AuctionExtended {
        item_id: i64,
        previous_ends_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
    // 경매 종료 이벤트
    AuctionClosed {
        item_id: i64,
        winner_id: Option<String>,
        final_bid: i64,
        timestamp: DateTime<Utc>,
    },
    // 유찰 보증금 환불 이벤트
    DepositRefunded {
        item_id: i64,
        bidder_id: String,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 낙찰 교환 이벤트
    WinRedeemed {
        item_id: i64,
        winner_id: String,
        price: i64,
        deposit_applied: i64,
        timestamp: DateTime<Utc>,
    },
    // 낙찰 포기(기한 경과) 이벤트
    WinForfeited {
        item_id: i64,
        winner_id: String,
        deposit_released: i64,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for AuctionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AuctionEvent::AuctionCreated { .. } => "AuctionCreated",
            AuctionEvent::AuctionStarted { .. } => "AuctionStarted",
            AuctionEvent::BidPlaced { .. } => "BidPlaced",
            AuctionEvent::AuctionExtended { .. } => "AuctionExtended",
            AuctionEvent::AuctionClosed { .. } => "AuctionClosed",
            AuctionEvent::DepositRefunded { .. } => "DepositRefunded",
            AuctionEvent::WinRedeemed { .. } => "WinRedeemed",
            AuctionEvent::WinForfeited { .. } => "WinForfeited",
        }
    }

    fn aggregate_id(&self) -> String {
        let item_id = match self {
            AuctionEvent::AuctionCreated { item } => item.id,
            AuctionEvent::AuctionStarted { item_id, .. }
            | AuctionEvent::BidPlaced { item_id, .. }
            | AuctionEvent::AuctionExtended { item_id, .. }
            | AuctionEvent::AuctionClosed { item_id, .. }
            | AuctionEvent::DepositRefunded { item_id, .. }
            | AuctionEvent::WinRedeemed { item_id, .. }
            | AuctionEvent::WinForfeited { item_id, .. } => *item_id,
        };
        format!("auction-{}", item_id)
    }
}

/// 입찰 관련 커맨드
/// 1. 경매 등록
/// 2. 입찰
/// 3. 낙찰 물품 교환
// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Commands
/// 경매 등록 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateAuctionCommand {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category: String,
    pub starting_bid: i64,
    pub bid_increment: i64,
    #[serde(default)]
    pub deposit_required: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub highlight: bool,
}

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub item_id: i64,
    pub bidder_id: String,
    pub bid_amount: i64,
}
// endregion: --- Commands

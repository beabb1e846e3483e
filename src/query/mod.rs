pub mod filters;
pub mod views;

pub use filters::{AuctionFilter, AuctionStatusFilter, ItemFilter, PartnerFilter, RedeemSort};
pub use views::{AuctionListView, AuctionStats, AuctionView};

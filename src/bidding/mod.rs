pub mod commands;
pub mod model;
pub mod rules;

pub use commands::{CreateAuctionCommand, PlaceBidCommand};
pub use model::{Bid, DepositHold, HoldStatus};
pub use rules::BidPolicy;

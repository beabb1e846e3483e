pub mod engine;
pub mod events;
pub mod model;

pub use engine::AuctionEngine;
pub use model::{AuctionItem, AuctionStatus, WinStatus};

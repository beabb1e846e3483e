pub mod auction;
pub mod bidding;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod event_store;
pub mod handlers;
#[cfg(feature = "kafka")]
pub mod message_broker;
pub mod profile;
pub mod query;
pub mod referral;
pub mod scheduler;

pub mod code;
pub mod engine;
pub mod events;
pub mod model;

pub use engine::ReferralEngine;
pub use model::{Milestone, MilestoneAward, Referral, ReferralStatus, ReferralSummary, MILESTONES};

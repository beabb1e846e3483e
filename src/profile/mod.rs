pub mod events;
pub mod model;
pub mod store;

pub use model::{MemberProfile, Preferences, ProfileView, Tier};
pub use store::ProfileStore;

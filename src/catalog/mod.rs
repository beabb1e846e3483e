pub mod events;
pub mod model;
pub mod service;

pub use model::{HybridPrice, NewPartner, NewRedeemItem, Order, Partner, PaymentMethod, RedeemCommand, RedeemItem};
pub use service::CatalogService;

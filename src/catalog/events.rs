use crate::catalog::model::{Order, Partner, RedeemItem};
use crate::event_store::DomainEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum CatalogEvent {
    // 교환 상품 등록
    RedeemItemCreated { item: RedeemItem },
    // 파트너 등록
    PartnerCreated { partner: Partner },
    // 교환 주문
    OrderPlaced { order: Order },
}

impl DomainEvent for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::RedeemItemCreated { .. } => "RedeemItemCreated",
            CatalogEvent::PartnerCreated { .. } => "PartnerCreated",
            CatalogEvent::OrderPlaced { .. } => "OrderPlaced",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            CatalogEvent::RedeemItemCreated { item } => format!("redeem-item-{}", item.id),
            CatalogEvent::PartnerCreated { partner } => format!("partner-{}", partner.id),
            CatalogEvent::OrderPlaced { order } => format!("order-{}", order.id),
        }
    }
}

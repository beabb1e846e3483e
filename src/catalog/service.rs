/// 교환 카탈로그
/// 1. 교환 상품, 파트너 등록/조회
/// 2. 관심사 기반 추천
/// 3. 마일리지 교환 주문
// region:    --- Imports
use super::events::CatalogEvent;
use super::model::{
    NewPartner, NewRedeemItem, Order, Partner, PaymentMethod, RedeemCommand, RedeemItem,
};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::event_store::{self, EventStore};
use crate::profile::events::BalanceReason;
use crate::profile::ProfileStore;
use crate::query::filters::{ItemFilter, PartnerFilter};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

// endregion: --- Imports

/// 추천 상품 기본 개수
pub const RECOMMENDATION_LIMIT: usize = 4;

pub struct CatalogService {
    items: RwLock<Vec<RedeemItem>>,
    partners: RwLock<Vec<Partner>>,
    orders: RwLock<Vec<Order>>,
    next_item_id: AtomicI64,
    next_partner_id: AtomicI64,
    next_order_id: AtomicI64,
    profiles: Arc<ProfileStore>,
    events: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(
        profiles: Arc<ProfileStore>,
        events: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            partners: RwLock::new(Vec::new()),
            orders: RwLock::new(Vec::new()),
            next_item_id: AtomicI64::new(1),
            next_partner_id: AtomicI64::new(1),
            next_order_id: AtomicI64::new(1),
            profiles,
            events,
            clock,
        }
    }

    // region:    --- Redeem Items

    /// 교환 상품 등록
    pub async fn create_item(&self, new_item: NewRedeemItem) -> Result<RedeemItem, ServiceError> {
        if new_item.title.trim().is_empty() {
            return Err(ServiceError::BadRequest("제목이 비어 있습니다.".to_string()));
        }
        if new_item.miles_price < 0 {
            return Err(ServiceError::BadRequest(
                "마일리지 가격은 음수일 수 없습니다.".to_string(),
            ));
        }
        if let Some(hybrid) = &new_item.hybrid_price {
            if hybrid.miles < 0 || hybrid.cny < 0.0 {
                return Err(ServiceError::BadRequest(
                    "복합 가격은 음수일 수 없습니다.".to_string(),
                ));
            }
        }

        let now = self.clock.now();
        let item = RedeemItem {
            id: self.next_item_id.fetch_add(1, Ordering::SeqCst),
            title: new_item.title,
            partner_name: new_item.partner_name,
            category: new_item.category,
            location: new_item.location,
            image_url: new_item.image_url,
            miles_price: new_item.miles_price,
            original_price: new_item.original_price,
            hybrid_price: new_item.hybrid_price,
            savings_percent: new_item.savings_percent,
            rating: new_item.rating,
            available: new_item.available,
            tags: new_item.tags,
            created_at: now,
        };
        self.items.write().await.push(item.clone());
        event_store::record(
            self.events.as_ref(),
            &CatalogEvent::RedeemItemCreated { item: item.clone() },
            1,
            now,
        )
        .await;
        info!("{:<12} --> 교환 상품 등록: id={}, {}", "Catalog", item.id, item.title);
        Ok(item)
    }

    pub async fn get_item(&self, item_id: i64) -> Result<RedeemItem, ServiceError> {
        self.items
            .read()
            .await
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("redeem item {}", item_id)))
    }

    /// 교환 상품 목록 (필터, 정렬 적용)
    pub async fn list_items(&self, filter: &ItemFilter) -> Vec<RedeemItem> {
        filter.apply(self.newest_items().await)
    }

    /// 관심사 기반 추천
    /// 관심사가 없거나 맞는 상품이 없으면 최신 상품
    pub async fn recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<RedeemItem>, ServiceError> {
        let profile = self.profiles.get_or_create(user_id).await?;
        let interests = &profile.preferences.interests;
        let items = self.newest_items().await;

        let matched: Vec<RedeemItem> = items
            .iter()
            .filter(|i| interests.contains(&i.category))
            .take(limit)
            .cloned()
            .collect();
        if matched.is_empty() {
            return Ok(items.into_iter().take(limit).collect());
        }
        Ok(matched)
    }

    async fn newest_items(&self) -> Vec<RedeemItem> {
        let mut items = self.items.read().await.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    // endregion: --- Redeem Items

    // region:    --- Partners

    /// 파트너 등록
    pub async fn create_partner(&self, new_partner: NewPartner) -> Result<Partner, ServiceError> {
        if new_partner.name.trim().is_empty() {
            return Err(ServiceError::BadRequest("이름이 비어 있습니다.".to_string()));
        }
        let now = self.clock.now();
        let partner = Partner {
            id: self.next_partner_id.fetch_add(1, Ordering::SeqCst),
            name: new_partner.name,
            category: new_partner.category,
            description: new_partner.description,
            location: new_partner.location,
            logo_url: new_partner.logo_url,
            rating: new_partner.rating,
            featured: new_partner.featured,
            available_items_count: new_partner.available_items_count.max(0),
            created_at: now,
        };
        self.partners.write().await.push(partner.clone());
        event_store::record(
            self.events.as_ref(),
            &CatalogEvent::PartnerCreated {
                partner: partner.clone(),
            },
            1,
            now,
        )
        .await;
        Ok(partner)
    }

    /// 파트너 목록 (추천 파트너 먼저, 그 안에서 최신순)
    pub async fn list_partners(&self, filter: &PartnerFilter) -> Vec<Partner> {
        let mut partners = self.partners.read().await.clone();
        partners.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        filter.apply(partners)
    }

    // endregion: --- Partners

    // region:    --- Orders

    /// 마일리지 교환
    pub async fn redeem(&self, cmd: RedeemCommand) -> Result<Order, ServiceError> {
        info!("{:<12} --> 교환 요청 처리 시작: {:?}", "Catalog", cmd);
        let item = self.get_item(cmd.redeem_item_id).await?;
        if !item.available {
            return Err(ServiceError::InvalidState(
                "현재 교환할 수 없는 상품입니다.".to_string(),
            ));
        }
        let (miles_spent, cny_spent) = match cmd.payment {
            PaymentMethod::Miles => (item.miles_price, 0.0),
            PaymentMethod::Hybrid => {
                let hybrid = item.hybrid_price.ok_or_else(|| {
                    ServiceError::InvalidState(
                        "복합 결제를 지원하지 않는 상품입니다.".to_string(),
                    )
                })?;
                (hybrid.miles, hybrid.cny)
            }
        };

        self.profiles
            .adjust_balance(
                &cmd.user_id,
                -miles_spent,
                0,
                BalanceReason::Redemption {
                    redeem_item_id: item.id,
                },
            )
            .await?;

        let now = self.clock.now();
        let order = Order {
            id: self.next_order_id.fetch_add(1, Ordering::SeqCst),
            user_id: cmd.user_id,
            redeem_item_id: item.id,
            payment: cmd.payment,
            miles_spent,
            cny_spent,
            created_at: now,
        };
        self.orders.write().await.push(order.clone());
        event_store::record(
            self.events.as_ref(),
            &CatalogEvent::OrderPlaced {
                order: order.clone(),
            },
            1,
            now,
        )
        .await;
        info!(
            "{:<12} --> 교환 완료: order={}, user={}, miles={}",
            "Catalog", order.id, order.user_id, miles_spent
        );
        Ok(order)
    }

    /// 회원의 주문 목록 (최신순)
    pub async fn orders_for(&self, user_id: &str) -> Vec<Order> {
        self.orders
            .read()
            .await
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    // endregion: --- Orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::HybridPrice;
    use crate::clock::ManualClock;
    use crate::event_store::MemoryEventStore;
    use crate::profile::Preferences;
    use chrono::{Duration, Utc};

    struct Fixture {
        clock: Arc<ManualClock>,
        profiles: Arc<ProfileStore>,
        catalog: CatalogService,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let events: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
        let profiles = Arc::new(ProfileStore::new(clock.clone(), events.clone()));
        let catalog = CatalogService::new(profiles.clone(), events, clock.clone());
        Fixture {
            clock,
            profiles,
            catalog,
        }
    }

    fn new_item(title: &str, category: &str, miles: i64) -> NewRedeemItem {
        NewRedeemItem {
            title: title.to_string(),
            partner_name: None,
            category: category.to_string(),
            location: None,
            image_url: None,
            miles_price: miles,
            original_price: None,
            hybrid_price: None,
            savings_percent: 0.0,
            rating: 0.0,
            available: true,
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn recommendations_follow_interests_then_fall_back() {
        let f = fixture();
        for (title, category) in [("Suite", "hotel"), ("Omakase", "dining"), ("Museum", "art")] {
            f.catalog.create_item(new_item(title, category, 1000)).await.unwrap();
            f.clock.advance(Duration::seconds(1));
        }

        let fallback = f.catalog.recommendations("a1b2c3d4", 2).await.unwrap();
        let titles: Vec<&str> = fallback.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Museum", "Omakase"]);

        let mut preferences = Preferences::default();
        preferences.interests.insert("dining".to_string());
        f.profiles
            .update_preferences("a1b2c3d4", preferences)
            .await
            .unwrap();
        let matched = f.catalog.recommendations("a1b2c3d4", 4).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title, "Omakase");
    }

    #[tokio::test]
    async fn redeem_deducts_miles_and_records_order() {
        let f = fixture();
        let mut hybrid = new_item("Lounge", "flight", 20000);
        hybrid.hybrid_price = Some(HybridPrice {
            miles: 8000,
            cny: 299.0,
        });
        let item = f.catalog.create_item(hybrid).await.unwrap();
        f.profiles
            .adjust_balance("a1b2c3d4", 10000, 0, BalanceReason::Adjustment)
            .await
            .unwrap();

        let err = f
            .catalog
            .redeem(RedeemCommand {
                user_id: "a1b2c3d4".to_string(),
                redeem_item_id: item.id,
                payment: PaymentMethod::Miles,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientMiles { .. }));

        let order = f
            .catalog
            .redeem(RedeemCommand {
                user_id: "a1b2c3d4".to_string(),
                redeem_item_id: item.id,
                payment: PaymentMethod::Hybrid,
            })
            .await
            .unwrap();
        assert_eq!(order.miles_spent, 8000);
        assert_eq!(order.cny_spent, 299.0);
        assert_eq!(f.profiles.get("a1b2c3d4").await.unwrap().miles_balance, 2000);
        assert_eq!(f.catalog.orders_for("a1b2c3d4").await.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_item_cannot_be_redeemed() {
        let f = fixture();
        let mut sold_out = new_item("Sold out", "shopping", 0);
        sold_out.available = false;
        let item = f.catalog.create_item(sold_out).await.unwrap();
        let err = f
            .catalog
            .redeem(RedeemCommand {
                user_id: "a1b2c3d4".to_string(),
                redeem_item_id: item.id,
                payment: PaymentMethod::Miles,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(matches!(
            f.catalog.get_item(99).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn featured_partners_come_first() {
        let f = fixture();
        for (name, featured) in [("A", false), ("B", true), ("C", false)] {
            f.catalog
                .create_partner(NewPartner {
                    name: name.to_string(),
                    category: "dining".to_string(),
                    description: None,
                    location: None,
                    logo_url: None,
                    rating: 4.0,
                    featured,
                    available_items_count: 3,
                })
                .await
                .unwrap();
            f.clock.advance(Duration::seconds(1));
        }
        let partners = f.catalog.list_partners(&PartnerFilter::default()).await;
        let names: Vec<&str> = partners.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 마일리지 + 현금 복합 가격
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridPrice {
    pub miles: i64,
    pub cny: f64,
}

// 교환 상품 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemItem {
    pub id: i64,
    pub title: String,
    pub partner_name: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub miles_price: i64,
    pub original_price: Option<f64>,
    pub hybrid_price: Option<HybridPrice>,
    pub savings_percent: f64,
    pub rating: f64,
    pub available: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// 교환 상품 등록 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRedeemItem {
    pub title: String,
    #[serde(default)]
    pub partner_name: Option<String>,
    pub category: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub miles_price: i64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub hybrid_price: Option<HybridPrice>,
    #[serde(default)]
    pub savings_percent: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_available() -> bool {
    true
}

// 파트너 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub logo_url: Option<String>,
    pub rating: f64,
    pub featured: bool,
    pub available_items_count: i64,
    pub created_at: DateTime<Utc>,
}

/// 파트너 등록 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartner {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub available_items_count: i64,
}

// 결제 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Miles,
    Hybrid,
}

/// 교환 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCommand {
    pub user_id: String,
    pub redeem_item_id: i64,
    #[serde(default)]
    pub payment: PaymentMethod,
}

// 교환 주문 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub redeem_item_id: i64,
    pub payment: PaymentMethod,
    pub miles_spent: i64,
    pub cny_spent: f64,
    pub created_at: DateTime<Utc>,
}

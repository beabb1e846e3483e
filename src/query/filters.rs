/// 조회 필터와 정렬
// region:    --- Imports
use crate::auction::model::{AuctionItem, AuctionStatus};
use crate::catalog::model::{Partner, RedeemItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// endregion: --- Imports

// region:    --- Auction Filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatusFilter {
    #[default]
    All,
    Active,
    EndingSoon,
    Upcoming,
    Ended,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionFilter {
    #[serde(default)]
    pub status: AuctionStatusFilter,
    #[serde(default)]
    pub category: Option<String>,
}

impl AuctionFilter {
    pub fn status(status: AuctionStatusFilter) -> Self {
        Self {
            status,
            category: None,
        }
    }

    pub fn matches(&self, item: &AuctionItem, now: DateTime<Utc>) -> bool {
        let status_matches = match self.status {
            AuctionStatusFilter::All => true,
            AuctionStatusFilter::Active => item.status == AuctionStatus::Active,
            AuctionStatusFilter::EndingSoon => item.is_ending_soon(now),
            AuctionStatusFilter::Upcoming => item.status == AuctionStatus::Upcoming,
            AuctionStatusFilter::Ended => item.status == AuctionStatus::Ended,
        };
        status_matches && matches_category(self.category.as_deref(), &item.category)
    }
}
// endregion: --- Auction Filter

// region:    --- Redeem Item Filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RedeemSort {
    /// 절약률 높은 순
    #[default]
    BestValue,
    MilesLow,
    MilesHigh,
    Rating,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub available_only: bool,
    #[serde(default)]
    pub sort: RedeemSort,
}

impl ItemFilter {
    pub fn matches(&self, item: &RedeemItem) -> bool {
        let matches_search = match normalized_search(self.search.as_deref()) {
            None => true,
            Some(needle) => [
                Some(item.title.as_str()),
                item.partner_name.as_deref(),
                item.location.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle)),
        };
        let matches_available = !self.available_only || item.available;
        matches_search
            && matches_category(self.category.as_deref(), &item.category)
            && matches_available
    }

    pub fn compare(&self, a: &RedeemItem, b: &RedeemItem) -> Ordering {
        match self.sort {
            RedeemSort::MilesLow => a.miles_price.cmp(&b.miles_price),
            RedeemSort::MilesHigh => b.miles_price.cmp(&a.miles_price),
            RedeemSort::Rating => b.rating.total_cmp(&a.rating),
            RedeemSort::BestValue => b.savings_percent.total_cmp(&a.savings_percent),
        }
    }

    /// 필터 적용 후 정렬 (같은 값이면 입력 순서 유지)
    pub fn apply(&self, items: Vec<RedeemItem>) -> Vec<RedeemItem> {
        let mut filtered: Vec<RedeemItem> = items.into_iter().filter(|i| self.matches(i)).collect();
        filtered.sort_by(|a, b| self.compare(a, b));
        filtered
    }
}
// endregion: --- Redeem Item Filter

// region:    --- Partner Filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl PartnerFilter {
    pub fn matches(&self, partner: &Partner) -> bool {
        let matches_search = match normalized_search(self.search.as_deref()) {
            None => true,
            Some(needle) => [Some(partner.name.as_str()), partner.location.as_deref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle)),
        };
        matches_search && matches_category(self.category.as_deref(), &partner.category)
    }

    /// 필터 적용 후 추천 파트너를 앞으로
    pub fn apply(&self, partners: Vec<Partner>) -> Vec<Partner> {
        let mut filtered: Vec<Partner> =
            partners.into_iter().filter(|p| self.matches(p)).collect();
        filtered.sort_by_key(|p| !p.featured);
        filtered
    }
}
// endregion: --- Partner Filter

/// "all" 또는 빈 값이면 전체
fn matches_category(filter: Option<&str>, category: &str) -> bool {
    match filter.map(str::trim) {
        None | Some("") | Some("all") => true,
        Some(wanted) => wanted.eq_ignore_ascii_case(category),
    }
}

fn normalized_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn redeem_item(id: i64, title: &str, miles: i64, savings: f64, rating: f64) -> RedeemItem {
        RedeemItem {
            id,
            title: title.to_string(),
            partner_name: Some("Peninsula".to_string()),
            category: "hotel".to_string(),
            location: Some("Hong Kong".to_string()),
            image_url: None,
            miles_price: miles,
            original_price: None,
            hybrid_price: None,
            savings_percent: savings,
            rating,
            available: id % 2 == 0,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn item_filter_searches_and_sorts() {
        let items = vec![
            redeem_item(1, "Suite Night", 30000, 10.0, 4.5),
            redeem_item(2, "Harbour Dinner", 12000, 35.0, 4.9),
            redeem_item(3, "Spa Day", 18000, 20.0, 4.1),
        ];

        let by_value = ItemFilter::default().apply(items.clone());
        let ids: Vec<i64> = by_value.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let cheapest = ItemFilter {
            sort: RedeemSort::MilesLow,
            ..Default::default()
        }
        .apply(items.clone());
        assert_eq!(cheapest[0].id, 2);

        let searched = ItemFilter {
            search: Some("  SPA ".to_string()),
            ..Default::default()
        }
        .apply(items.clone());
        assert_eq!(searched.len(), 1);

        let by_location = ItemFilter {
            search: Some("hong kong".to_string()),
            available_only: true,
            ..Default::default()
        }
        .apply(items);
        assert_eq!(by_location.len(), 1);
        assert_eq!(by_location[0].id, 2);
    }

    #[test]
    fn auction_filter_ending_soon() {
        let now = Utc::now();
        let item = AuctionItem {
            id: 1,
            title: "Lounge pass".to_string(),
            description: String::new(),
            image_url: None,
            category: "flight".to_string(),
            status: AuctionStatus::Active,
            starting_bid: 10000,
            current_bid: 10000,
            bid_increment: 500,
            bidder_count: 0,
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::minutes(30),
            deposit_required: 0,
            highlight: false,
            winner_id: None,
            ended_at: None,
            win_status: None,
            created_at: now,
            version: 1,
        };
        assert!(AuctionFilter::status(AuctionStatusFilter::EndingSoon).matches(&item, now));
        assert!(!AuctionFilter::status(AuctionStatusFilter::EndingSoon)
            .matches(&item, now - Duration::hours(1)));
        assert!(!AuctionFilter::status(AuctionStatusFilter::Upcoming).matches(&item, now));

        let other_category = AuctionFilter {
            status: AuctionStatusFilter::All,
            category: Some("dining".to_string()),
        };
        assert!(!other_category.matches(&item, now));
        let all = AuctionFilter {
            status: AuctionStatusFilter::All,
            category: Some("all".to_string()),
        };
        assert!(all.matches(&item, now));
    }
}

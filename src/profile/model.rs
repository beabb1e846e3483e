use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 등급 한 단계 승급에 필요한 진행률 1%당 마일리지
pub const MILES_PER_PROGRESS_POINT: i64 = 150;

// region:    --- Tier
/// 회원 등급 (bronze < silver < gold < jade < diamond)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Jade,
    Diamond,
}

impl Tier {
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Bronze => Some(Tier::Silver),
            Tier::Silver => Some(Tier::Gold),
            Tier::Gold => Some(Tier::Jade),
            Tier::Jade => Some(Tier::Diamond),
            Tier::Diamond => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Bronze => "铜卡",
            Tier::Silver => "银卡",
            Tier::Gold => "金卡",
            Tier::Jade => "翡翠卡",
            Tier::Diamond => "钻石卡",
        }
    }

    /// 마일리지 적립 배수
    pub fn earn_multiplier(self) -> f64 {
        match self {
            Tier::Bronze => 1.0,
            Tier::Silver => 1.2,
            Tier::Gold => 1.5,
            Tier::Jade => 2.0,
            Tier::Diamond => 3.0,
        }
    }

    pub fn benefits(self) -> &'static [&'static str] {
        match self {
            Tier::Bronze => &["基础里程累积", "生日礼遇"],
            Tier::Silver => &["1.2倍里程累积", "贵宾厅权益", "优先客服"],
            Tier::Gold => &["1.5倍里程累积", "贵宾厅权益", "优先客服", "专属竞拍"],
            Tier::Jade => &["2倍里程累积", "顶级贵宾厅", "优先客服", "专属竞拍", "管家服务"],
            Tier::Diamond => &[
                "3倍里程累积",
                "顶级贵宾厅",
                "24/7专属客服",
                "专属竞拍",
                "私人管家",
                "限量体验",
            ],
        }
    }
}
// endregion: --- Tier

// region:    --- Member Profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub dietary: Vec<String>,
    #[serde(default = "default_non_smoking")]
    pub non_smoking: bool,
}

fn default_non_smoking() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            interests: BTreeSet::new(),
            dietary: Vec::new(),
            non_smoking: true,
        }
    }
}

/// 회원 프로필
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub user_id: String,
    pub tier: Tier,
    pub tier_progress: u8,
    pub miles_balance: i64,
    pub cny_balance: f64,
    pub dcep_balance: f64,
    pub voucher_count: i64,
    pub preferences: Preferences,
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl MemberProfile {
    /// 처음 접근한 회원의 기본 프로필 (bronze, 잔액 0)
    pub fn new(user_id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            tier: Tier::Bronze,
            tier_progress: 0,
            miles_balance: 0,
            cny_balance: 0.0,
            dcep_balance: 0.0,
            voucher_count: 0,
            preferences: Preferences::default(),
            referral_code: crate::referral::code::referral_code_for(user_id).ok(),
            created_at,
            version: 0,
        }
    }

    /// 다음 등급까지 남은 마일리지 (diamond는 0)
    pub fn miles_to_next_tier(&self) -> i64 {
        if self.tier.next().is_none() {
            return 0;
        }
        let remaining = 100 - i64::from(self.tier_progress.min(100));
        remaining * MILES_PER_PROGRESS_POINT
    }
}

/// 프로필 조회 응답
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: MemberProfile,
    pub tier_label: &'static str,
    pub next_tier: Option<Tier>,
    pub miles_to_next_tier: i64,
    pub earn_multiplier: f64,
    pub benefits: &'static [&'static str],
}

impl From<MemberProfile> for ProfileView {
    fn from(profile: MemberProfile) -> Self {
        let tier = profile.tier;
        let miles_to_next_tier = profile.miles_to_next_tier();
        Self {
            profile,
            tier_label: tier.label(),
            next_tier: tier.next(),
            miles_to_next_tier,
            earn_multiplier: tier.earn_multiplier(),
            benefits: tier.benefits(),
        }
    }
}
// endregion: --- Member Profile

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Jade < Tier::Diamond);
        assert_eq!(Tier::Gold.next(), Some(Tier::Jade));
        assert_eq!(Tier::Diamond.next(), None);
    }

    #[test]
    fn miles_to_next_tier_follows_progress() {
        let mut profile = MemberProfile::new("6914bac5e7905475", Utc::now());
        profile.tier = Tier::Gold;
        profile.tier_progress = 68;
        assert_eq!(profile.miles_to_next_tier(), 32 * 150);

        profile.tier = Tier::Diamond;
        assert_eq!(profile.miles_to_next_tier(), 0);
    }

    #[test]
    fn new_profile_defaults_to_bronze_with_code() {
        let profile = MemberProfile::new("6914bac5e7905475", Utc::now());
        assert_eq!(profile.tier, Tier::Bronze);
        assert_eq!(profile.miles_balance, 0);
        assert!(profile.preferences.non_smoking);
        assert_eq!(profile.referral_code.as_deref(), Some("CX6914BAC5"));
    }
}

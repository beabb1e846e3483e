use crate::event_store::DomainEvent;
use crate::profile::model::{Preferences, Tier};
use serde::{Deserialize, Serialize};

/// 잔액 변동 사유
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalanceReason {
    DepositHold { auction_id: i64 },
    DepositRefund { auction_id: i64 },
    DepositRelease { auction_id: i64 },
    WinRedeemed { auction_id: i64 },
    /// 추천 보상. 같은 지급에서 달성한 마일스톤 보너스를 포함한다.
    ReferralReward { referral_id: i64, milestones: Vec<u32> },
    Redemption { redeem_item_id: i64 },
    Adjustment,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ProfileEvent {
    // 프로필 생성
    ProfileCreated {
        user_id: String,
        tier: Tier,
    },
    // 잔액 변동
    BalanceAdjusted {
        user_id: String,
        miles_delta: i64,
        vouchers_delta: i64,
        miles_balance: i64,
        voucher_count: i64,
        reason: BalanceReason,
    },
    // 관심사 등 선호 설정 변경
    PreferencesUpdated {
        user_id: String,
        preferences: Preferences,
    },
}

impl DomainEvent for ProfileEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProfileEvent::ProfileCreated { .. } => "ProfileCreated",
            ProfileEvent::BalanceAdjusted { .. } => "BalanceAdjusted",
            ProfileEvent::PreferencesUpdated { .. } => "PreferencesUpdated",
        }
    }

    fn aggregate_id(&self) -> String {
        let user_id = match self {
            ProfileEvent::ProfileCreated { user_id, .. }
            | ProfileEvent::BalanceAdjusted { user_id, .. }
            | ProfileEvent::PreferencesUpdated { user_id, .. } => user_id,
        };
        format!("member-{}", user_id)
    }
}

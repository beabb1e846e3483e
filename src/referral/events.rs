use crate::event_store::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ReferralEvent {
    // 추천 등록
    ReferralRegistered {
        referral_id: i64,
        referrer_id: String,
        referee_id: String,
        code: String,
        timestamp: DateTime<Utc>,
    },
    // 피추천인 첫 교환 완료
    ReferralCompleted {
        referral_id: i64,
        referee_id: String,
        timestamp: DateTime<Utc>,
    },
    // 추천 보상 지급
    ReferralRewarded {
        referral_id: i64,
        referrer_id: String,
        reward_miles: i64,
        reward_vouchers: i64,
        timestamp: DateTime<Utc>,
    },
    // 마일스톤 보너스 지급
    MilestoneAwarded {
        referrer_id: String,
        referral_id: i64,
        threshold: u32,
        miles: i64,
        vouchers: i64,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for ReferralEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReferralEvent::ReferralRegistered { .. } => "ReferralRegistered",
            ReferralEvent::ReferralCompleted { .. } => "ReferralCompleted",
            ReferralEvent::ReferralRewarded { .. } => "ReferralRewarded",
            ReferralEvent::MilestoneAwarded { .. } => "MilestoneAwarded",
        }
    }

    /// 마일스톤은 추천인 단위, 나머지는 추천 건 단위
    fn aggregate_id(&self) -> String {
        match self {
            ReferralEvent::ReferralRegistered { referral_id, .. }
            | ReferralEvent::ReferralCompleted { referral_id, .. }
            | ReferralEvent::ReferralRewarded { referral_id, .. } => {
                format!("referral-{}", referral_id)
            }
            ReferralEvent::MilestoneAwarded { referrer_id, .. } => {
                format!("referrer-{}", referrer_id)
            }
        }
    }
}

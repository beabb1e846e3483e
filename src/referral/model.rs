use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 추천 1건당 추천인 보상 마일리지
pub const REFERRAL_REWARD_MILES: i64 = 500;

// 추천 상태 (pending -> completed -> rewarded, 역행 없음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Completed,
    Rewarded,
}

// 추천 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: i64,
    pub referrer_id: String,
    pub referee_id: String,
    pub code: String,
    pub status: ReferralStatus,
    pub reward_miles: i64,
    pub reward_vouchers: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rewarded_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Referral {
    /// completed 이상 (completed, rewarded)
    pub fn is_completed(&self) -> bool {
        self.status >= ReferralStatus::Completed
    }
}

// region:    --- Milestones
/// 누적 추천 수 달성 보너스
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub threshold: u32,
    pub miles: i64,
    pub vouchers: i64,
    pub label: &'static str,
}

pub const MILESTONES: [Milestone; 4] = [
    Milestone {
        threshold: 1,
        miles: 500,
        vouchers: 0,
        label: "首次邀请",
    },
    Milestone {
        threshold: 3,
        miles: 1000,
        vouchers: 1,
        label: "邀请3人",
    },
    Milestone {
        threshold: 5,
        miles: 2000,
        vouchers: 2,
        label: "邀请5人",
    },
    Milestone {
        threshold: 10,
        miles: 5000,
        vouchers: 5,
        label: "邀请10人",
    },
];

/// 완료 건수보다 큰 첫 마일스톤
pub fn next_milestone(completed_count: usize) -> Option<Milestone> {
    MILESTONES
        .iter()
        .copied()
        .find(|m| m.threshold as usize > completed_count)
}

// 마일스톤 지급 기록 (추천인, 기준값당 한 번)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneAward {
    pub referrer_id: String,
    pub threshold: u32,
    pub miles: i64,
    pub vouchers: i64,
    pub referral_id: i64,
    pub awarded_at: DateTime<Utc>,
}
// endregion: --- Milestones

/// 추천 현황 (추천 페이지)
#[derive(Debug, Clone, Serialize)]
pub struct ReferralSummary {
    pub user_id: String,
    pub referral_code: Option<String>,
    pub share_url: Option<String>,
    pub completed_count: usize,
    pub pending_count: usize,
    pub total_reward_miles: i64,
    pub next_milestone: Option<Milestone>,
    pub progress_percent: u32,
    pub milestones: Vec<MilestoneProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MilestoneProgress {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub reached: bool,
    pub awarded: bool,
}

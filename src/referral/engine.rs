/// 추천 엔진
/// 추천인마다 장부(추천 목록 + 마일스톤 지급 기록)를 Mutex로 보호해
/// 여러 추천이 동시에 완료되어도 마일스톤이 두 번 지급되지 않게 한다.
// region:    --- Imports
use super::code::{self, normalize_code};
use super::events::ReferralEvent;
use super::model::{
    next_milestone, MilestoneAward, MilestoneProgress, Referral, ReferralStatus,
    ReferralSummary, MILESTONES, REFERRAL_REWARD_MILES,
};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::event_store::{self, EventStore};
use crate::profile::events::BalanceReason;
use crate::profile::ProfileStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Ledger
/// 추천인 한 명의 장부
#[derive(Default)]
struct ReferrerLedger {
    referrals: Vec<Referral>,
    awards: Vec<MilestoneAward>,
}

impl ReferrerLedger {
    fn completed_count(&self) -> usize {
        self.referrals.iter().filter(|r| r.is_completed()).count()
    }

    fn is_awarded(&self, threshold: u32) -> bool {
        self.awards.iter().any(|a| a.threshold == threshold)
    }
}

/// 추천 id, 피추천인 -> 추천인
#[derive(Default)]
struct ReferralIndex {
    referrer_by_referral: HashMap<i64, String>,
    referral_by_referee: HashMap<String, i64>,
}
// endregion: --- Ledger

// region:    --- Referral Engine
pub struct ReferralEngine {
    ledgers: RwLock<HashMap<String, Arc<Mutex<ReferrerLedger>>>>,
    index: RwLock<ReferralIndex>,
    next_id: AtomicI64,
    profiles: Arc<ProfileStore>,
    events: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl ReferralEngine {
    pub fn new(
        profiles: Arc<ProfileStore>,
        events: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledgers: RwLock::new(HashMap::new()),
            index: RwLock::new(ReferralIndex::default()),
            next_id: AtomicI64::new(1),
            profiles,
            events,
            clock,
        }
    }

    /// 회원의 추천 코드
    pub fn referral_code_for(&self, user_id: &str) -> Result<String, ServiceError> {
        code::referral_code_for(user_id)
    }

    // region:    --- Commands

    /// 추천 코드로 가입한 피추천인 등록
    pub async fn register_referral(
        &self,
        code: &str,
        referee_id: &str,
    ) -> Result<Referral, ServiceError> {
        info!(
            "{:<12} --> 추천 등록 요청: code={}, referee={}",
            "Referral", code, referee_id
        );
        let code = normalize_code(code)?;
        if referee_id.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "피추천인 id가 비어 있습니다.".to_string(),
            ));
        }
        let referrer = self
            .profiles
            .find_by_referral_code(&code)
            .await
            .ok_or_else(|| ServiceError::InvalidCode(code.clone()))?;
        if referrer.user_id == referee_id {
            return Err(ServiceError::SelfReferral);
        }
        self.profiles.get_or_create(referee_id).await?;

        let handle = self.ledger(&referrer.user_id).await;
        let mut ledger = handle.lock().await;
        let now = self.clock.now();

        let referral = {
            let mut index = self.index.write().await;
            if index.referral_by_referee.contains_key(referee_id) {
                return Err(ServiceError::InvalidState(
                    "이미 추천 관계가 등록된 회원입니다.".to_string(),
                ));
            }
            let referral = Referral {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                referrer_id: referrer.user_id.clone(),
                referee_id: referee_id.to_string(),
                code: code.clone(),
                status: ReferralStatus::Pending,
                reward_miles: 0,
                reward_vouchers: 0,
                created_at: now,
                completed_at: None,
                rewarded_at: None,
                version: 1,
            };
            index
                .referrer_by_referral
                .insert(referral.id, referral.referrer_id.clone());
            index
                .referral_by_referee
                .insert(referral.referee_id.clone(), referral.id);
            referral
        };
        ledger.referrals.push(referral.clone());

        event_store::record(
            self.events.as_ref(),
            &ReferralEvent::ReferralRegistered {
                referral_id: referral.id,
                referrer_id: referral.referrer_id.clone(),
                referee_id: referral.referee_id.clone(),
                code,
                timestamp: now,
            },
            referral.version,
            now,
        )
        .await;
        info!(
            "{:<12} --> 추천 등록: id={}, {} -> {}",
            "Referral", referral.id, referral.referrer_id, referral.referee_id
        );
        Ok(referral)
    }

    /// 피추천인의 첫 교환 완료
    /// pending 추천을 completed로 바꾸고 바뀐 추천을 돌려준다. 없으면 빈 목록.
    pub async fn mark_completed(&self, referee_id: &str) -> Result<Vec<Referral>, ServiceError> {
        let located = {
            let index = self.index.read().await;
            index
                .referral_by_referee
                .get(referee_id)
                .and_then(|id| {
                    index
                        .referrer_by_referral
                        .get(id)
                        .map(|referrer| (*id, referrer.clone()))
                })
        };
        let Some((referral_id, referrer_id)) = located else {
            return Ok(Vec::new());
        };

        let handle = self.ledger(&referrer_id).await;
        let mut ledger = handle.lock().await;
        let now = self.clock.now();

        let mut changed = Vec::new();
        for referral in ledger
            .referrals
            .iter_mut()
            .filter(|r| r.id == referral_id && r.status == ReferralStatus::Pending)
        {
            referral.status = ReferralStatus::Completed;
            referral.completed_at = Some(now);
            referral.version += 1;
            changed.push(referral.clone());
        }

        for referral in &changed {
            event_store::record(
                self.events.as_ref(),
                &ReferralEvent::ReferralCompleted {
                    referral_id: referral.id,
                    referee_id: referral.referee_id.clone(),
                    timestamp: now,
                },
                referral.version,
                now,
            )
            .await;
            info!(
                "{:<12} --> 추천 완료: id={}, referee={}",
                "Referral", referral.id, referral.referee_id
            );
        }
        Ok(changed)
    }

    /// 추천 보상 지급 (completed -> rewarded)
    /// 이미 rewarded면 그대로 돌려준다. 새로 달성한 마일스톤 보너스도 함께 지급한다.
    pub async fn credit_reward(&self, referral_id: i64) -> Result<Referral, ServiceError> {
        let referrer_id = self
            .index
            .read()
            .await
            .referrer_by_referral
            .get(&referral_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("referral {}", referral_id)))?;

        let handle = self.ledger(&referrer_id).await;
        let mut ledger = handle.lock().await;
        let now = self.clock.now();

        let position = ledger
            .referrals
            .iter()
            .position(|r| r.id == referral_id)
            .ok_or_else(|| ServiceError::NotFound(format!("referral {}", referral_id)))?;
        match ledger.referrals[position].status {
            ReferralStatus::Pending => {
                return Err(ServiceError::InvalidState(
                    "아직 완료되지 않은 추천입니다.".to_string(),
                ))
            }
            ReferralStatus::Rewarded => {
                warn!(
                    "{:<12} --> 이미 보상이 지급된 추천: id={}",
                    "Referral", referral_id
                );
                return Ok(ledger.referrals[position].clone());
            }
            ReferralStatus::Completed => {}
        }

        let completed_count = ledger.completed_count();
        let newly_reached: Vec<_> = MILESTONES
            .iter()
            .filter(|m| m.threshold as usize <= completed_count && !ledger.is_awarded(m.threshold))
            .copied()
            .collect();
        let bonus_miles: i64 = newly_reached.iter().map(|m| m.miles).sum();
        let bonus_vouchers: i64 = newly_reached.iter().map(|m| m.vouchers).sum();

        // 보상과 보너스는 한 번에 적립한다. 실패하면 장부는 그대로 completed.
        self.profiles
            .adjust_balance(
                &referrer_id,
                REFERRAL_REWARD_MILES + bonus_miles,
                bonus_vouchers,
                BalanceReason::ReferralReward {
                    referral_id,
                    milestones: newly_reached.iter().map(|m| m.threshold).collect(),
                },
            )
            .await?;

        let mut awards = Vec::new();
        for milestone in newly_reached {
            let award = MilestoneAward {
                referrer_id: referrer_id.clone(),
                threshold: milestone.threshold,
                miles: milestone.miles,
                vouchers: milestone.vouchers,
                referral_id,
                awarded_at: now,
            };
            ledger.awards.push(award.clone());
            awards.push((award, ledger.awards.len() as i64));
        }

        let referral = {
            let referral = &mut ledger.referrals[position];
            referral.status = ReferralStatus::Rewarded;
            referral.reward_miles = REFERRAL_REWARD_MILES + bonus_miles;
            referral.reward_vouchers = bonus_vouchers;
            referral.rewarded_at = Some(now);
            referral.version += 1;
            referral.clone()
        };

        event_store::record(
            self.events.as_ref(),
            &ReferralEvent::ReferralRewarded {
                referral_id,
                referrer_id: referrer_id.clone(),
                reward_miles: referral.reward_miles,
                reward_vouchers: referral.reward_vouchers,
                timestamp: now,
            },
            referral.version,
            now,
        )
        .await;
        for (award, version) in awards {
            event_store::record(
                self.events.as_ref(),
                &ReferralEvent::MilestoneAwarded {
                    referrer_id: award.referrer_id,
                    referral_id,
                    threshold: award.threshold,
                    miles: award.miles,
                    vouchers: award.vouchers,
                    timestamp: now,
                },
                version,
                now,
            )
            .await;
        }

        info!(
            "{:<12} --> 추천 보상 지급: id={}, referrer={}, miles={}, vouchers={}",
            "Referral", referral_id, referrer_id, referral.reward_miles, referral.reward_vouchers
        );
        Ok(referral)
    }

    /// completed 상태의 추천 보상을 모두 지급
    pub async fn credit_completed_referrals(&self) -> Vec<Referral> {
        let mut completed_ids = Vec::new();
        for handle in self.snapshot().await {
            let ledger = handle.lock().await;
            completed_ids.extend(
                ledger
                    .referrals
                    .iter()
                    .filter(|r| r.status == ReferralStatus::Completed)
                    .map(|r| r.id),
            );
        }

        let mut rewarded = Vec::new();
        for id in completed_ids {
            match self.credit_reward(id).await {
                Ok(referral) => rewarded.push(referral),
                Err(e) => error!("{:<12} --> 추천 보상 지급 실패: id={}, {}", "Referral", id, e),
            }
        }
        rewarded
    }

    // endregion: --- Commands

    // region:    --- Queries

    pub async fn get(&self, referral_id: i64) -> Result<Referral, ServiceError> {
        let referrer_id = self
            .index
            .read()
            .await
            .referrer_by_referral
            .get(&referral_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("referral {}", referral_id)))?;
        let handle = self.ledger(&referrer_id).await;
        let ledger = handle.lock().await;
        ledger
            .referrals
            .iter()
            .find(|r| r.id == referral_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("referral {}", referral_id)))
    }

    /// 추천인의 추천 목록 (최신순)
    pub async fn referrals_for(&self, referrer_id: &str) -> Vec<Referral> {
        let handle = match self.ledgers.read().await.get(referrer_id) {
            Some(handle) => Arc::clone(handle),
            None => return Vec::new(),
        };
        let ledger = handle.lock().await;
        ledger.referrals.iter().rev().cloned().collect()
    }

    /// 마일스톤 지급 기록
    pub async fn awards_for(&self, referrer_id: &str) -> Vec<MilestoneAward> {
        let handle = match self.ledgers.read().await.get(referrer_id) {
            Some(handle) => Arc::clone(handle),
            None => return Vec::new(),
        };
        let ledger = handle.lock().await;
        ledger.awards.clone()
    }

    /// 추천 현황
    pub async fn summary(&self, user_id: &str) -> ReferralSummary {
        let referrals = self.referrals_for(user_id).await;
        let awards = self.awards_for(user_id).await;

        let completed_count = referrals.iter().filter(|r| r.is_completed()).count();
        let pending_count = referrals
            .iter()
            .filter(|r| r.status == ReferralStatus::Pending)
            .count();
        let total_reward_miles = referrals.iter().map(|r| r.reward_miles).sum();
        let next = next_milestone(completed_count);
        let progress_percent = match next {
            Some(m) => (completed_count as u32 * 100) / m.threshold,
            None => 100,
        };
        let referral_code = code::referral_code_for(user_id).ok();

        ReferralSummary {
            user_id: user_id.to_string(),
            share_url: referral_code.as_deref().map(code::share_url),
            referral_code,
            completed_count,
            pending_count,
            total_reward_miles,
            next_milestone: next,
            progress_percent,
            milestones: MILESTONES
                .iter()
                .map(|m| MilestoneProgress {
                    milestone: *m,
                    reached: completed_count >= m.threshold as usize,
                    awarded: awards.iter().any(|a| a.threshold == m.threshold),
                })
                .collect(),
        }
    }

    // endregion: --- Queries

    async fn ledger(&self, referrer_id: &str) -> Arc<Mutex<ReferrerLedger>> {
        if let Some(handle) = self.ledgers.read().await.get(referrer_id) {
            return Arc::clone(handle);
        }
        let mut ledgers = self.ledgers.write().await;
        Arc::clone(ledgers.entry(referrer_id.to_string()).or_default())
    }

    async fn snapshot(&self) -> Vec<Arc<Mutex<ReferrerLedger>>> {
        self.ledgers.read().await.values().cloned().collect()
    }
}
// endregion: --- Referral Engine

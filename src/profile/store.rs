/// 회원 프로필 저장소
/// 잔액 변경은 쓰기 잠금 안에서 한 번에 처리된다. 엔진만 잔액을 바꾼다.
// region:    --- Imports
use super::events::{BalanceReason, ProfileEvent};
use super::model::{MemberProfile, Preferences};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::event_store::{self, EventStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

// endregion: --- Imports

// region:    --- Profile Store
pub struct ProfileStore {
    profiles: RwLock<HashMap<String, MemberProfile>>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventStore>,
}

impl ProfileStore {
    pub fn new(clock: Arc<dyn Clock>, events: Arc<dyn EventStore>) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            clock,
            events,
        }
    }

    /// 프로필 조회
    pub async fn get(&self, user_id: &str) -> Option<MemberProfile> {
        self.profiles.read().await.get(user_id).cloned()
    }

    /// 프로필 조회 (없으면 bronze 등급으로 생성)
    pub async fn get_or_create(&self, user_id: &str) -> Result<MemberProfile, ServiceError> {
        if let Some(profile) = self.get(user_id).await {
            return Ok(profile);
        }
        validate_user_id(user_id)?;

        let (profile, created) = {
            let mut profiles = self.profiles.write().await;
            match profiles.get(user_id) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let mut profile = MemberProfile::new(user_id, self.clock.now());
                    profile.version = 1;
                    profiles.insert(user_id.to_string(), profile.clone());
                    (profile, true)
                }
            }
        };

        if created {
            info!("{:<12} --> 프로필 생성: {}", "Profile", user_id);
            self.record_created(&profile).await;
        }
        Ok(profile)
    }

    /// 마일리지/쿠폰 잔액 변경
    /// 결과 마일리지가 음수가 되면 InsufficientMiles, 아무것도 바뀌지 않는다.
    pub async fn adjust_balance(
        &self,
        user_id: &str,
        miles_delta: i64,
        vouchers_delta: i64,
        reason: BalanceReason,
    ) -> Result<MemberProfile, ServiceError> {
        self.get_or_create(user_id).await?;

        let profile = {
            let mut profiles = self.profiles.write().await;
            let profile = profiles
                .get_mut(user_id)
                .ok_or_else(|| ServiceError::NotFound(format!("member {}", user_id)))?;

            let miles_after = profile
                .miles_balance
                .checked_add(miles_delta)
                .ok_or_else(|| ServiceError::BadRequest("마일리지 한도를 넘었습니다.".to_string()))?;
            if miles_after < 0 {
                return Err(ServiceError::InsufficientMiles {
                    required: miles_delta.saturating_neg(),
                    available: profile.miles_balance,
                });
            }
            let vouchers_after = profile
                .voucher_count
                .checked_add(vouchers_delta)
                .ok_or_else(|| ServiceError::BadRequest("쿠폰 한도를 넘었습니다.".to_string()))?;
            if vouchers_after < 0 {
                return Err(ServiceError::InvalidState(format!(
                    "쿠폰이 부족합니다: 보유 {}",
                    profile.voucher_count
                )));
            }

            profile.miles_balance = miles_after;
            profile.voucher_count = vouchers_after;
            profile.version += 1;
            profile.clone()
        };

        info!(
            "{:<12} --> 잔액 변경: user={}, miles={:+}, vouchers={:+}, reason={:?}",
            "Profile", user_id, miles_delta, vouchers_delta, reason
        );
        event_store::record(
            self.events.as_ref(),
            &ProfileEvent::BalanceAdjusted {
                user_id: user_id.to_string(),
                miles_delta,
                vouchers_delta,
                miles_balance: profile.miles_balance,
                voucher_count: profile.voucher_count,
                reason,
            },
            profile.version,
            self.clock.now(),
        )
        .await;
        Ok(profile)
    }

    /// 선호 설정 변경
    pub async fn update_preferences(
        &self,
        user_id: &str,
        preferences: Preferences,
    ) -> Result<MemberProfile, ServiceError> {
        self.get_or_create(user_id).await?;

        let profile = {
            let mut profiles = self.profiles.write().await;
            let profile = profiles
                .get_mut(user_id)
                .ok_or_else(|| ServiceError::NotFound(format!("member {}", user_id)))?;
            profile.preferences = preferences;
            profile.version += 1;
            profile.clone()
        };

        event_store::record(
            self.events.as_ref(),
            &ProfileEvent::PreferencesUpdated {
                user_id: user_id.to_string(),
                preferences: profile.preferences.clone(),
            },
            profile.version,
            self.clock.now(),
        )
        .await;
        Ok(profile)
    }

    /// 추천 코드로 회원 찾기 (코드가 겹치면 먼저 가입한 회원)
    pub async fn find_by_referral_code(&self, code: &str) -> Option<MemberProfile> {
        self.profiles
            .read()
            .await
            .values()
            .filter(|p| p.referral_code.as_deref() == Some(code))
            .min_by_key(|p| p.created_at)
            .cloned()
    }

    async fn record_created(&self, profile: &MemberProfile) {
        event_store::record(
            self.events.as_ref(),
            &ProfileEvent::ProfileCreated {
                user_id: profile.user_id.clone(),
                tier: profile.tier,
            },
            profile.version,
            self.clock.now(),
        )
        .await;
    }
}

fn validate_user_id(user_id: &str) -> Result<(), ServiceError> {
    if user_id.trim().is_empty() {
        return Err(ServiceError::BadRequest("회원 id가 비어 있습니다.".to_string()));
    }
    Ok(())
}
// endregion: --- Profile Store

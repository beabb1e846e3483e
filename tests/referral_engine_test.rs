use cathay_universe::clock::ManualClock;
use cathay_universe::error::ServiceError;
use cathay_universe::event_store::{EventStore, MemoryEventStore};
use cathay_universe::profile::events::BalanceReason;
use cathay_universe::profile::ProfileStore;
use cathay_universe::referral::{ReferralEngine, ReferralStatus};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

const REFERRER: &str = "6914bac5e7905475fc7a8b54";
const REFERRER_CODE: &str = "CX6914BAC5";

struct Harness {
    clock: Arc<ManualClock>,
    profiles: Arc<ProfileStore>,
    engine: Arc<ReferralEngine>,
}

async fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 11, 1, 9, 0, 0).unwrap(),
    ));
    let events: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let profiles = Arc::new(ProfileStore::new(clock.clone(), events.clone()));
    let engine = Arc::new(ReferralEngine::new(profiles.clone(), events, clock.clone()));
    profiles.get_or_create(REFERRER).await.unwrap();
    Harness {
        clock,
        profiles,
        engine,
    }
}

/// 등록 -> 첫 교환 완료 -> 보상 지급
async fn refer_and_reward(h: &Harness, referee_id: &str) -> cathay_universe::referral::Referral {
    let referral = h
        .engine
        .register_referral(REFERRER_CODE, referee_id)
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(1));
    h.engine.mark_completed(referee_id).await.unwrap();
    h.engine.credit_reward(referral.id).await.unwrap()
}

#[tokio::test]
async fn test_register_referral_starts_pending() {
    let h = harness().await;
    let referral = h
        .engine
        .register_referral(" cx6914bac5 ", "friend-1")
        .await
        .unwrap();
    assert_eq!(referral.referrer_id, REFERRER);
    assert_eq!(referral.code, REFERRER_CODE);
    assert_eq!(referral.status, ReferralStatus::Pending);
    assert!(h.profiles.get("friend-1").await.is_some());
}

#[tokio::test]
async fn test_invalid_and_unknown_codes_are_rejected() {
    let h = harness().await;
    assert!(matches!(
        h.engine.register_referral("hello", "friend-1").await,
        Err(ServiceError::InvalidCode(_))
    ));
    assert!(matches!(
        h.engine.register_referral("CX00000000", "friend-1").await,
        Err(ServiceError::InvalidCode(_))
    ));
}

#[tokio::test]
async fn test_self_referral_is_rejected() {
    let h = harness().await;
    assert_eq!(
        h.engine.register_referral(REFERRER_CODE, REFERRER).await,
        Err(ServiceError::SelfReferral)
    );
}

#[tokio::test]
async fn test_referee_can_only_be_referred_once() {
    let h = harness().await;
    h.engine
        .register_referral(REFERRER_CODE, "friend-1")
        .await
        .unwrap();
    assert!(matches!(
        h.engine.register_referral(REFERRER_CODE, "friend-1").await,
        Err(ServiceError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_pending_referral_cannot_be_credited() {
    let h = harness().await;
    let referral = h
        .engine
        .register_referral(REFERRER_CODE, "friend-1")
        .await
        .unwrap();
    assert!(matches!(
        h.engine.credit_reward(referral.id).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert!(matches!(
        h.engine.credit_reward(404).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_mark_completed_only_moves_pending_referrals() {
    let h = harness().await;
    assert!(h.engine.mark_completed("nobody").await.unwrap().is_empty());

    h.engine
        .register_referral(REFERRER_CODE, "friend-1")
        .await
        .unwrap();
    let completed = h.engine.mark_completed("friend-1").await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, ReferralStatus::Completed);
    assert!(completed[0].completed_at.is_some());

    // 두 번째 교환은 영향 없음
    assert!(h.engine.mark_completed("friend-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_milestones_are_paid_once_as_thresholds_are_reached() {
    let h = harness().await;

    let first = refer_and_reward(&h, "friend-1").await;
    assert_eq!(first.status, ReferralStatus::Rewarded);
    assert_eq!(first.reward_miles, 1000);
    assert_eq!(first.reward_vouchers, 0);

    let second = refer_and_reward(&h, "friend-2").await;
    assert_eq!(second.reward_miles, 500);

    let third = refer_and_reward(&h, "friend-3").await;
    assert_eq!(third.reward_miles, 1500);
    assert_eq!(third.reward_vouchers, 1);

    let referrer = h.profiles.get(REFERRER).await.unwrap();
    assert_eq!(referrer.miles_balance, 3000);
    assert_eq!(referrer.voucher_count, 1);

    let thresholds: Vec<u32> = h
        .engine
        .awards_for(REFERRER)
        .await
        .iter()
        .map(|a| a.threshold)
        .collect();
    assert_eq!(thresholds, vec![1, 3]);

    let summary = h.engine.summary(REFERRER).await;
    assert_eq!(summary.referral_code.as_deref(), Some(REFERRER_CODE));
    assert_eq!(summary.completed_count, 3);
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.total_reward_miles, 3000);
    assert_eq!(summary.next_milestone.map(|m| m.threshold), Some(5));
    assert_eq!(summary.progress_percent, 60);
}

#[tokio::test]
async fn test_credit_reward_is_idempotent() {
    let h = harness().await;
    let rewarded = refer_and_reward(&h, "friend-1").await;
    let balance = h.profiles.get(REFERRER).await.unwrap().miles_balance;

    let again = h.engine.credit_reward(rewarded.id).await.unwrap();
    assert_eq!(again, rewarded);
    assert_eq!(
        h.profiles.get(REFERRER).await.unwrap().miles_balance,
        balance
    );
}

#[tokio::test]
async fn test_sweep_credits_completed_referrals_once() {
    let h = harness().await;
    for referee in ["friend-1", "friend-2"] {
        h.engine
            .register_referral(REFERRER_CODE, referee)
            .await
            .unwrap();
        h.engine.mark_completed(referee).await.unwrap();
    }

    let rewarded = h.engine.credit_completed_referrals().await;
    assert_eq!(rewarded.len(), 2);
    assert!(h.engine.credit_completed_referrals().await.is_empty());

    // 두 건 보상 500 x 2 + 1건 마일스톤 500
    let referrer = h.profiles.get(REFERRER).await.unwrap();
    assert_eq!(referrer.miles_balance, 1500);
    assert_eq!(h.engine.awards_for(REFERRER).await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_credits_pay_reward_once() {
    let h = harness().await;
    let referral = h
        .engine
        .register_referral(REFERRER_CODE, "friend-1")
        .await
        .unwrap();
    h.engine.mark_completed("friend-1").await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let engine = h.engine.clone();
        tasks.push(tokio::spawn(async move { engine.credit_reward(referral.id).await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().status, ReferralStatus::Rewarded);
    }
    assert_eq!(
        h.profiles.get(REFERRER).await.unwrap().miles_balance,
        1000
    );
}

/// 4번째는 기본 보상만, 5번째와 10번째에서 다음 마일스톤 지급
#[tokio::test]
async fn test_later_milestones_are_paid_at_five_and_ten() {
    let h = harness().await;
    for i in 1..=3 {
        refer_and_reward(&h, &format!("friend-{}", i)).await;
    }

    let fourth = refer_and_reward(&h, "friend-4").await;
    assert_eq!(fourth.reward_miles, 500);
    assert_eq!(fourth.reward_vouchers, 0);
    let referrer = h.profiles.get(REFERRER).await.unwrap();
    assert_eq!(referrer.miles_balance, 3500);
    assert_eq!(referrer.voucher_count, 1);
    assert_eq!(h.engine.awards_for(REFERRER).await.len(), 2);

    let fifth = refer_and_reward(&h, "friend-5").await;
    assert_eq!(fifth.reward_miles, 2500);
    assert_eq!(fifth.reward_vouchers, 2);
    let referrer = h.profiles.get(REFERRER).await.unwrap();
    assert_eq!(referrer.miles_balance, 6000);
    assert_eq!(referrer.voucher_count, 3);

    for i in 6..=9 {
        let referral = refer_and_reward(&h, &format!("friend-{}", i)).await;
        assert_eq!(referral.reward_miles, 500);
    }
    assert_eq!(h.profiles.get(REFERRER).await.unwrap().miles_balance, 8000);

    let tenth = refer_and_reward(&h, "friend-10").await;
    assert_eq!(tenth.reward_miles, 5500);
    assert_eq!(tenth.reward_vouchers, 5);
    let referrer = h.profiles.get(REFERRER).await.unwrap();
    assert_eq!(referrer.miles_balance, 13500);
    assert_eq!(referrer.voucher_count, 8);

    let thresholds: Vec<u32> = h
        .engine
        .awards_for(REFERRER)
        .await
        .iter()
        .map(|a| a.threshold)
        .collect();
    assert_eq!(thresholds, vec![1, 3, 5, 10]);

    let summary = h.engine.summary(REFERRER).await;
    assert_eq!(summary.completed_count, 10);
    assert!(summary.next_milestone.is_none());
    assert_eq!(summary.progress_percent, 100);
    assert_eq!(summary.total_reward_miles, 13500);
}

/// 보상 전에 여러 건이 완료되면 첫 지급에서 마일스톤을 한꺼번에 지급
#[tokio::test]
async fn test_one_credit_pays_every_reached_milestone() {
    let h = harness().await;
    let mut ids = Vec::new();
    for referee in ["friend-1", "friend-2", "friend-3"] {
        let referral = h
            .engine
            .register_referral(REFERRER_CODE, referee)
            .await
            .unwrap();
        h.engine.mark_completed(referee).await.unwrap();
        ids.push(referral.id);
    }

    let first = h.engine.credit_reward(ids[0]).await.unwrap();
    assert_eq!(first.reward_miles, 2000);
    assert_eq!(first.reward_vouchers, 1);
    let referrer = h.profiles.get(REFERRER).await.unwrap();
    assert_eq!(referrer.miles_balance, 2000);
    assert_eq!(referrer.voucher_count, 1);

    for id in &ids[1..] {
        let referral = h.engine.credit_reward(*id).await.unwrap();
        assert_eq!(referral.reward_miles, 500);
        assert_eq!(referral.reward_vouchers, 0);
    }
    let referrer = h.profiles.get(REFERRER).await.unwrap();
    assert_eq!(referrer.miles_balance, 3000);
    assert_eq!(referrer.voucher_count, 1);

    let awards = h.engine.awards_for(REFERRER).await;
    assert_eq!(awards.len(), 2);
    assert!(awards.iter().all(|a| a.referral_id == ids[0]));
}

/// 적립이 실패하면 추천은 completed로 남고 마일스톤도 기록되지 않는다
#[tokio::test]
async fn test_failed_credit_leaves_referral_completed() {
    let h = harness().await;
    h.profiles
        .adjust_balance(REFERRER, i64::MAX - 100, 0, BalanceReason::Adjustment)
        .await
        .unwrap();
    let referral = h
        .engine
        .register_referral(REFERRER_CODE, "friend-1")
        .await
        .unwrap();
    h.engine.mark_completed("friend-1").await.unwrap();

    assert!(matches!(
        h.engine.credit_reward(referral.id).await,
        Err(ServiceError::BadRequest(_))
    ));
    assert_eq!(
        h.engine.get(referral.id).await.unwrap().status,
        ReferralStatus::Completed
    );
    assert!(h.engine.awards_for(REFERRER).await.is_empty());
    assert_eq!(
        h.profiles.get(REFERRER).await.unwrap().miles_balance,
        i64::MAX - 100
    );
}

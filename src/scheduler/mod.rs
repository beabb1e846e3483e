/// 주기 작업 스케줄러
/// 시작 시간이 된 경매 활성화, 종료 시간이 지난 경매 마감,
/// 수령 기한이 지난 낙찰 몰수, 완료된 추천 보상 지급을 한 주기에 처리한다.
// region:    --- Imports
use crate::auction::AuctionEngine;
use crate::referral::ReferralEngine;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

// endregion: --- Imports

/// 한 주기 처리 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub activated: Vec<i64>,
    pub closed: Vec<i64>,
    pub forfeited: Vec<i64>,
    pub rewarded: Vec<i64>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty()
            && self.closed.is_empty()
            && self.forfeited.is_empty()
            && self.rewarded.is_empty()
    }
}

// region:    --- Auction Scheduler
pub struct AuctionScheduler {
    auctions: Arc<AuctionEngine>,
    referrals: Arc<ReferralEngine>,
    period: Duration,
}

impl AuctionScheduler {
    pub fn new(
        auctions: Arc<AuctionEngine>,
        referrals: Arc<ReferralEngine>,
        period: Duration,
    ) -> Self {
        Self {
            auctions,
            referrals,
            period,
        }
    }

    /// 스케줄러 시작
    pub fn start(self) -> JoinHandle<()> {
        info!(
            "{:<12} --> 스케줄러 시작: {}초 주기",
            "Scheduler",
            self.period.as_secs()
        );
        tokio::spawn(async move {
            let mut interval = interval(self.period);
            loop {
                interval.tick().await;
                self.run_once().await;
            }
        })
    }

    /// 한 주기 실행
    /// 각 단계는 멱등이라 같은 시각에 여러 번 실행해도 결과가 같다.
    pub async fn run_once(&self) -> SweepReport {
        let activated = self.auctions.activate_due_auctions().await;
        let closed = self.auctions.close_expired_auctions().await;
        let forfeited = self.auctions.expire_unclaimed_wins().await;
        let rewarded = self.referrals.credit_completed_referrals().await;

        let report = SweepReport {
            activated: activated.iter().map(|i| i.id).collect(),
            closed: closed.iter().map(|i| i.id).collect(),
            forfeited: forfeited.iter().map(|i| i.id).collect(),
            rewarded: rewarded.iter().map(|r| r.id).collect(),
        };
        if report.is_empty() {
            debug!("{:<12} --> 처리할 작업 없음", "Scheduler");
        } else {
            info!("{:<12} --> 주기 처리 완료: {:?}", "Scheduler", report);
        }
        report
    }
}
// endregion: --- Auction Scheduler

/// 경매 엔진
/// 경매 상품마다 하나의 Mutex를 두어 같은 상품에 대한 입찰, 종료 처리를 직렬화한다.
/// 서로 다른 상품에 대한 요청은 병렬로 처리된다.
// region:    --- Imports
use super::events::AuctionEvent;
use super::model::{AuctionItem, AuctionStatus, WinStatus};
use crate::bidding::commands::{CreateAuctionCommand, PlaceBidCommand};
use crate::bidding::model::{Bid, DepositHold, HoldStatus};
use crate::bidding::rules::{self, BidPolicy};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::event_store::{self, EventStore};
use crate::profile::events::BalanceReason;
use crate::profile::ProfileStore;
use crate::query::filters::AuctionFilter;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Auction Record
/// 경매 하나의 상태 (상품, 입찰 이력, 보증금)
struct AuctionRecord {
    item: AuctionItem,
    bids: Vec<Bid>,
    holds: HashMap<String, DepositHold>,
    /// 아직 저장소에 기록하지 않은 이벤트와 버전
    staged: Vec<(AuctionEvent, i64)>,
}

impl AuctionRecord {
    fn stage(&mut self, event: AuctionEvent) {
        self.item.version += 1;
        self.staged.push((event, self.item.version));
    }

    /// 시작 시간이 지난 upcoming 경매를 active로 전환
    fn promote_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.item.status == AuctionStatus::Upcoming && self.item.starts_at <= now {
            self.item.status = AuctionStatus::Active;
            self.stage(AuctionEvent::AuctionStarted {
                item_id: self.item.id,
                timestamp: now,
            });
            return true;
        }
        false
    }

    fn has_unsettled_losing_holds(&self) -> bool {
        self.holds
            .values()
            .any(|h| h.is_held() && Some(&h.bidder_id) != self.item.winner_id.as_ref())
    }
}
// endregion: --- Auction Record

// region:    --- Auction Engine
pub struct AuctionEngine {
    auctions: RwLock<HashMap<i64, Arc<Mutex<AuctionRecord>>>>,
    next_item_id: AtomicI64,
    next_bid_id: AtomicI64,
    profiles: Arc<ProfileStore>,
    events: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    policy: BidPolicy,
}

impl AuctionEngine {
    pub fn new(
        profiles: Arc<ProfileStore>,
        events: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        policy: BidPolicy,
    ) -> Self {
        Self {
            auctions: RwLock::new(HashMap::new()),
            next_item_id: AtomicI64::new(1),
            next_bid_id: AtomicI64::new(1),
            profiles,
            events,
            clock,
            policy,
        }
    }

    // region:    --- Commands

    /// 경매 등록
    pub async fn create_auction(&self, cmd: CreateAuctionCommand) -> Result<AuctionItem, ServiceError> {
        if cmd.title.trim().is_empty() {
            return Err(ServiceError::BadRequest("제목이 비어 있습니다.".to_string()));
        }
        if cmd.bid_increment <= 0 {
            return Err(ServiceError::BadRequest(
                "호가 단위는 0보다 커야 합니다.".to_string(),
            ));
        }
        if cmd.starting_bid < 0 || cmd.deposit_required < 0 {
            return Err(ServiceError::BadRequest(
                "시작가와 보증금은 음수일 수 없습니다.".to_string(),
            ));
        }
        if cmd.ends_at <= cmd.starts_at {
            return Err(ServiceError::BadRequest(
                "종료 시간은 시작 시간 이후여야 합니다.".to_string(),
            ));
        }
        if rules::minimum_next_bid(cmd.starting_bid, cmd.bid_increment).is_none() {
            return Err(ServiceError::BadRequest(
                "시작가와 호가 단위가 너무 큽니다.".to_string(),
            ));
        }

        let now = self.clock.now();
        let item = AuctionItem {
            id: self.next_item_id.fetch_add(1, Ordering::SeqCst),
            title: cmd.title,
            description: cmd.description,
            image_url: cmd.image_url,
            category: cmd.category,
            status: AuctionStatus::Upcoming,
            starting_bid: cmd.starting_bid,
            current_bid: cmd.starting_bid,
            bid_increment: cmd.bid_increment,
            bidder_count: 0,
            starts_at: cmd.starts_at,
            ends_at: cmd.ends_at,
            deposit_required: cmd.deposit_required,
            highlight: cmd.highlight,
            winner_id: None,
            ended_at: None,
            win_status: None,
            created_at: now,
            version: 0,
        };

        let mut record = AuctionRecord {
            item: item.clone(),
            bids: Vec::new(),
            holds: HashMap::new(),
            staged: Vec::new(),
        };
        record.stage(AuctionEvent::AuctionCreated { item });
        record.promote_if_due(now);
        let item = record.item.clone();
        let staged = std::mem::take(&mut record.staged);
        self.flush(staged).await;

        self.auctions
            .write()
            .await
            .insert(item.id, Arc::new(Mutex::new(record)));
        info!("{:<12} --> 경매 등록: id={}, {}", "Auction", item.id, item.title);
        Ok(item)
    }

    /// 입찰
    /// 성공하면 입찰 반영 후의 경매 상태를 돌려준다.
    pub async fn place_bid(&self, cmd: PlaceBidCommand) -> Result<AuctionItem, ServiceError> {
        info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Auction", cmd);
        let handle = self.record(cmd.item_id).await?;
        let mut record = handle.lock().await;
        let now = self.clock.now();

        record.promote_if_due(now);
        let result = self.apply_bid(&mut record, &cmd, now).await;
        let staged = std::mem::take(&mut record.staged);
        self.flush(staged).await;

        match &result {
            Ok(item) => info!(
                "{:<12} --> 입찰 성공: id={}, 현재가 {}, 마감 {}",
                "Auction", item.id, item.current_bid, item.ends_at
            ),
            Err(e) => warn!("{:<12} --> 입찰 거절: id={}, {}", "Auction", cmd.item_id, e),
        }
        result
    }

    async fn apply_bid(
        &self,
        record: &mut AuctionRecord,
        cmd: &PlaceBidCommand,
        now: DateTime<Utc>,
    ) -> Result<AuctionItem, ServiceError> {
        if cmd.bidder_id.trim().is_empty() {
            return Err(ServiceError::BadRequest("입찰자 id가 비어 있습니다.".to_string()));
        }
        match record.item.status {
            AuctionStatus::Upcoming => {
                return Err(ServiceError::InvalidState(
                    "경매가 아직 시작되지 않았습니다.".to_string(),
                ))
            }
            AuctionStatus::Ended => {
                return Err(ServiceError::InvalidState(
                    "경매가 이미 종료되었습니다.".to_string(),
                ))
            }
            AuctionStatus::Active if now >= record.item.ends_at => {
                return Err(ServiceError::InvalidState(
                    "경매 마감 시간이 지났습니다.".to_string(),
                ))
            }
            AuctionStatus::Active => {}
        }

        rules::check_bid_amount(
            self.policy,
            record.item.current_bid,
            record.item.bid_increment,
            cmd.bid_amount,
        )?;

        // 입찰자의 첫 입찰이면 보증금 차감
        let needs_deposit = record.item.deposit_required > 0
            && !record
                .holds
                .get(&cmd.bidder_id)
                .map(DepositHold::is_held)
                .unwrap_or(false);
        let deposit_held = if needs_deposit {
            self.profiles
                .adjust_balance(
                    &cmd.bidder_id,
                    -record.item.deposit_required,
                    0,
                    BalanceReason::DepositHold {
                        auction_id: record.item.id,
                    },
                )
                .await?;
            record.holds.insert(
                cmd.bidder_id.clone(),
                DepositHold {
                    auction_item_id: record.item.id,
                    bidder_id: cmd.bidder_id.clone(),
                    amount: record.item.deposit_required,
                    status: HoldStatus::Held,
                    held_at: now,
                    settled_at: None,
                },
            );
            record.item.deposit_required
        } else {
            0
        };

        let bid = Bid {
            id: self.next_bid_id.fetch_add(1, Ordering::SeqCst),
            auction_item_id: record.item.id,
            bidder_id: cmd.bidder_id.clone(),
            amount: cmd.bid_amount,
            placed_at: now,
            deposit_amount: deposit_held,
        };
        record.item.current_bid = cmd.bid_amount;
        record.item.bidder_count += 1;
        record.stage(AuctionEvent::BidPlaced {
            item_id: record.item.id,
            bid_id: bid.id,
            bidder_id: bid.bidder_id.clone(),
            bid_amount: bid.amount,
            deposit_held,
            bidder_count: record.item.bidder_count,
            timestamp: now,
        });
        record.bids.push(bid);

        // 마감 5분 전 이내 입찰은 5분 연장
        if let Some(extended) = rules::extended_end(record.item.ends_at, now) {
            let previous_ends_at = record.item.ends_at;
            record.item.ends_at = extended;
            record.stage(AuctionEvent::AuctionExtended {
                item_id: record.item.id,
                previous_ends_at,
                ends_at: extended,
            });
            info!(
                "{:<12} --> 마감 연장: id={}, {} -> {}",
                "Auction", record.item.id, previous_ends_at, extended
            );
        }

        Ok(record.item.clone())
    }

    /// 낙찰 물품 교환
    /// 묶여 있던 보증금을 대금에 충당하고 나머지를 차감한다.
    pub async fn claim_win(&self, item_id: i64, bidder_id: &str) -> Result<AuctionItem, ServiceError> {
        let handle = self.record(item_id).await?;
        let mut record = handle.lock().await;
        let now = self.clock.now();

        if record.item.status != AuctionStatus::Ended {
            return Err(ServiceError::InvalidState(
                "경매가 아직 종료되지 않았습니다.".to_string(),
            ));
        }
        if record.item.winner_id.as_deref() != Some(bidder_id) {
            return Err(ServiceError::InvalidState("낙찰자가 아닙니다.".to_string()));
        }
        if record.item.win_status != Some(WinStatus::Pending) {
            return Err(ServiceError::InvalidState(
                "이미 처리된 낙찰입니다.".to_string(),
            ));
        }
        if record.item.claim_deadline().map(|d| now >= d).unwrap_or(true) {
            return Err(ServiceError::InvalidState(
                "낙찰 교환 기한이 지났습니다.".to_string(),
            ));
        }

        let deposit = record
            .holds
            .get(bidder_id)
            .filter(|h| h.is_held())
            .map(|h| h.amount)
            .unwrap_or(0);
        let price = record.item.current_bid;
        self.profiles
            .adjust_balance(
                bidder_id,
                deposit - price,
                0,
                BalanceReason::WinRedeemed { auction_id: item_id },
            )
            .await?;

        if let Some(hold) = record.holds.get_mut(bidder_id) {
            if hold.is_held() {
                hold.status = HoldStatus::Applied;
                hold.settled_at = Some(now);
            }
        }
        record.item.win_status = Some(WinStatus::Redeemed);
        record.stage(AuctionEvent::WinRedeemed {
            item_id,
            winner_id: bidder_id.to_string(),
            price,
            deposit_applied: deposit,
            timestamp: now,
        });
        let item = record.item.clone();
        let staged = std::mem::take(&mut record.staged);
        self.flush(staged).await;
        info!(
            "{:<12} --> 낙찰 교환: id={}, winner={}, price={}",
            "Auction", item_id, bidder_id, price
        );
        Ok(item)
    }

    /// 낙찰 후 7일 안에 교환하지 않은 낙찰 포기 처리
    /// 기한 전이거나 이미 처리된 경우 None (재실행 안전)
    pub async fn expire_unclaimed_win(&self, item_id: i64) -> Result<Option<AuctionItem>, ServiceError> {
        let handle = self.record(item_id).await?;
        let mut record = handle.lock().await;
        let now = self.clock.now();

        if record.item.status != AuctionStatus::Ended
            || record.item.win_status != Some(WinStatus::Pending)
        {
            return Ok(None);
        }
        let due = record.item.claim_deadline().map(|d| now >= d).unwrap_or(false);
        if !due {
            return Ok(None);
        }
        let Some(winner_id) = record.item.winner_id.clone() else {
            return Ok(None);
        };

        let mut released = 0;
        let held_amount = record
            .holds
            .get(&winner_id)
            .filter(|h| h.is_held())
            .map(|h| h.amount);
        if let Some(amount) = held_amount {
            self.profiles
                .adjust_balance(
                    &winner_id,
                    amount,
                    0,
                    BalanceReason::DepositRelease { auction_id: item_id },
                )
                .await?;
            if let Some(hold) = record.holds.get_mut(&winner_id) {
                hold.status = HoldStatus::Released;
                hold.settled_at = Some(now);
            }
            released = amount;
        }

        record.item.win_status = Some(WinStatus::Forfeited);
        record.stage(AuctionEvent::WinForfeited {
            item_id,
            winner_id: winner_id.clone(),
            deposit_released: released,
            timestamp: now,
        });
        let item = record.item.clone();
        let staged = std::mem::take(&mut record.staged);
        self.flush(staged).await;
        info!(
            "{:<12} --> 낙찰 포기 처리: id={}, winner={}, 보증금 반환 {}",
            "Auction", item_id, winner_id, released
        );
        Ok(Some(item))
    }

    // endregion: --- Commands

    // region:    --- Sweeps

    /// 시작 시간이 된 경매를 active로 전환
    pub async fn activate_due_auctions(&self) -> Vec<AuctionItem> {
        let now = self.clock.now();
        let mut started = Vec::new();
        for handle in self.snapshot().await {
            let mut record = handle.lock().await;
            if record.promote_if_due(now) {
                started.push(record.item.clone());
                let staged = std::mem::take(&mut record.staged);
                self.flush(staged).await;
            }
        }
        if !started.is_empty() {
            info!("{:<12} --> 경매 시작: {}건", "Auction", started.len());
        }
        started
    }

    /// 마감된 경매 종료
    /// 낙찰자를 정하고 유찰자의 보증금을 환불한다. 낙찰자 보증금은 교환까지 유지된다.
    /// 이미 종료된 경매는 남은 환불만 다시 시도한다.
    pub async fn close_expired_auctions(&self) -> Vec<AuctionItem> {
        let now = self.clock.now();
        let mut closed = Vec::new();
        for handle in self.snapshot().await {
            let mut record = handle.lock().await;
            match record.item.status {
                AuctionStatus::Active if now >= record.item.ends_at => {
                    let winner = record.bids.last().map(|b| b.bidder_id.clone());
                    record.item.status = AuctionStatus::Ended;
                    record.item.ended_at = Some(now);
                    record.item.win_status = winner.as_ref().map(|_| WinStatus::Pending);
                    record.item.winner_id = winner.clone();
                    let final_bid = record.item.current_bid;
                    let item_id = record.item.id;
                    record.stage(AuctionEvent::AuctionClosed {
                        item_id,
                        winner_id: winner,
                        final_bid,
                        timestamp: now,
                    });
                    self.refund_losing_deposits(&mut record, now).await;
                    closed.push(record.item.clone());
                }
                AuctionStatus::Ended if record.has_unsettled_losing_holds() => {
                    self.refund_losing_deposits(&mut record, now).await;
                }
                _ => {}
            }
            let staged = std::mem::take(&mut record.staged);
            self.flush(staged).await;
        }
        if !closed.is_empty() {
            info!("{:<12} --> 경매 종료: {}건", "Auction", closed.len());
        }
        closed
    }

    /// 모든 종료 경매에 대해 낙찰 포기 처리
    pub async fn expire_unclaimed_wins(&self) -> Vec<AuctionItem> {
        let ids: Vec<i64> = self.auctions.read().await.keys().copied().collect();
        let mut forfeited = Vec::new();
        for id in ids {
            match self.expire_unclaimed_win(id).await {
                Ok(Some(item)) => forfeited.push(item),
                Ok(None) => {}
                Err(e) => error!("{:<12} --> 낙찰 포기 처리 실패: id={}, {}", "Auction", id, e),
            }
        }
        forfeited
    }

    async fn refund_losing_deposits(&self, record: &mut AuctionRecord, now: DateTime<Utc>) {
        let item_id = record.item.id;
        let winner_id = record.item.winner_id.clone();
        let losing: Vec<(String, i64)> = record
            .holds
            .values()
            .filter(|h| h.is_held() && Some(&h.bidder_id) != winner_id.as_ref())
            .map(|h| (h.bidder_id.clone(), h.amount))
            .collect();

        for (bidder_id, amount) in losing {
            let refunded = self
                .profiles
                .adjust_balance(
                    &bidder_id,
                    amount,
                    0,
                    BalanceReason::DepositRefund { auction_id: item_id },
                )
                .await;
            match refunded {
                Ok(_) => {
                    if let Some(hold) = record.holds.get_mut(&bidder_id) {
                        hold.status = HoldStatus::Refunded;
                        hold.settled_at = Some(now);
                    }
                    record.stage(AuctionEvent::DepositRefunded {
                        item_id,
                        bidder_id,
                        amount,
                        timestamp: now,
                    });
                }
                // 다음 스윕에서 다시 시도한다.
                Err(e) => error!(
                    "{:<12} --> 보증금 환불 실패: id={}, bidder={}, {}",
                    "Auction", item_id, bidder_id, e
                ),
            }
        }
    }

    // endregion: --- Sweeps

    // region:    --- Queries

    /// 경매 상태 조회
    pub async fn get(&self, item_id: i64) -> Result<AuctionItem, ServiceError> {
        let handle = self.record(item_id).await?;
        let record = handle.lock().await;
        Ok(record.item.clone())
    }

    /// 경매 목록 조회 (최신 등록순)
    pub async fn list(&self, filter: &AuctionFilter) -> Vec<AuctionItem> {
        let now = self.clock.now();
        let mut items = Vec::new();
        for handle in self.snapshot().await {
            let record = handle.lock().await;
            if filter.matches(&record.item, now) {
                items.push(record.item.clone());
            }
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    /// 입찰 이력 조회 (최신순)
    pub async fn bids(&self, item_id: i64) -> Result<Vec<Bid>, ServiceError> {
        let handle = self.record(item_id).await?;
        let record = handle.lock().await;
        Ok(record.bids.iter().rev().cloned().collect())
    }

    /// 최고 입찰 조회
    pub async fn highest_bid(&self, item_id: i64) -> Result<Option<Bid>, ServiceError> {
        let handle = self.record(item_id).await?;
        let record = handle.lock().await;
        Ok(record.bids.last().cloned())
    }

    /// 보증금 현황 조회
    pub async fn deposit_holds(&self, item_id: i64) -> Result<Vec<DepositHold>, ServiceError> {
        let handle = self.record(item_id).await?;
        let record = handle.lock().await;
        let mut holds: Vec<DepositHold> = record.holds.values().cloned().collect();
        holds.sort_by(|a, b| a.held_at.cmp(&b.held_at).then(a.bidder_id.cmp(&b.bidder_id)));
        Ok(holds)
    }

    // endregion: --- Queries

    async fn record(&self, item_id: i64) -> Result<Arc<Mutex<AuctionRecord>>, ServiceError> {
        self.auctions
            .read()
            .await
            .get(&item_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("auction {}", item_id)))
    }

    async fn snapshot(&self) -> Vec<Arc<Mutex<AuctionRecord>>> {
        self.auctions.read().await.values().cloned().collect()
    }

    /// 상품 잠금을 잡은 상태에서 호출해 집합체 버전 순서를 지킨다.
    async fn flush(&self, staged: Vec<(AuctionEvent, i64)>) {
        let now = self.clock.now();
        for (event, version) in staged {
            event_store::record(self.events.as_ref(), &event, version, now).await;
        }
    }
}
// endregion: --- Auction Engine

// region:    --- Imports
use crate::auction::AuctionEngine;
use crate::bidding::{
    Bid, BidPolicy, CreateAuctionCommand, DepositHold, PlaceBidCommand,
};
use crate::catalog::service::RECOMMENDATION_LIMIT;
use crate::catalog::{
    CatalogService, NewPartner, NewRedeemItem, Order, Partner, PaymentMethod, RedeemCommand,
    RedeemItem,
};
use crate::clock::Clock;
use crate::error::{AppError, ServiceError};
use crate::event_store::EventStore;
use crate::profile::{Preferences, ProfileStore, ProfileView};
use crate::query::{
    AuctionFilter, AuctionListView, AuctionStats, AuctionView, ItemFilter, PartnerFilter,
};
use crate::referral::{Referral, ReferralEngine, ReferralSummary};
use async_trait::async_trait;
use axum::extract::{DefaultBodyLimit, FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- State
#[derive(Clone)]
pub struct AppState {
    pub auctions: Arc<AuctionEngine>,
    pub referrals: Arc<ReferralEngine>,
    pub profiles: Arc<ProfileStore>,
    pub catalog: Arc<CatalogService>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// 같은 프로필 저장소와 이벤트 저장소를 공유하는 엔진 묶음
    pub fn new(events: Arc<dyn EventStore>, clock: Arc<dyn Clock>, policy: BidPolicy) -> Self {
        let profiles = Arc::new(ProfileStore::new(clock.clone(), events.clone()));
        Self {
            auctions: Arc::new(AuctionEngine::new(
                profiles.clone(),
                events.clone(),
                clock.clone(),
                policy,
            )),
            referrals: Arc::new(ReferralEngine::new(
                profiles.clone(),
                events.clone(),
                clock.clone(),
            )),
            catalog: Arc::new(CatalogService::new(profiles.clone(), events, clock.clone())),
            profiles,
            clock,
        }
    }
}

/// 요청한 회원 (x-member-id 헤더)
#[derive(Debug, Clone)]
pub struct CurrentMember(pub String);

pub const MEMBER_HEADER: &str = "x-member-id";

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentMember {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let member = parts
            .headers
            .get(MEMBER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ServiceError::BadRequest(format!("{} 헤더가 필요합니다.", MEMBER_HEADER))
            })?;
        Ok(CurrentMember(member.to_string()))
    }
}
// endregion: --- State

// region:    --- Router
pub fn create_router(state: AppState) -> Router {
    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/auctions", get(handle_list_auctions).post(handle_create_auction))
        .route("/auctions/:id", get(handle_get_auction))
        .route("/auctions/:id/bids", get(handle_get_bid_history))
        .route("/auctions/:id/highest-bid", get(handle_get_highest_bid))
        .route("/auctions/:id/deposits", get(handle_get_deposits))
        .route("/auctions/:id/claim", post(handle_claim_win))
        .route("/bid", post(handle_bid))
        .route("/members/:user_id/profile", get(handle_get_member_profile))
        .route("/me/profile", get(handle_get_my_profile))
        .route("/me/preferences", put(handle_update_preferences))
        .route("/me/referrals", get(handle_get_my_referrals))
        .route("/me/referral-code", get(handle_get_my_referral_code))
        .route("/me/recommendations", get(handle_get_recommendations))
        .route("/me/orders", get(handle_get_my_orders))
        .route("/referrals", post(handle_register_referral))
        .route("/referrals/:id/credit", post(handle_credit_referral))
        .route("/redeem-items", get(handle_list_items).post(handle_create_item))
        .route("/redeem-items/:id", get(handle_get_item))
        .route("/redeem", post(handle_redeem))
        .route("/partners", get(handle_list_partners).post(handle_create_partner))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}
// endregion: --- Router

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// region:    --- Auction Handlers

/// 경매 등록
pub async fn handle_create_auction(
    State(state): State<AppState>,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<(StatusCode, Json<AuctionView>), AppError> {
    info!("{:<12} --> 경매 등록 요청: {}", "Handler", cmd.title);
    let item = state.auctions.create_auction(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuctionView::new(item, state.clock.now())),
    ))
}

/// 경매 목록 (status, category 필터)
pub async fn handle_list_auctions(
    State(state): State<AppState>,
    Query(filter): Query<AuctionFilter>,
) -> Json<AuctionListView> {
    info!("{:<12} --> 경매 목록 조회: {:?}", "HandlerQuery", filter);
    let now = state.clock.now();
    let stats = AuctionStats::from_items(&state.auctions.list(&AuctionFilter::default()).await);
    let items = state
        .auctions
        .list(&filter)
        .await
        .into_iter()
        .map(|item| AuctionView::new(item, now))
        .collect();
    Json(AuctionListView { stats, items })
}

/// 경매 상태 조회
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<AuctionView>, AppError> {
    info!("{:<12} --> 경매 상태 조회 id: {}", "HandlerQuery", item_id);
    let item = state.auctions.get(item_id).await?;
    Ok(Json(AuctionView::new(item, state.clock.now())))
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<Vec<Bid>>, AppError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "HandlerQuery", item_id);
    Ok(Json(state.auctions.bids(item_id).await?))
}

/// 최고 입찰가 조회
pub async fn handle_get_highest_bid(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<Option<Bid>>, AppError> {
    info!("{:<12} --> 최고 입찰가 조회 id: {}", "HandlerQuery", item_id);
    Ok(Json(state.auctions.highest_bid(item_id).await?))
}

/// 보증금 보관 현황
pub async fn handle_get_deposits(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<Vec<DepositHold>>, AppError> {
    info!("{:<12} --> 보증금 조회 id: {}", "HandlerQuery", item_id);
    Ok(Json(state.auctions.deposit_holds(item_id).await?))
}

/// 입찰 요청 본문. 입찰자는 x-member-id 헤더로 정한다.
#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub item_id: i64,
    pub bid_amount: i64,
}

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    CurrentMember(bidder_id): CurrentMember,
    Json(req): Json<BidRequest>,
) -> Result<Json<AuctionView>, AppError> {
    let cmd = PlaceBidCommand {
        item_id: req.item_id,
        bidder_id,
        bid_amount: req.bid_amount,
    };
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Handler", cmd);
    let item = state.auctions.place_bid(cmd).await?;
    Ok(Json(AuctionView::new(item, state.clock.now())))
}

/// 낙찰 물품 교환
pub async fn handle_claim_win(
    State(state): State<AppState>,
    CurrentMember(bidder_id): CurrentMember,
    Path(item_id): Path<i64>,
) -> Result<Json<AuctionView>, AppError> {
    info!(
        "{:<12} --> 낙찰 교환 요청: id={}, bidder={}",
        "Handler", item_id, bidder_id
    );
    let item = state.auctions.claim_win(item_id, &bidder_id).await?;
    complete_referral(&state, &bidder_id).await;
    Ok(Json(AuctionView::new(item, state.clock.now())))
}

// endregion: --- Auction Handlers

// region:    --- Member Handlers

/// 회원 프로필 조회
pub async fn handle_get_member_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileView>, AppError> {
    info!("{:<12} --> 회원 프로필 조회: {}", "HandlerQuery", user_id);
    let profile = state.profiles.get_or_create(&user_id).await?;
    Ok(Json(ProfileView::from(profile)))
}

/// 내 프로필
pub async fn handle_get_my_profile(
    State(state): State<AppState>,
    CurrentMember(user_id): CurrentMember,
) -> Result<Json<ProfileView>, AppError> {
    info!("{:<12} --> 프로필 조회: {}", "HandlerQuery", user_id);
    let profile = state.profiles.get_or_create(&user_id).await?;
    Ok(Json(ProfileView::from(profile)))
}

/// 선호 설정 변경
pub async fn handle_update_preferences(
    State(state): State<AppState>,
    CurrentMember(user_id): CurrentMember,
    Json(preferences): Json<Preferences>,
) -> Result<Json<ProfileView>, AppError> {
    let profile = state
        .profiles
        .update_preferences(&user_id, preferences)
        .await?;
    Ok(Json(ProfileView::from(profile)))
}

/// 내가 추천한 목록 (최신순)
pub async fn handle_get_my_referrals(
    State(state): State<AppState>,
    CurrentMember(user_id): CurrentMember,
) -> Json<Vec<Referral>> {
    Json(state.referrals.referrals_for(&user_id).await)
}

/// 추천 코드와 마일스톤 진행 현황
pub async fn handle_get_my_referral_code(
    State(state): State<AppState>,
    CurrentMember(user_id): CurrentMember,
) -> Result<Json<ReferralSummary>, AppError> {
    // 코드가 조회되려면 프로필이 있어야 한다.
    state.profiles.get_or_create(&user_id).await?;
    Ok(Json(state.referrals.summary(&user_id).await))
}

/// 관심사 기반 추천 상품
pub async fn handle_get_recommendations(
    State(state): State<AppState>,
    CurrentMember(user_id): CurrentMember,
) -> Result<Json<Vec<RedeemItem>>, AppError> {
    Ok(Json(
        state
            .catalog
            .recommendations(&user_id, RECOMMENDATION_LIMIT)
            .await?,
    ))
}

pub async fn handle_get_my_orders(
    State(state): State<AppState>,
    CurrentMember(user_id): CurrentMember,
) -> Json<Vec<Order>> {
    Json(state.catalog.orders_for(&user_id).await)
}

// endregion: --- Member Handlers

// region:    --- Referral Handlers

#[derive(Debug, Deserialize)]
pub struct RegisterReferralRequest {
    pub code: String,
    pub referee_id: String,
}

/// 추천 코드로 가입 등록
pub async fn handle_register_referral(
    State(state): State<AppState>,
    Json(req): Json<RegisterReferralRequest>,
) -> Result<(StatusCode, Json<Referral>), AppError> {
    let referral = state
        .referrals
        .register_referral(&req.code, &req.referee_id)
        .await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

/// 추천 보상 지급
pub async fn handle_credit_referral(
    State(state): State<AppState>,
    Path(referral_id): Path<i64>,
) -> Result<Json<Referral>, AppError> {
    info!("{:<12} --> 추천 보상 요청: id={}", "Handler", referral_id);
    Ok(Json(state.referrals.credit_reward(referral_id).await?))
}

/// 교환이 끝난 회원의 대기 중 추천을 완료 처리
/// 교환 자체는 이미 확정되었으므로 실패는 로그만 남긴다.
async fn complete_referral(state: &AppState, user_id: &str) {
    if let Err(e) = state.referrals.mark_completed(user_id).await {
        warn!(
            "{:<12} --> 추천 완료 처리 실패: user={}, {}",
            "Handler", user_id, e
        );
    }
}

// endregion: --- Referral Handlers

// region:    --- Catalog Handlers

pub async fn handle_create_item(
    State(state): State<AppState>,
    Json(new_item): Json<NewRedeemItem>,
) -> Result<(StatusCode, Json<RedeemItem>), AppError> {
    let item = state.catalog.create_item(new_item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// 교환 상품 목록 (검색, 카테고리, 정렬)
pub async fn handle_list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> Json<Vec<RedeemItem>> {
    info!("{:<12} --> 교환 상품 조회: {:?}", "HandlerQuery", filter);
    Json(state.catalog.list_items(&filter).await)
}

pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<RedeemItem>, AppError> {
    Ok(Json(state.catalog.get_item(item_id).await?))
}

/// 교환 요청 본문. 교환하는 회원은 x-member-id 헤더로 정한다.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub redeem_item_id: i64,
    #[serde(default)]
    pub payment: PaymentMethod,
}

/// 마일리지 교환
pub async fn handle_redeem(
    State(state): State<AppState>,
    CurrentMember(user_id): CurrentMember,
    Json(req): Json<RedeemRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    info!(
        "{:<12} --> 교환 요청: user={}, item={}",
        "Handler", user_id, req.redeem_item_id
    );
    let order = state
        .catalog
        .redeem(RedeemCommand {
            user_id,
            redeem_item_id: req.redeem_item_id,
            payment: req.payment,
        })
        .await?;
    complete_referral(&state, &order.user_id).await;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn handle_create_partner(
    State(state): State<AppState>,
    Json(new_partner): Json<NewPartner>,
) -> Result<(StatusCode, Json<Partner>), AppError> {
    let partner = state.catalog.create_partner(new_partner).await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

pub async fn handle_list_partners(
    State(state): State<AppState>,
    Query(filter): Query<PartnerFilter>,
) -> Json<Vec<Partner>> {
    Json(state.catalog.list_partners(&filter).await)
}

// endregion: --- Catalog Handlers

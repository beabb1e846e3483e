// region:    --- Imports
use cathay_universe::clock::{Clock, SystemClock};
use cathay_universe::config::Config;
use cathay_universe::database::DatabaseManager;
use cathay_universe::event_store::{EventStore, MemoryEventStore, PostgresEventStore};
use cathay_universe::handlers::{create_router, AppState};
use cathay_universe::scheduler::AuctionScheduler;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    info!(
        "{:<12} --> 설정 로드: port={}, sweep={}s, bid_policy={:?}",
        "Main", config.port, config.sweep_interval_secs, config.bid_policy
    );

    let events = build_event_store(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(events, clock, config.bid_policy);

    // 경매 시작/종료, 낙찰 몰수, 추천 보상 주기 처리
    let scheduler = AuctionScheduler::new(
        state.auctions.clone(),
        state.referrals.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    );
    scheduler.start();

    let routes_all = create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main

/// DATABASE_URL이 있으면 Postgres, 없으면 메모리 이벤트 저장소
async fn build_event_store(
    config: &Config,
) -> Result<Arc<dyn EventStore>, Box<dyn std::error::Error>> {
    let Some(database_url) = config.database_url.as_deref() else {
        info!("{:<12} --> 메모리 이벤트 저장소 사용", "Main");
        return Ok(Arc::new(MemoryEventStore::new()));
    };

    let db_manager = DatabaseManager::new(database_url).await?;
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    #[allow(unused_mut)]
    let mut store = PostgresEventStore::new(db_manager.get_pool());

    #[cfg(feature = "kafka")]
    if let Some(brokers) = config.kafka_brokers.as_deref() {
        use cathay_universe::message_broker::{KafkaProducer, EVENTS_TOPIC};
        let producer = KafkaProducer::new(brokers)?;
        producer.create_topic(EVENTS_TOPIC, 5, 1).await?;
        info!("{:<12} --> Kafka 초기화 성공", "Main");
        store = store.with_producer(Arc::new(producer));
    }

    Ok(Arc::new(store))
}

/// 이벤트 저장소
/// 엔진의 모든 상태 전이는 도메인 이벤트로 기록되고 발행된다.
// region:    --- Imports
#[cfg(feature = "kafka")]
use crate::message_broker::{KafkaProducer, EVENTS_TOPIC};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Event Model
/// 이벤트 저장소에 저장되는 이벤트 모델
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub aggregate_id: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub version: i64,
}

/// 이벤트 봉투로 감쌀 수 있는 도메인 이벤트
pub trait DomainEvent: Serialize {
    fn event_type(&self) -> &'static str;
    fn aggregate_id(&self) -> String;
}

impl Event {
    pub fn from_domain<E: DomainEvent>(
        domain_event: &E,
        version: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, EventStoreError> {
        Ok(Event {
            id: 0,
            aggregate_id: domain_event.aggregate_id(),
            event_type: domain_event.event_type().to_string(),
            data: serde_json::to_value(domain_event)
                .map_err(|e| EventStoreError::Serialization(e.to_string()))?,
            timestamp,
            version,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    #[error("버전 충돌: {aggregate_id} v{version}")]
    VersionConflict { aggregate_id: String, version: i64 },
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("broker error: {0}")]
    Broker(String),
}

impl From<sqlx::Error> for EventStoreError {
    fn from(err: sqlx::Error) -> Self {
        EventStoreError::Database(err.to_string())
    }
}
// endregion: --- Event Model

// region:    --- Event Store Trait
/// 이벤트 저장소 트레이트
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 이벤트를 저장하고 발행한다. 저장된 이벤트 id를 돌려준다.
    async fn append_and_publish_event(&self, event: Event) -> Result<i64, EventStoreError>;

    /// 집합체(aggregate)의 이벤트를 버전 순으로 조회
    async fn events_for(&self, aggregate_id: &str) -> Result<Vec<Event>, EventStoreError>;
}

/// 도메인 이벤트를 기록한다.
/// 엔진의 상태 전이는 이미 반영된 뒤이므로 발행 실패는 로그로만 남긴다.
pub async fn record<E: DomainEvent>(
    store: &dyn EventStore,
    domain_event: &E,
    version: i64,
    timestamp: DateTime<Utc>,
) {
    let event = match Event::from_domain(domain_event, version, timestamp) {
        Ok(event) => event,
        Err(e) => {
            error!("{:<12} --> 이벤트 직렬화 실패: {:?}", "EventStore", e);
            return;
        }
    };
    let event_type = event.event_type.clone();
    match store.append_and_publish_event(event).await {
        Ok(id) => debug!("{:<12} --> {} 이벤트 저장: id={}", "EventStore", event_type, id),
        Err(e) => error!(
            "{:<12} --> {} 이벤트 저장 실패: {:?}",
            "EventStore", event_type, e
        ),
    }
}
// endregion: --- Event Store Trait

// region:    --- Memory Event Store
/// 메모리 이벤트 저장소 (DATABASE_URL이 없을 때, 테스트)
pub struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
    sender: broadcast::Sender<Event>,
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventStore {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            events: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// 발행되는 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// 저장된 전체 이벤트
    pub async fn all_events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_and_publish_event(&self, mut event: Event) -> Result<i64, EventStoreError> {
        let mut events = self.events.lock().await;
        if events
            .iter()
            .any(|e| e.aggregate_id == event.aggregate_id && e.version == event.version)
        {
            return Err(EventStoreError::VersionConflict {
                aggregate_id: event.aggregate_id,
                version: event.version,
            });
        }
        event.id = events.len() as i64 + 1;
        events.push(event.clone());
        // 구독자가 없으면 send가 실패하지만 저장은 이미 끝났다.
        let _ = self.sender.send(event.clone());
        Ok(event.id)
    }

    async fn events_for(&self, aggregate_id: &str) -> Result<Vec<Event>, EventStoreError> {
        let events = self.events.lock().await;
        let mut matching: Vec<Event> = events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.version);
        Ok(matching)
    }
}
// endregion: --- Memory Event Store

// region:    --- Postgres Event Store
/// 이벤트 저장소 구현체 (Postgres + 선택적 Kafka 발행)
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
    #[cfg(feature = "kafka")]
    kafka_producer: Option<Arc<KafkaProducer>>,
}

impl PostgresEventStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            #[cfg(feature = "kafka")]
            kafka_producer: None,
        }
    }

    /// Kafka 발행 연결
    #[cfg(feature = "kafka")]
    pub fn with_producer(mut self, producer: Arc<KafkaProducer>) -> Self {
        self.kafka_producer = Some(producer);
        self
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append_and_publish_event(&self, event: Event) -> Result<i64, EventStoreError> {
        let event_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (aggregate_id, event_type, data, timestamp, version)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (aggregate_id, version) DO NOTHING
            RETURNING id",
        )
        .bind(&event.aggregate_id)
        .bind(&event.event_type)
        .bind(&event.data)
        .bind(event.timestamp)
        .bind(event.version)
        .fetch_optional(&*self.pool)
        .await?
        .ok_or_else(|| EventStoreError::VersionConflict {
            aggregate_id: event.aggregate_id.clone(),
            version: event.version,
        })?;

        #[cfg(feature = "kafka")]
        if let Some(producer) = &self.kafka_producer {
            // 같은 집합체의 이벤트는 같은 파티션으로
            let key = event.aggregate_id.clone();
            let payload = serde_json::to_string(&Event {
                id: event_id,
                ..event
            })
            .map_err(|e| EventStoreError::Serialization(e.to_string()))?;
            producer
                .send_message(EVENTS_TOPIC, &key, &payload)
                .await
                .map_err(EventStoreError::Broker)?;
        }

        Ok(event_id)
    }

    async fn events_for(&self, aggregate_id: &str) -> Result<Vec<Event>, EventStoreError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, aggregate_id, event_type, data, timestamp, version
             FROM events WHERE aggregate_id = $1 ORDER BY version",
        )
        .bind(aggregate_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(events)
    }
}
// endregion: --- Postgres Event Store

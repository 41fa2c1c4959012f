//! Postgres 集成测试
//!
//! 需要可用的 PostgreSQL：通过 `DATABASE_URL` 指定连接串，
//! 未设置时直接跳过（保持 CI 无外部依赖时可运行）。
//!
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use eventum_domain::aggregate::Aggregate;
use eventum_domain::aggregate_root::AggregateRoot;
use eventum_domain::consumer::Consumer;
use eventum_domain::domain_event::{DomainEvent, EventCodec};
use eventum_domain::error::{DomainError, DomainResult};
use eventum_domain::persist::{UnitOfWork, UnitOfWorkFactory};
use eventum_postgres::schema::ensure_schema;
use eventum_postgres::unit_of_work::PgUnitOfWorkFactory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tally {
    total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TallyEvent {
    Added { amount: i64 },
}

impl DomainEvent for TallyEvent {
    fn event_type(&self) -> &'static str {
        "tallies.added"
    }
}

impl Aggregate for Tally {
    const TYPE: &'static str = "tallies";
    type Event = TallyEvent;

    fn mutate(&mut self, event: &Self::Event) -> DomainResult<()> {
        let TallyEvent::Added { amount } = event;
        self.total += amount;
        Ok(())
    }

    fn event_codec() -> &'static EventCodec<Self::Event> {
        static CODEC: LazyLock<EventCodec<TallyEvent>> = LazyLock::new(|| {
            EventCodec::builder()
                .entry("tallies.added", |value| serde_json::from_value(value))
                .build()
        });
        &CODEC
    }
}

async fn factory() -> Option<PgUnitOfWorkFactory> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping postgres integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to postgres");
    ensure_schema(&pool).await.expect("ensure schema");

    Some(PgUnitOfWorkFactory::new(pool))
}

#[tokio::test]
async fn events_round_trip_with_contiguous_versions() {
    let Some(factory) = factory().await else { return };

    let mut uow = factory.create().await.unwrap();
    let mut root = AggregateRoot::<Tally>::create();
    root.record(TallyEvent::Added { amount: 3 }).unwrap();
    root.record(TallyEvent::Added { amount: 4 }).unwrap();
    let stream_id = root.stream_id();
    uow.add(root);
    let collected = uow.commit().await.unwrap();

    assert_eq!(collected.len(), 2);
    assert_eq!(collected[0].version(), 0);
    assert_eq!(collected[1].version(), 1);

    let mut uow = factory.create().await.unwrap();
    let tracked = uow.get::<Tally>(stream_id).await.unwrap();
    {
        let root = tracked.lock().await;
        assert_eq!(root.total, 7);
        assert_eq!(root.version().value(), 1);
    }
    uow.rollback().await.unwrap();
}

#[tokio::test]
async fn get_missing_stream_signals_not_found() {
    let Some(factory) = factory().await else { return };

    let mut uow = factory.create().await.unwrap();
    let err = uow.get::<Tally>(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
    uow.rollback().await.unwrap();
}

#[tokio::test]
async fn concurrent_writers_collide_on_version() {
    let Some(factory) = factory().await else { return };

    let mut uow = factory.create().await.unwrap();
    let mut root = AggregateRoot::<Tally>::create();
    root.record(TallyEvent::Added { amount: 1 }).unwrap();
    let stream_id = root.stream_id();
    uow.add(root);
    uow.commit().await.unwrap();

    let mut first = factory.create().await.unwrap();
    let mut second = factory.create().await.unwrap();

    let tracked_first = first.get::<Tally>(stream_id).await.unwrap();
    let tracked_second = second.get::<Tally>(stream_id).await.unwrap();

    tracked_first
        .lock()
        .await
        .record(TallyEvent::Added { amount: 10 })
        .unwrap();
    tracked_second
        .lock()
        .await
        .record(TallyEvent::Added { amount: 20 })
        .unwrap();

    first.commit().await.unwrap();
    let err = second.commit().await.unwrap_err();
    assert!(matches!(err, DomainError::DuplicateVersion { .. }));
}

#[tokio::test]
async fn duplicate_processed_mark_is_detectable() {
    let Some(factory) = factory().await else { return };

    let message_id = Uuid::new_v4();

    let mut uow = factory.create().await.unwrap();
    assert!(!uow.is_processed(message_id).await.unwrap());
    uow.mark_processed(message_id).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = factory.create().await.unwrap();
    assert!(uow.is_processed(message_id).await.unwrap());
    let err = uow.mark_processed(message_id).await.unwrap_err();
    assert!(matches!(err, DomainError::DuplicateMessage { .. }));
    uow.rollback().await.unwrap();
}

#[tokio::test]
async fn consumer_offset_survives_commit() {
    let Some(factory) = factory().await else { return };

    let consumer = Consumer::create("tallies.added", format!("itest-{}", Uuid::new_v4()), true);
    let id = consumer.id();

    let mut uow = factory.create().await.unwrap();
    uow.add_consumer(&consumer).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = factory.create().await.unwrap();
    let mut row = uow.consumer(id).await.unwrap();
    assert_eq!(row.acked_id(), "0");
    row.ack("1693-0");
    uow.update_consumer(&row).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = factory.create().await.unwrap();
    assert_eq!(uow.consumer(id).await.unwrap().acked_id(), "1693-0");
    uow.rollback().await.unwrap();
}

#[tokio::test]
async fn rollback_discards_state_and_outbox_rows() {
    let Some(factory) = factory().await else { return };

    let mut uow = factory.create().await.unwrap();
    let mut root = AggregateRoot::<Tally>::create();
    root.record(TallyEvent::Added { amount: 5 }).unwrap();
    let stream_id = root.stream_id();
    let tracked = uow.add(root);
    uow.save(&tracked).await.unwrap();
    uow.rollback().await.unwrap();

    let mut uow = factory.create().await.unwrap();
    let err = uow.get::<Tally>(stream_id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
    uow.rollback().await.unwrap();
}

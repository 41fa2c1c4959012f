//! 端到端流程：命令 → 聚合事件持久化 → 发件箱/外化 → 跨域消费。
//!
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use eventum_application::consume::{
    BrokerPublisher, ConsumerConfig, ConsumerEngine, ConsumerEngineConfig, StreamBroker,
};
use eventum_application::handler::{CommandHandler, EventHandler};
use eventum_application::idempotent::Idempotent;
use eventum_application::in_memory::{
    InMemoryBroker, InMemoryStore, InMemoryUnitOfWork, InMemoryUnitOfWorkFactory,
};
use eventum_application::message::Message;
use eventum_application::message_bus::MessageBus;
use eventum_domain::aggregate::Aggregate;
use eventum_domain::aggregate_root::AggregateRoot;
use eventum_domain::domain_event::{DomainEvent, EventCodec};
use eventum_domain::error::DomainResult;
use eventum_domain::message::Command;
use eventum_domain::persist::{StoredEvent, UnitOfWork, UnitOfWorkFactory};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Order {
    reference: String,
    lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum OrderEvent {
    Placed { reference: String },
    LineAdded { sku: String },
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed { .. } => "orders.placed",
            OrderEvent::LineAdded { .. } => "orders.line_added",
        }
    }
}

impl Aggregate for Order {
    const TYPE: &'static str = "orders";
    type Event = OrderEvent;

    fn mutate(&mut self, event: &Self::Event) -> DomainResult<()> {
        match event {
            OrderEvent::Placed { reference } => self.reference = reference.clone(),
            OrderEvent::LineAdded { sku } => self.lines.push(sku.clone()),
        }
        Ok(())
    }

    fn event_codec() -> &'static EventCodec<Self::Event> {
        static CODEC: LazyLock<EventCodec<OrderEvent>> = LazyLock::new(|| {
            EventCodec::builder()
                .entry("orders.placed", |value| serde_json::from_value(value))
                .entry("orders.line_added", |value| serde_json::from_value(value))
                .build()
        });
        &CODEC
    }
}

#[derive(Debug, Clone)]
struct PlaceOrder {
    command_id: Uuid,
    client_id: Uuid,
    reference: String,
    sku: String,
}

impl Command for PlaceOrder {
    const NAME: &'static str = "place_order";

    fn command_id(&self) -> Uuid {
        self.command_id
    }

    fn client_id(&self) -> Uuid {
        self.client_id
    }
}

struct PlaceOrderHandler;

#[async_trait]
impl CommandHandler<InMemoryUnitOfWork, PlaceOrder> for PlaceOrderHandler {
    async fn handle(
        &self,
        uow: &mut InMemoryUnitOfWork,
        command: PlaceOrder,
    ) -> anyhow::Result<()> {
        if command.reference.is_empty() {
            return Err(eventum_domain::error::DomainError::InvalidCommand {
                reason: "order reference must not be empty".into(),
            }
            .into());
        }

        let mut order = AggregateRoot::<Order>::create();
        order.record(OrderEvent::Placed {
            reference: command.reference,
        })?;
        order.record(OrderEvent::LineAdded { sku: command.sku })?;
        uow.add(order);
        Ok(())
    }
}

struct InvoiceOnPlaced {
    invoiced: Arc<AtomicUsize>,
}

#[async_trait]
impl EventHandler<InMemoryUnitOfWork> for InvoiceOnPlaced {
    fn name(&self) -> &str {
        "invoice_on_placed"
    }

    async fn handle(
        &self,
        _uow: &mut InMemoryUnitOfWork,
        _event: &StoredEvent,
    ) -> anyhow::Result<()> {
        self.invoiced.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn command_to_downstream_consumer_pipeline() {
    // 订单域：命令处理 + 外化发布
    let orders_store = InMemoryStore::new();
    let orders_factory = InMemoryUnitOfWorkFactory::new(orders_store.clone());
    let broker = Arc::new(InMemoryBroker::new());

    let orders_bus = MessageBus::builder("orders", orders_factory.clone())
        .on_command(Arc::new(PlaceOrderHandler))
        .publisher(Arc::new(BrokerPublisher::new(Arc::clone(&broker))))
        .build();

    let command = PlaceOrder {
        command_id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        reference: "o-42".into(),
        sku: "sku-7".into(),
    };
    let command_id = command.command_id;

    let trace = orders_bus
        .handle(Message::command(command))
        .await
        .unwrap();

    // 因果轨迹：命令 + 两条事件
    assert_eq!(trace.len(), 3);
    assert_eq!(trace[0], command_id);

    // 事件流位点 0、1，发件箱每事件一行
    let outbox = orders_store.outbox().await;
    assert_eq!(outbox.len(), 2);
    let stream_id: Uuid = serde_json::from_value(outbox[0].data()["stream_id"].clone()).unwrap();
    let rows = orders_store.events(stream_id).await;
    assert_eq!(
        rows.iter().map(StoredEvent::version).collect::<Vec<_>>(),
        vec![0, 1]
    );

    // 读取 + 重放与直接折叠一致
    let mut uow = orders_factory.create().await.unwrap();
    let tracked = uow.get::<Order>(stream_id).await.unwrap();
    {
        let order = tracked.lock().await;
        assert_eq!(order.version().value(), 1);
        assert_eq!(order.reference, "o-42");
        assert_eq!(order.lines, vec!["sku-7"]);
    }
    uow.rollback().await.unwrap();

    // 两条本域事件都已外化到代理
    assert_eq!(broker.tip("orders.placed").await.unwrap(), "1");
    assert_eq!(broker.tip("orders.line_added").await.unwrap(), "1");

    // 账务域：独立存储，消费 orders.placed
    let billing_store = InMemoryStore::new();
    let billing_factory = InMemoryUnitOfWorkFactory::new(billing_store.clone());
    let invoiced = Arc::new(AtomicUsize::new(0));
    let billing_bus = MessageBus::builder("billing", billing_factory.clone())
        .on_event(
            "orders.placed",
            Arc::new(Idempotent::new(InvoiceOnPlaced {
                invoiced: invoiced.clone(),
            })),
        )
        .build();

    let engine = Arc::new(
        ConsumerEngine::builder()
            .bus(Arc::new(billing_bus))
            .broker(Arc::clone(&broker))
            .uow_factory(billing_factory.clone())
            .consumers(vec![ConsumerConfig {
                stream: "orders.placed".into(),
                name: "billing".into(),
                retroactive: true,
            }])
            .config(ConsumerEngineConfig {
                poll_interval: Duration::from_millis(20),
                read_count: 1,
            })
            .build(),
    );

    let handle = engine.start().await.unwrap();

    timeout(Duration::from_secs(2), async {
        loop {
            if invoiced.load(Ordering::SeqCst) >= 1 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("downstream consumer should handle the externalized event");

    handle.shutdown();
    handle.join().await;

    assert_eq!(invoiced.load(Ordering::SeqCst), 1);
    // 下游处理账本记录了事件标识
    assert!(billing_store.is_processed(rows[0].event_id()).await);
}

//! 外部事件流消费（consume）
//!
//! 统一编排"补齐消费者 → 轮询读取 → 解码分发 → 推进位点"的长驻任务：
//! - `StreamBroker`：外部追加型事件流代理的抽象能力；
//! - `BrokerPublisher`：总线外化发布到代理的适配器；
//! - `ConsumerEngine`：启动时按声明式配置补齐消费者行，
//!   为每个消费者生成独立读取任务，位点在处理成功的同一工作单元内推进；
//! - 任意异常记录日志后在下一个节拍继续（至少一次消费）；
//! - 提供关闭与等待的 `EngineHandle`。
//!
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use eventum_domain::consumer::Consumer;
use eventum_domain::error::{DomainError, DomainResult};
use eventum_domain::persist::{StoredEvent, UnitOfWork, UnitOfWorkFactory};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::message::Message;
use crate::message_bus::{EventPublisher, MessageBus};

/// 外部事件流代理协议（抽象能力，不在本库内实现网络传输）
#[async_trait]
pub trait StreamBroker: Send + Sync {
    /// 追加一条记录，返回代理分配的记录标识
    async fn append(&self, stream: &str, data: Value) -> anyhow::Result<String>;

    /// 读取给定位点之后的至多 `max_count` 条记录
    async fn read_after(
        &self,
        stream: &str,
        offset: &str,
        max_count: usize,
    ) -> anyhow::Result<Vec<StreamRecord>>;

    /// 当前流尾位点（用于非回溯消费者的起始位点）
    async fn tip(&self, stream: &str) -> anyhow::Result<String>;
}

/// 流记录：代理分配的标识与结构化负载
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    pub record_id: String,
    pub data: Value,
}

/// 将本域事件外化到事件流代理（事件类型即流名）
pub struct BrokerPublisher<B> {
    broker: Arc<B>,
}

impl<B> BrokerPublisher<B> {
    pub fn new(broker: Arc<B>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl<B: StreamBroker> EventPublisher for BrokerPublisher<B> {
    async fn publish(&self, event: &StoredEvent) -> anyhow::Result<()> {
        let data = serde_json::to_value(event)?;
        self.broker.append(event.event_type(), data).await?;
        Ok(())
    }
}

/// 消费者声明式配置（启动时用于补齐 consumer 行）
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// 目标流名（即事件类型判别符）
    pub stream: String,
    /// 消费者名称（唯一标识一个订阅）
    pub name: String,
    /// 新建时是否从头消费历史记录
    pub retroactive: bool,
}

/// 消费引擎配置
#[derive(Clone, Copy, Debug)]
pub struct ConsumerEngineConfig {
    /// 两次轮询之间的固定退避间隔
    pub poll_interval: Duration,
    /// 单次轮询读取的最大记录数
    pub read_count: usize,
}

impl Default for ConsumerEngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            read_count: 1,
        }
    }
}

/// 消费引擎：
/// - 启动时补齐声明的消费者行；
/// - 每个消费者一个独立读取任务，迭代为
///   读取 → 解码 → 分发总线 → 同一工作单元内推进位点并提交
#[derive(Builder)]
pub struct ConsumerEngine<F, B>
where
    F: UnitOfWorkFactory,
    B: StreamBroker,
{
    bus: Arc<MessageBus<F>>,
    broker: Arc<B>,
    uow_factory: F,
    consumers: Vec<ConsumerConfig>,
    #[builder(default)]
    config: ConsumerEngineConfig,
}

impl<F, B> ConsumerEngine<F, B>
where
    F: UnitOfWorkFactory,
    B: StreamBroker + 'static,
{
    /// 启动消费引擎，返回可用于关闭/等待的句柄
    pub async fn start(self: Arc<Self>) -> Result<EngineHandle, AppError> {
        if self.consumers.is_empty() {
            return Err(AppError::Domain(DomainError::Configuration {
                reason: "consumer engine started with no consumer configs".to_string(),
            }));
        }

        let consumers = self.ensure_consumers().await?;

        let token = CancellationToken::new();
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(consumers.len());

        for consumer in consumers {
            tasks.push(tokio::spawn(Self::read_loop(
                self.clone(),
                token.clone(),
                consumer.id(),
            )));
        }

        Ok(EngineHandle { token, tasks })
    }

    /// 补齐消费者行：为配置中尚不存在的名称创建新消费者；
    /// 非回溯消费者的起始位点取流尾
    async fn ensure_consumers(&self) -> Result<Vec<Consumer>, AppError> {
        let mut uow = self.uow_factory.create().await?;

        let existing: HashSet<String> = uow
            .consumers()
            .await?
            .into_iter()
            .map(|consumer| consumer.name().to_string())
            .collect();

        for config in &self.consumers {
            if existing.contains(&config.name) {
                continue;
            }

            let mut consumer =
                Consumer::create(config.stream.clone(), config.name.clone(), config.retroactive);
            if !config.retroactive {
                match self.broker.tip(&config.stream).await {
                    Ok(tip) => consumer.ack(&tip),
                    Err(err) => {
                        tracing::warn!(
                            stream = %config.stream,
                            consumer = %config.name,
                            error = %err,
                            "failed to read stream tip, starting from zero offset",
                        );
                    }
                }
            }
            uow.add_consumer(&consumer).await?;
        }

        let all = uow.consumers().await?;
        uow.commit().await?;

        Ok(all
            .into_iter()
            .filter(|consumer| {
                self.consumers
                    .iter()
                    .any(|config| config.name == consumer.name())
            })
            .collect())
    }

    async fn read_loop(self: Arc<Self>, token: CancellationToken, consumer_id: Uuid) {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.step(consumer_id).await {
                        tracing::error!(
                            consumer_id = %consumer_id,
                            error = %err,
                            "consumer iteration failed",
                        );
                    }
                }
            }
        }
    }

    /// 单次消费迭代。位点仅在记录成功分发后、在重读消费者行的
    /// 同一工作单元内推进：二者之间崩溃会导致重启后重投递，
    /// 下游处理器因此必须经处理账本保证幂等。
    async fn step(&self, consumer_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.uow_factory.create().await?;
        let mut consumer = uow.consumer(consumer_id).await?;

        let records = self
            .broker
            .read_after(consumer.stream(), consumer.acked_id(), self.config.read_count)
            .await
            .map_err(AppError::Broker)?;

        if records.is_empty() {
            uow.rollback().await?;
            return Ok(());
        }

        for record in records {
            let event = decode_record(consumer.stream(), &record)?;
            self.bus.handle(Message::event(event)).await?;
            consumer.ack(&record.record_id);
        }

        uow.update_consumer(&consumer).await?;
        uow.commit().await?;

        Ok(())
    }
}

/// 将流记录解码为序列化事件，校验记录类型与消费流的映射
fn decode_record(stream: &str, record: &StreamRecord) -> Result<StoredEvent, AppError> {
    let event: StoredEvent =
        serde_json::from_value(record.data.clone()).map_err(DomainError::from)?;

    if event.event_type() != stream {
        return Err(AppError::Domain(DomainError::UnknownEventType {
            event_type: event.event_type().to_string(),
        }));
    }

    Ok(event)
}

/// 引擎运行句柄：用于优雅关闭与等待任务结束
#[derive(Debug)]
pub struct EngineHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for task in tasks {
            let _ = task.await;
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

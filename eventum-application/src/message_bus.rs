//! 消息总线（MessageBus）
//!
//! 单一入口 `handle`：以入站消息播种 FIFO 工作队列，处理至队列排空，
//! 记录每条已处理消息的标识，产出一条可复现的因果轨迹。
//!
//! - 事件处理：先尽力外化本域事件（失败仅记录日志），再为每个注册
//!   处理器分配全新工作单元；处理器成功后将其工作单元收集到的事件
//!   追加到队列尾部。单个事件处理器的异常被捕获并记录，不影响
//!   同一事件的其他处理器与已入队的后续工作。
//! - 命令处理：按命令类型解析唯一处理器（类型擦除 + `TypeId` 路由）；
//!   未注册的命令记录错误日志而不崩溃。命令经处理账本实现恰好一次
//!   生效；处理器异常回滚后同步传播给调用方。
//!
use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use eventum_domain::message::Command;
use eventum_domain::persist::{StoredEvent, UnitOfWork, UnitOfWorkFactory};
use uuid::Uuid;

use crate::error::AppError;
use crate::handler::{CommandHandler, EventHandler};
use crate::message::{CommandEnvelope, Message};

/// 对外发布协议：将本域事件外化到外部事件流
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &StoredEvent) -> anyhow::Result<()>;
}

type ErasedCommandFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

type ErasedCommandFn<U> =
    Arc<dyn for<'a> Fn(&'a mut U, Box<dyn Any + Send>) -> ErasedCommandFuture<'a> + Send + Sync>;

struct CommandEntry<U> {
    name: &'static str,
    invoke: ErasedCommandFn<U>,
}

/// 消息总线：命令/事件分发与级联排空
pub struct MessageBus<F: UnitOfWorkFactory> {
    domain: String,
    uow_factory: F,
    event_handlers: HashMap<String, Vec<Arc<dyn EventHandler<F::Uow>>>>,
    command_handlers: HashMap<TypeId, CommandEntry<F::Uow>>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl<F: UnitOfWorkFactory> MessageBus<F> {
    pub fn builder(domain: impl Into<String>, uow_factory: F) -> MessageBusBuilder<F> {
        MessageBusBuilder {
            domain: domain.into(),
            uow_factory,
            event_handlers: HashMap::new(),
            command_handlers: HashMap::new(),
            publisher: None,
        }
    }

    /// 本总线实例所属的域
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 单一入口：处理入站消息并级联排空产生的事件，
    /// 返回按处理顺序排列的消息标识轨迹
    pub async fn handle(&self, message: Message) -> Result<Vec<Uuid>, AppError> {
        let mut queue: VecDeque<Message> = VecDeque::new();
        queue.push_back(message);

        let mut handled = Vec::new();

        while let Some(message) = queue.pop_front() {
            handled.push(message.message_id());

            match message {
                Message::Event(event) => self.handle_event(&event, &mut queue).await,
                Message::Command(envelope) => self.handle_command(envelope, &mut queue).await?,
            }
        }

        Ok(handled)
    }

    async fn handle_event(&self, event: &StoredEvent, queue: &mut VecDeque<Message>) {
        // 本域事件先尽力外化：内部状态才是事实来源，外部投递至少一次
        if let Some(publisher) = &self.publisher {
            if event.domain() == self.domain {
                if let Err(err) = publisher.publish(event).await {
                    tracing::error!(
                        event_id = %event.event_id(),
                        event_type = event.event_type(),
                        error = %err,
                        "external publish failed",
                    );
                }
            }
        }

        let Some(handlers) = self.event_handlers.get(event.event_type()) else {
            return;
        };

        for handler in handlers {
            match self.run_event_handler(handler.as_ref(), event).await {
                Ok(collected) => queue.extend(collected.into_iter().map(Message::Event)),
                Err(err) => {
                    tracing::error!(
                        event_id = %event.event_id(),
                        handler = handler.name(),
                        error = %err,
                        "event handler failed",
                    );
                }
            }
        }
    }

    async fn run_event_handler(
        &self,
        handler: &dyn EventHandler<F::Uow>,
        event: &StoredEvent,
    ) -> Result<Vec<StoredEvent>, AppError> {
        let mut uow = self.uow_factory.create().await?;

        if let Err(source) = handler.handle(&mut uow, event).await {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            return Err(AppError::Handler {
                handler: handler.name().to_string(),
                source,
            });
        }

        Ok(uow.commit().await?)
    }

    async fn handle_command(
        &self,
        envelope: CommandEnvelope,
        queue: &mut VecDeque<Message>,
    ) -> Result<(), AppError> {
        let Some(entry) = self.command_handlers.get(&envelope.type_id()) else {
            // 命令单一归属：缺失处理器按配置错误记录，不使调用方崩溃
            tracing::error!(
                command = envelope.name(),
                command_id = %envelope.command_id(),
                "no handler registered for command",
            );
            return Ok(());
        };

        let command_id = envelope.command_id();
        let mut uow = self.uow_factory.create().await?;

        // 幂等处理：账本标记与业务效果共享同一事务
        if uow.is_processed(command_id).await? {
            uow.rollback().await?;
            return Ok(());
        }

        match (entry.invoke)(&mut uow, envelope.into_payload()).await {
            Ok(()) => {
                uow.mark_processed(command_id).await?;
                let collected = uow.commit().await?;
                queue.extend(collected.into_iter().map(Message::Event));
                Ok(())
            }
            Err(source) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(AppError::Handler {
                    handler: entry.name.to_string(),
                    source,
                })
            }
        }
    }
}

/// 总线构建器：在启动时登记处理器与发布函数
pub struct MessageBusBuilder<F: UnitOfWorkFactory> {
    domain: String,
    uow_factory: F,
    event_handlers: HashMap<String, Vec<Arc<dyn EventHandler<F::Uow>>>>,
    command_handlers: HashMap<TypeId, CommandEntry<F::Uow>>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl<F: UnitOfWorkFactory> MessageBusBuilder<F> {
    /// 为事件类型登记一个处理器（同一类型可登记多个）
    pub fn on_event(mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler<F::Uow>>) -> Self {
        self.event_handlers
            .entry(event_type.into())
            .or_default()
            .push(handler);
        self
    }

    /// 登记命令处理器（每个命令类型恰好一个，后登记者覆盖）
    pub fn on_command<C, H>(mut self, handler: Arc<H>) -> Self
    where
        C: Command,
        H: CommandHandler<F::Uow, C> + 'static,
    {
        let invoke: ErasedCommandFn<F::Uow> = Arc::new(move |uow, boxed| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                // 键与闭包共享同一泛型 C，正常情况下 downcast 不会失败
                match boxed.downcast::<C>() {
                    Ok(command) => handler.handle(uow, *command).await,
                    Err(_) => Err(anyhow::anyhow!("command payload mismatch: {}", C::NAME)),
                }
            })
        });

        self.command_handlers.insert(
            TypeId::of::<C>(),
            CommandEntry {
                name: C::NAME,
                invoke,
            },
        );
        self
    }

    /// 注入对外发布函数
    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> MessageBus<F> {
        MessageBus {
            domain: self.domain,
            uow_factory: self.uow_factory,
            event_handlers: self.event_handlers,
            command_handlers: self.command_handlers,
            publisher: self.publisher,
        }
    }
}

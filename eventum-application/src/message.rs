//! 总线消息（Message）
//!
//! 入站消息是命令或事件之一。命令以类型擦除信封携带，
//! 按 `TypeId` 路由到唯一处理器；事件以序列化形态携带，
//! 按类型判别符路由到全部注册处理器。
//!
use std::any::{Any, TypeId};
use std::fmt;

use eventum_domain::message::Command;
use eventum_domain::persist::StoredEvent;
use uuid::Uuid;

/// 总线入站消息
#[derive(Debug)]
pub enum Message {
    Command(CommandEnvelope),
    Event(StoredEvent),
}

impl Message {
    pub fn command<C: Command>(command: C) -> Self {
        Message::Command(CommandEnvelope::new(command))
    }

    pub fn event(event: StoredEvent) -> Self {
        Message::Event(event)
    }

    /// 消息标识（用于因果轨迹与幂等处理）
    pub fn message_id(&self) -> Uuid {
        match self {
            Message::Command(envelope) => envelope.command_id(),
            Message::Event(event) => event.event_id(),
        }
    }
}

/// 类型擦除的命令信封
pub struct CommandEnvelope {
    command_id: Uuid,
    client_id: Uuid,
    name: &'static str,
    type_id: TypeId,
    payload: Box<dyn Any + Send>,
}

impl CommandEnvelope {
    pub fn new<C: Command>(command: C) -> Self {
        Self {
            command_id: command.command_id(),
            client_id: command.client_id(),
            name: C::NAME,
            type_id: TypeId::of::<C>(),
            payload: Box::new(command),
        }
    }

    pub fn command_id(&self) -> Uuid {
        self.command_id
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEnvelope")
            .field("command_id", &self.command_id)
            .field("client_id", &self.client_id)
            .field("name", &self.name)
            .finish()
    }
}

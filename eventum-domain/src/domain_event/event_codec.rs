//! 事件解码表（EventCodec）
//!
//! 以显式、静态声明的方式将稳定的字符串判别符映射到解码函数，
//! 在启动时填充一次；解码未注册的判别符返回 `UnknownEventType`。
//!
use crate::domain_event::DomainEvent;
use crate::error::{DomainError, DomainResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// 单个事件类型的解码函数
pub type DecodeFn<E> = fn(Value) -> serde_json::Result<E>;

/// 事件类型到解码函数的静态注册表（每个聚合一张）
pub struct EventCodec<E> {
    entries: BTreeMap<&'static str, DecodeFn<E>>,
}

impl<E: DomainEvent> EventCodec<E> {
    pub fn builder() -> EventCodecBuilder<E> {
        EventCodecBuilder {
            entries: BTreeMap::new(),
        }
    }

    /// 判别符是否已注册
    pub fn contains(&self, event_type: &str) -> bool {
        self.entries.contains_key(event_type)
    }

    /// 已注册的全部判别符
    pub fn event_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// 按判别符解码事件载荷
    pub fn decode(&self, event_type: &str, payload: Value) -> DomainResult<E> {
        let Some(decode) = self.entries.get(event_type) else {
            return Err(DomainError::UnknownEventType {
                event_type: event_type.to_string(),
            });
        };

        decode(payload).map_err(DomainError::from)
    }
}

/// 注册表构建器：链式登记判别符与解码函数
pub struct EventCodecBuilder<E> {
    entries: BTreeMap<&'static str, DecodeFn<E>>,
}

impl<E: DomainEvent> EventCodecBuilder<E> {
    pub fn entry(mut self, event_type: &'static str, decode: DecodeFn<E>) -> Self {
        self.entries.insert(event_type, decode);
        self
    }

    pub fn build(self) -> EventCodec<E> {
        EventCodec {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum PingEvent {
        Pinged { count: u32 },
    }

    impl DomainEvent for PingEvent {
        fn event_type(&self) -> &'static str {
            match self {
                PingEvent::Pinged { .. } => "ping.pinged",
            }
        }
    }

    fn codec() -> EventCodec<PingEvent> {
        EventCodec::builder()
            .entry("ping.pinged", |value| serde_json::from_value(value))
            .build()
    }

    #[test]
    fn decode_registered_type() {
        let event = PingEvent::Pinged { count: 3 };
        let payload = serde_json::to_value(&event).unwrap();

        let decoded = codec().decode("ping.pinged", payload).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_unknown_type_errors() {
        let err = codec()
            .decode("ping.vanished", serde_json::json!({}))
            .unwrap_err();
        match err {
            DomainError::UnknownEventType { event_type } => {
                assert_eq!(event_type, "ping.vanished");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

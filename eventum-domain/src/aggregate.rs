//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合状态机的核心行为：
//! - `mutate` 将事件投影到状态（唯一的状态转移入口）；
//! - `event_codec` 提供该聚合事件类型的静态解码表；
//! - 零值状态由 `Default` 给出，重放时从零值逐事件折叠。
//!
use crate::domain_event::{DomainEvent, EventCodec};
use crate::error::DomainResult;

/// 聚合状态接口
pub trait Aggregate: Default + Send + Sync + 'static {
    /// 聚合类型名（同时作为事件类型判别符的域前缀）
    const TYPE: &'static str;

    /// 该聚合产生的领域事件类型
    type Event: DomainEvent;

    /// 应用事件，更新聚合状态；
    /// 对无法识别的事件类型返回 `UnknownEventType`
    fn mutate(&mut self, event: &Self::Event) -> DomainResult<()>;

    /// 该聚合事件类型的静态解码表（启动时填充一次）
    fn event_codec() -> &'static EventCodec<Self::Event>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::Aggregate;
    use crate::domain_event::{DomainEvent, EventCodec};
    use crate::error::{DomainError, DomainResult};
    use serde::{Deserialize, Serialize};
    use std::sync::LazyLock;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub(crate) struct Counter {
        pub(crate) value: i32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) enum CounterEvent {
        Added { amount: i32 },
        Subtracted { amount: i32 },
        // 旧版本遗留的事件类型，当前聚合不再识别
        Imported { amount: i32 },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Added { .. } => "counters.added",
                CounterEvent::Subtracted { .. } => "counters.subtracted",
                CounterEvent::Imported { .. } => "counters.imported",
            }
        }
    }

    impl Aggregate for Counter {
        const TYPE: &'static str = "counters";
        type Event = CounterEvent;

        fn mutate(&mut self, event: &Self::Event) -> DomainResult<()> {
            match event {
                CounterEvent::Added { amount } => {
                    self.value += amount;
                    Ok(())
                }
                CounterEvent::Subtracted { amount } => {
                    self.value -= amount;
                    Ok(())
                }
                other => Err(DomainError::UnknownEventType {
                    event_type: other.event_type().to_string(),
                }),
            }
        }

        fn event_codec() -> &'static EventCodec<Self::Event> {
            static CODEC: LazyLock<EventCodec<CounterEvent>> = LazyLock::new(|| {
                EventCodec::builder()
                    .entry("counters.added", |value| serde_json::from_value(value))
                    .entry("counters.subtracted", |value| serde_json::from_value(value))
                    .build()
            });
            &CODEC
        }
    }

    #[test]
    fn mutate_applies_transition() {
        let mut counter = Counter::default();
        counter.mutate(&CounterEvent::Added { amount: 3 }).unwrap();
        counter
            .mutate(&CounterEvent::Subtracted { amount: 1 })
            .unwrap();
        assert_eq!(counter.value, 2);
    }

    #[test]
    fn mutate_rejects_unknown_event_type() {
        let mut counter = Counter::default();
        let err = counter
            .mutate(&CounterEvent::Imported { amount: 5 })
            .unwrap_err();
        match err {
            DomainError::UnknownEventType { event_type } => {
                assert_eq!(event_type, "counters.imported");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

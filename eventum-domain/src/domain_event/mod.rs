//! 领域事件（Domain Event）
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、为载荷补充消息标识与
//! 产生时间的 `EventEnvelope`，以及类型判别符到解码函数的静态注册表
//! （`EventCodec`）。

mod domain_event_trait;
mod event_codec;
mod event_envelope;

pub use domain_event_trait::{DomainEvent, domain_of};
pub use event_codec::{DecodeFn, EventCodec, EventCodecBuilder};
pub use event_envelope::EventEnvelope;

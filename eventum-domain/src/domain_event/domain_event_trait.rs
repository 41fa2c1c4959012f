use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 事件类型判别符，同时作为外部流名（形如 `orders.placed`）
    fn event_type(&self) -> &'static str;
}

/// 事件类型所属的域（流名中 `.` 之前的前缀）
pub fn domain_of(event_type: &str) -> &str {
    event_type.split('.').next().unwrap_or(event_type)
}

//! 事件流消费者聚合（Consumer）
//!
//! 跟踪一个外部事件流的消费进度：目标流名、处理器名称、
//! 最近成功处理的记录位点（`acked_id`）与是否回溯消费历史记录。
//!
use uuid::Uuid;

/// 新建消费者的零值位点
pub const ZERO_OFFSET: &str = "0";

/// 事件流消费者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    id: Uuid,
    stream: String,
    name: String,
    acked_id: String,
    retroactive: bool,
}

impl Consumer {
    /// 工厂：创建新消费者并分配标识，位点从零值开始
    pub fn create(stream: impl Into<String>, name: impl Into<String>, retroactive: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream: stream.into(),
            name: name.into(),
            acked_id: ZERO_OFFSET.to_string(),
            retroactive,
        }
    }

    /// 由持久化行重建消费者
    pub fn restore(
        id: Uuid,
        stream: impl Into<String>,
        name: impl Into<String>,
        acked_id: impl Into<String>,
        retroactive: bool,
    ) -> Self {
        Self {
            id,
            stream: stream.into(),
            name: name.into(),
            acked_id: acked_id.into(),
            retroactive,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 最近成功处理的记录位点
    pub fn acked_id(&self) -> &str {
        &self.acked_id
    }

    pub fn retroactive(&self) -> bool {
        self.retroactive
    }

    /// 推进位点。位点单调不减：仅在记录处理成功之后调用。
    pub fn ack(&mut self, record_id: &str) {
        self.acked_id = record_id.to_string();
    }
}

//! 事务性事件溯源领域层基础库（eventum-domain）
//!
//! 提供以事件溯源为中心的通用抽象与构件，用于在应用中实现：
//! - 聚合（`aggregate`）与聚合根（`aggregate_root`）建模：状态完全由自身事件历史推导；
//! - 领域事件（`domain_event`）：事件信封、类型判别符与静态解码表；
//! - 命令（`message`）：表达意图的单一状态转移请求；
//! - 持久化协议（`persist`）：事件持久化模型、发件箱消息与工作单元（UnitOfWork）；
//! - 事件流消费者聚合（`consumer`）：外部流位点跟踪。
//!
//! 本 crate 尽量保持与存储与传输实现解耦，仅定义领域层接口与最小必要的错误类型，
//! 以便在不同基础设施（例如 Postgres、消息中间件等）上进行适配实现。
//!
//! 典型用法：
//! 1. 定义聚合与事件，实现 `Aggregate` 上的 `mutate` 与静态 `EventCodec`；
//! 2. 在命令/事件处理器中通过工作单元加载、变更并保存聚合；
//! 3. 工作单元在提交时将全部待持久化事件一并写入事件存储与发件箱。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod consumer;
pub mod domain_event;
pub mod error;
pub mod message;
pub mod persist;
pub mod value_object;

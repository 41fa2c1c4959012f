//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑。
//!

use std::fmt;

use serde::{Deserialize, Serialize};

/// 版本号（事件在聚合流中的持久化位点）
///
/// 提供类型安全的版本号操作，避免直接使用裸整数导致的语义不明确问题。
/// 流中第一条已提交事件的位点为 0；尚未提交任何事件的聚合持有创世前哨值。
///
/// # 示例
///
/// ```
/// use eventum_domain::value_object::Version;
///
/// let v = Version::new();
/// assert!(v.is_new());
///
/// let v0 = v.next();
/// assert_eq!(v0.value(), 0);
/// assert!(!v0.is_new());
///
/// assert!(v0 > v);
/// ```
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version(i64);

impl Version {
    /// 创建创世前版本（尚无已提交事件）
    pub const fn new() -> Self {
        Self(-1)
    }

    /// 从已持久化的位点创建版本号
    pub const fn from_value(value: i64) -> Self {
        Self(value)
    }

    /// 获取下一个位点
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// 获取版本号的值（创世前为 -1）
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// 检查是否为创世前版本（流中尚无已提交事件）
    pub const fn is_new(&self) -> bool {
        self.0 < 0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self::from_value(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.value()
    }
}

//! 注入令牌定义
//!
//! 令牌是可注入单元的身份标识，可作为注册表分区的键使用。

use std::any::TypeId;
use std::fmt;

/// 类型键
///
/// 由具体类型派生的令牌载体，携带类型 ID 与短名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// 从类型获取类型键
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>()
                .split("::")
                .last()
                .unwrap_or("Unknown"),
        }
    }

    /// 类型 ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 类型短名称（不包含模块路径）
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// 注入令牌
///
/// 同一注册表分区内令牌唯一；重复注册同一令牌会覆盖先前的条目
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InjectionToken {
    /// 类型令牌
    Type(TypeKey),
    /// 具名令牌（不透明字符串或符号）
    Named(String),
    /// INQUIRER 伪令牌：解析为发起请求方的实例，不经注册表查找
    Inquirer,
}

impl InjectionToken {
    /// 从类型派生令牌
    pub fn of<T: 'static>() -> Self {
        Self::Type(TypeKey::of::<T>())
    }

    /// 创建具名令牌
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for InjectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(key) => f.write_str(key.name()),
            Self::Named(name) => f.write_str(name),
            Self::Inquirer => f.write_str("INQUIRER"),
        }
    }
}

impl From<TypeKey> for InjectionToken {
    fn from(key: TypeKey) -> Self {
        Self::Type(key)
    }
}

impl From<&str> for InjectionToken {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for InjectionToken {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

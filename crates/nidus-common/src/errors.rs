//! 错误类型定义

use thiserror::Error;

/// 依赖注入错误类型
///
/// 所有字段均为 `String`，使错误可以 `Clone`：
/// 结算信号需要把同一个失败广播给所有等待方。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// 声明的依赖在注册表中不存在，或声明本身缺失
    #[error("未知依赖: {name}")]
    UnknownDependencies {
        /// 发起请求的组件名称
        name: String,
    },

    /// 依赖链回到了当前解析路径上的组件
    #[error("检测到循环依赖: {name}")]
    CircularDependency {
        /// 被重复请求的组件名称
        name: String,
    },

    /// 声明的次级可注入对象不可构造
    #[error("无效的可注入对象: {name}")]
    InvalidInjectable {
        /// 违规声明的名称
        name: String,
    },

    /// 运行时查找了注册表从未见过的令牌
    #[error("令牌未注册: {token}")]
    UnregisteredToken {
        /// 查找的令牌
        token: String,
    },

    /// 组件实例化失败
    #[error("组件实例化失败: {name}, 原因: {message}")]
    InstantiationFailed {
        /// 组件名称
        name: String,
        /// 失败原因
        message: String,
    },
}

impl DependencyError {
    /// 创建未知依赖错误
    pub fn unknown_dependencies(name: impl Into<String>) -> Self {
        Self::UnknownDependencies { name: name.into() }
    }

    /// 创建循环依赖错误
    pub fn circular_dependency(name: impl Into<String>) -> Self {
        Self::CircularDependency { name: name.into() }
    }

    /// 创建无效可注入对象错误
    pub fn invalid_injectable(name: impl Into<String>) -> Self {
        Self::InvalidInjectable { name: name.into() }
    }

    /// 创建令牌未注册错误
    pub fn unregistered_token(token: impl Into<String>) -> Self {
        Self::UnregisteredToken {
            token: token.into(),
        }
    }

    /// 创建实例化失败错误
    pub fn instantiation_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InstantiationFailed {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// 启动错误类型
///
/// [`crate::metadata::ModuleDecl`] 启动过程中所有致命错误的统一出口
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// 扫描或解析阶段的依赖注入错误
    #[error("依赖注入错误: {source}")]
    Dependency {
        /// 底层错误
        #[from]
        source: DependencyError,
    },

    /// 其他启动失败
    #[error("应用启动失败: {message}")]
    Failed {
        /// 失败原因
        message: String,
    },
}

/// 结果类型别名
pub type DependencyResult<T> = Result<T, DependencyError>;
/// 启动结果类型别名
pub type BootstrapResult<T> = Result<T, BootstrapError>;

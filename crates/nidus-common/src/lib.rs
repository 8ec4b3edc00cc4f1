//! # Nidus Common
//!
//! 提供 Nidus IoC 运行时的公共组件模型与工具。
//!
//! ## 核心组件
//!
//! - [`InjectionToken`] - 注入令牌
//! - [`Metatype`] - 组件元类型（显式声明替代运行时反射）
//! - [`MetadataReader`] - 元数据读取器接口
//! - [`ModuleDecl`] / [`ProviderDecl`] - 模块与提供者声明
//! - [`DependencyError`] / [`BootstrapError`] - 错误类型
//! - [`InstanceIdFactory`] - 实例 ID 工厂
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 异步优先的设计理念
//! - 显式声明优于隐式约定

pub mod component;
pub mod errors;
pub mod instance_id;
pub mod metadata;
pub mod token;

pub use component::*;
pub use errors::*;
pub use instance_id::*;
pub use metadata::*;
pub use token::*;

//! # Nidus Core
//!
//! 依赖解析引擎：组件注册、依赖图构建、带在途合并的异步实例化
//! 与循环依赖检测。
//!
//! ## 核心组件
//!
//! - [`ComponentRegistry`] - 令牌到描述符的三分区注册表
//! - [`ComponentDescriptor`] - 组件解析状态机
//! - [`DependencyScanner`] - 模块声明扫描器
//! - [`Injector`] - 递归依赖解析器
//! - [`InstanceLoader`] - 两阶段实例加载器
//! - [`ApplicationFactory`] - 应用组装入口
//!
//! ## 解析模型
//!
//! 每个描述符至多实例化一次：首个请求方成为所有者并驱动解析，
//! 并发请求方通过结算信号合并等待。解析链上的信号同时承载循环
//! 见证者集合，使任意长度的依赖环在实例化前被检出。

pub mod descriptor;
pub mod factory;
pub mod injector;
pub mod loader;
pub mod module_record;
pub mod registry;
pub mod scanner;
pub mod signal;

pub use descriptor::*;
pub use factory::*;
pub use injector::*;
pub use loader::*;
pub use module_record::*;
pub use registry::*;
pub use scanner::*;
pub use signal::*;

//! 模块记录
//!
//! 汇集扫描单个入口模块时遇到的声明，将原始提供者声明分类翻译为
//! 描述符并写入注册表。本运行时一个应用对应一个模块记录。

use crate::descriptor::{ComponentDescriptor, DescriptorRef};
use crate::registry::ComponentRegistry;
use nidus_common::{InstanceIdFactory, Metatype, ProviderDecl};
use std::sync::Arc;
use tracing::debug;

/// 模块记录
pub struct ModuleRecord {
    id: String,
    name: String,
    registry: Arc<ComponentRegistry>,
}

impl ModuleRecord {
    /// 为入口模块创建记录
    pub fn new(name: impl Into<String>, registry: Arc<ComponentRegistry>) -> Self {
        let name = name.into();
        Self {
            id: InstanceIdFactory::get(&name),
            name,
            registry,
        }
    }

    /// 模块 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 模块名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 注册表句柄
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// 注册一个提供者声明
    ///
    /// 普通类提供者以自身类型为令牌；自定义令牌类提供者按普通类
    /// 构建但注册在自定义令牌下；值提供者注册时即已解析。
    pub fn add_provider(&self, provider: &ProviderDecl) -> DescriptorRef {
        let descriptor = match provider {
            ProviderDecl::Class(metatype) => {
                debug!("注册类提供者 {}", metatype.name());
                ComponentDescriptor::new_class(metatype.token(), metatype.clone())
            }
            ProviderDecl::ClassWithToken { provide, use_class } => {
                debug!("注册自定义令牌类提供者 {provide} -> {}", use_class.name());
                ComponentDescriptor::new_class(provide.clone(), use_class.clone())
            }
            ProviderDecl::Value { provide, use_value } => {
                debug!("注册值提供者 {provide}");
                ComponentDescriptor::new_value(provide.clone(), use_value.clone())
            }
        };
        self.registry
            .add_provider(descriptor.token().clone(), descriptor.clone());
        descriptor
    }

    /// 注册一个次级可注入对象
    pub fn add_injectable(&self, injectable: &Arc<Metatype>) -> DescriptorRef {
        debug!("注册次级可注入对象 {}", injectable.name());
        let descriptor = ComponentDescriptor::new_class(injectable.token(), injectable.clone());
        self.registry
            .add_injectable(descriptor.token().clone(), descriptor.clone());
        descriptor
    }

    /// 注册一个控制器
    pub fn add_controller(&self, controller: &Arc<Metatype>) -> DescriptorRef {
        debug!("注册控制器 {}", controller.name());
        let descriptor = ComponentDescriptor::new_class(controller.token(), controller.clone());
        self.registry
            .add_controller(descriptor.token().clone(), descriptor.clone());
        descriptor
    }
}

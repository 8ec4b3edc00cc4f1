//! 组件注册表
//!
//! 令牌到描述符的三个独立分区：提供者、次级可注入对象、控制器。
//! 同一令牌可以同时出现在不同分区而互不影响。

use crate::descriptor::DescriptorRef;
use nidus_common::{DependencyError, DependencyResult, InjectionToken};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 注册表分区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// 提供者分区
    Providers,
    /// 次级可注入对象分区
    Injectables,
    /// 控制器分区
    Controllers,
}

/// 组件注册表
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    providers: RwLock<HashMap<InjectionToken, DescriptorRef>>,
    injectables: RwLock<HashMap<InjectionToken, DescriptorRef>>,
    controllers: RwLock<HashMap<InjectionToken, DescriptorRef>>,
}

impl ComponentRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册提供者；同令牌重复注册以后者为准
    pub fn add_provider(&self, token: InjectionToken, descriptor: DescriptorRef) {
        self.providers.write().insert(token, descriptor);
    }

    /// 注册次级可注入对象
    pub fn add_injectable(&self, token: InjectionToken, descriptor: DescriptorRef) {
        self.injectables.write().insert(token, descriptor);
    }

    /// 注册控制器
    pub fn add_controller(&self, token: InjectionToken, descriptor: DescriptorRef) {
        self.controllers.write().insert(token, descriptor);
    }

    /// 在提供者分区查找描述符
    pub fn get_provider(&self, token: &InjectionToken) -> Option<DescriptorRef> {
        self.providers.read().get(token).cloned()
    }

    /// 在指定分区查找描述符
    pub fn get_in(&self, partition: Partition, token: &InjectionToken) -> Option<DescriptorRef> {
        let map = match partition {
            Partition::Providers => &self.providers,
            Partition::Injectables => &self.injectables,
            Partition::Controllers => &self.controllers,
        };
        map.read().get(token).cloned()
    }

    /// 次级可注入对象分区是否已含该令牌
    pub fn has_injectable(&self, token: &InjectionToken) -> bool {
        self.injectables.read().contains_key(token)
    }

    /// 查找已解析的提供者实例并转换为具体类型
    ///
    /// 令牌未注册或尚未解析时返回 [`DependencyError::UnregisteredToken`]
    pub fn get<T: Send + Sync + 'static>(&self, token: &InjectionToken) -> DependencyResult<Arc<T>> {
        let descriptor = self
            .get_provider(token)
            .ok_or_else(|| DependencyError::unregistered_token(token.to_string()))?;
        if !descriptor.is_resolved() {
            return Err(DependencyError::unregistered_token(token.to_string()));
        }
        let instance = descriptor
            .instance()
            .ok_or_else(|| DependencyError::unregistered_token(token.to_string()))?;
        instance.downcast::<T>().map_err(|_| {
            DependencyError::instantiation_failed(descriptor.name(), "实例类型转换失败")
        })
    }

    /// 提供者分区描述符快照
    pub fn providers(&self) -> Vec<DescriptorRef> {
        self.providers.read().values().cloned().collect()
    }

    /// 次级可注入对象分区描述符快照
    pub fn injectables(&self) -> Vec<DescriptorRef> {
        self.injectables.read().values().cloned().collect()
    }

    /// 控制器条目快照，供路由层枚举
    pub fn controllers(&self) -> Vec<(InjectionToken, DescriptorRef)> {
        self.controllers
            .read()
            .iter()
            .map(|(token, descriptor)| (token.clone(), descriptor.clone()))
            .collect()
    }

    /// 清空提供者与次级可注入对象分区
    pub fn reset(&self) {
        debug!("重置组件注册表");
        self.providers.write().clear();
        self.injectables.write().clear();
    }
}

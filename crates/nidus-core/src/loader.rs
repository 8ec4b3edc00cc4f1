//! 实例加载器
//!
//! 两阶段驱动整个注册表：先为全部描述符同步分配原型壳，再按
//! 提供者 → 次级可注入对象 → 控制器的分区顺序并发实例化。

use crate::injector::Injector;
use crate::module_record::ModuleRecord;
use crate::registry::ComponentRegistry;
use futures::future;
use nidus_common::DependencyResult;
use std::sync::Arc;
use tracing::info;

/// 实例加载器
pub struct InstanceLoader {
    registry: Arc<ComponentRegistry>,
    injector: Injector,
}

impl InstanceLoader {
    /// 创建加载器
    pub fn new(registry: Arc<ComponentRegistry>, injector: Injector) -> Self {
        Self { registry, injector }
    }

    /// 创建注册表中全部组件的实例
    pub async fn create_instances_of_dependencies(
        &self,
        record: &ModuleRecord,
    ) -> DependencyResult<()> {
        self.create_prototypes();
        self.create_instances(record).await?;
        info!("{} 依赖初始化完成", record.name());
        Ok(())
    }

    /// 阶段一：同步分配原型壳
    fn create_prototypes(&self) {
        for descriptor in self.registry.providers() {
            self.injector.load_prototype(&descriptor);
        }
        for descriptor in self.registry.injectables() {
            self.injector.load_prototype(&descriptor);
        }
        for (_, descriptor) in self.registry.controllers() {
            self.injector.load_prototype(&descriptor);
        }
    }

    /// 阶段二：按分区顺序批量实例化
    ///
    /// 分区内并发，分区间严格串行；单个失败中止剩余阶段，
    /// 错误原样向上传播
    async fn create_instances(&self, record: &ModuleRecord) -> DependencyResult<()> {
        let providers = self.registry.providers();
        future::try_join_all(
            providers
                .iter()
                .map(|descriptor| self.injector.load_provider(descriptor, record)),
        )
        .await?;

        let injectables = self.registry.injectables();
        future::try_join_all(
            injectables
                .iter()
                .map(|descriptor| self.injector.load_injectable(descriptor, record)),
        )
        .await?;

        let controllers = self.registry.controllers();
        future::try_join_all(
            controllers
                .iter()
                .map(|(_, descriptor)| self.injector.load_controller(descriptor, record)),
        )
        .await?;
        Ok(())
    }
}

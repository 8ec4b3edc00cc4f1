//! 应用工厂
//!
//! 运行时的唯一公共入口：接收入口模块声明，依次完成扫描、
//! 原型分配与实例化，返回可查询的应用句柄。任一阶段失败时
//! 错误向调用方传播，不产出部分初始化的应用。

use crate::descriptor::DescriptorRef;
use crate::injector::Injector;
use crate::loader::InstanceLoader;
use crate::module_record::ModuleRecord;
use crate::registry::ComponentRegistry;
use crate::scanner::DependencyScanner;
use nidus_common::{
    BootstrapResult, DependencyResult, InjectionToken, MetadataReader, ModuleDecl,
    StaticMetadataReader,
};
use std::sync::Arc;
use tracing::info;

/// 应用工厂
pub struct ApplicationFactory;

impl ApplicationFactory {
    /// 使用标准元数据读取器创建应用
    pub async fn create(entry_module: &ModuleDecl) -> BootstrapResult<Application> {
        Self::create_with_reader(entry_module, Arc::new(StaticMetadataReader)).await
    }

    /// 使用自定义元数据读取器创建应用
    pub async fn create_with_reader(
        entry_module: &ModuleDecl,
        reader: Arc<dyn MetadataReader>,
    ) -> BootstrapResult<Application> {
        info!("正在初始化 {}", entry_module.name());
        let registry = Arc::new(ComponentRegistry::new());
        let record = ModuleRecord::new(entry_module.name(), registry.clone());

        let scanner = DependencyScanner::new(registry.clone(), reader.clone());
        scanner.scan(entry_module, &record)?;

        let injector = Injector::new(registry.clone(), reader);
        let loader = InstanceLoader::new(registry.clone(), injector);
        loader.create_instances_of_dependencies(&record).await?;

        info!("{} 初始化完成", entry_module.name());
        Ok(Application { registry })
    }
}

/// 应用句柄
///
/// 持有完全解析的注册表，供服务层查询实例与枚举控制器
#[derive(Debug)]
pub struct Application {
    registry: Arc<ComponentRegistry>,
}

impl Application {
    /// 注册表句柄
    pub fn registry(&self) -> Arc<ComponentRegistry> {
        self.registry.clone()
    }

    /// 查找已解析的提供者实例
    pub fn get<T: Send + Sync + 'static>(&self, token: &InjectionToken) -> DependencyResult<Arc<T>> {
        self.registry.get(token)
    }

    /// 控制器条目快照，供路由层注册路径
    pub fn controllers(&self) -> Vec<(InjectionToken, DescriptorRef)> {
        self.registry.controllers()
    }
}

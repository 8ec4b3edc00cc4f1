//! 依赖扫描器
//!
//! 遍历入口模块声明，注册提供者与控制器，并深入组件的方法元数据
//! 发现参数级管道，去重后补进次级可注入对象分区。

use crate::module_record::ModuleRecord;
use crate::registry::{ComponentRegistry, Partition};
use nidus_common::{
    DependencyError, DependencyResult, MetadataReader, Metatype, ModuleDecl, ProviderDecl,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 依赖扫描器
pub struct DependencyScanner {
    registry: Arc<ComponentRegistry>,
    reader: Arc<dyn MetadataReader>,
}

impl DependencyScanner {
    /// 创建扫描器
    pub fn new(registry: Arc<ComponentRegistry>, reader: Arc<dyn MetadataReader>) -> Self {
        Self { registry, reader }
    }

    /// 扫描入口模块并填充注册表
    pub fn scan(&self, entry_module: &ModuleDecl, record: &ModuleRecord) -> DependencyResult<()> {
        debug!("扫描模块 {}", entry_module.name());
        for provider in self.reader.providers_of(entry_module) {
            record.add_provider(&provider);
            match &provider {
                ProviderDecl::Class(metatype)
                | ProviderDecl::ClassWithToken {
                    use_class: metatype,
                    ..
                } => self.scan_param_injectables(metatype, record)?,
                ProviderDecl::Value { .. } => {}
            }
        }
        for controller in self.reader.controllers_of(entry_module) {
            record.add_controller(&controller);
            self.scan_param_injectables(&controller, record)?;
        }
        Ok(())
    }

    /// 检查组件各方法的参数管道声明
    ///
    /// 缺少可注入标记的管道立即中止扫描；合法管道去重后注册
    fn scan_param_injectables(
        &self,
        component: &Arc<Metatype>,
        record: &ModuleRecord,
    ) -> DependencyResult<()> {
        for method in self.reader.method_names_of(component) {
            for pipe in self.reader.param_injectables_of(component, &method) {
                if !self.reader.is_injectable(&pipe) {
                    warn!(
                        "{} 的方法 {method} 引用了不可注入的管道 {}",
                        component.name(),
                        pipe.name()
                    );
                    return Err(DependencyError::invalid_injectable(pipe.name()));
                }
                if self
                    .registry
                    .get_in(Partition::Injectables, &pipe.token())
                    .is_none()
                {
                    debug!("发现参数管道 {}", pipe.name());
                    record.add_injectable(&pipe);
                }
            }
        }
        Ok(())
    }
}

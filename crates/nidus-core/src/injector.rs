//! 解析器
//!
//! 核心解析算法：给定一个待实例化的描述符，并发地递归解析其全部
//! 构造依赖与属性依赖，检测循环依赖，实例化目标并完成属性注入。
//! 挂起描述符上的并发请求通过结算信号合并为一次实例化。

use crate::descriptor::{DescriptorRef, ResolutionTicket};
use crate::module_record::ModuleRecord;
use crate::registry::{ComponentRegistry, Partition};
use crate::signal::SettlementSignal;
use futures::future::{self, BoxFuture, FutureExt};
use nidus_common::{
    DependencyError, DependencyResult, Instance, InjectionToken, MetadataReader, Metatype,
    PropertyDependency, ResolvedArgs,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// 依赖边的落点：构造参数位置或属性键
enum DependencyKey {
    Index(usize),
    Key(String),
}

/// 当前解析链
///
/// 持有链上每个在途解析的信号。新进入解析的组件向链上所有信号
/// 登记自身 ID，挂起节点据此识别绕回自身下游的请求方。
#[derive(Clone, Default)]
struct ResolutionChain {
    signals: Vec<Arc<SettlementSignal>>,
}

impl ResolutionChain {
    /// 向链上全部祖先登记新组件并延长链
    fn extend(&self, id: &str, signal: Arc<SettlementSignal>) -> Self {
        for ancestor in &self.signals {
            ancestor.insert_witness(id);
        }
        let mut signals = self.signals.clone();
        signals.push(signal);
        Self { signals }
    }
}

/// 解析器
pub struct Injector {
    registry: Arc<ComponentRegistry>,
    reader: Arc<dyn MetadataReader>,
}

impl Injector {
    /// 创建解析器
    pub fn new(registry: Arc<ComponentRegistry>, reader: Arc<dyn MetadataReader>) -> Self {
        Self { registry, reader }
    }

    /// 分配原型壳；纯同步，不触发依赖解析
    pub fn load_prototype(&self, descriptor: &DescriptorRef) {
        descriptor.create_prototype();
    }

    /// 解析提供者分区中的描述符
    pub async fn load_provider(
        &self,
        descriptor: &DescriptorRef,
        record: &ModuleRecord,
    ) -> DependencyResult<()> {
        self.load_instance(
            descriptor,
            Partition::Providers,
            record,
            None,
            ResolutionChain::default(),
        )
        .await
    }

    /// 解析次级可注入对象分区中的描述符
    pub async fn load_injectable(
        &self,
        descriptor: &DescriptorRef,
        record: &ModuleRecord,
    ) -> DependencyResult<()> {
        self.load_instance(
            descriptor,
            Partition::Injectables,
            record,
            None,
            ResolutionChain::default(),
        )
        .await
    }

    /// 解析控制器；控制器以自身作为请求方加载
    pub async fn load_controller(
        &self,
        descriptor: &DescriptorRef,
        record: &ModuleRecord,
    ) -> DependencyResult<()> {
        self.load_instance(
            descriptor,
            Partition::Controllers,
            record,
            Some(descriptor.clone()),
            ResolutionChain::default(),
        )
        .await
    }

    /// 解析入口：加入已有的在途解析，或成为所有者驱动实例化
    ///
    /// 所有者路径保证恰好结算一次：成功时写入实例并广播完成，
    /// 失败时描述符退回未解析并向全部等待方广播错误。
    fn load_instance<'a>(
        &'a self,
        descriptor: &'a DescriptorRef,
        partition: Partition,
        record: &'a ModuleRecord,
        inquirer: Option<DescriptorRef>,
        chain: ResolutionChain,
    ) -> BoxFuture<'a, DependencyResult<()>> {
        async move {
            match descriptor.begin_resolution() {
                ResolutionTicket::Resolved => Ok(()),
                ResolutionTicket::Join(signal) => {
                    if let Some(inquirer) = &inquirer {
                        if signal.is_cycle(inquirer.id()) {
                            warn!("检测到循环依赖：{}", descriptor.name());
                            return Err(DependencyError::circular_dependency(descriptor.name()));
                        }
                    }
                    debug!("{} 解析中，加入等待", descriptor.name());
                    signal.settled().await
                }
                ResolutionTicket::Owner(signal) => {
                    if self.registry.get_in(partition, descriptor.token()).is_none() {
                        let err =
                            DependencyError::unregistered_token(descriptor.token().to_string());
                        descriptor.settle_failed(err.clone());
                        return Err(err);
                    }
                    let chain = chain.extend(descriptor.id(), signal);
                    let started = Instant::now();
                    match self
                        .resolve_and_instantiate(descriptor, record, inquirer.as_ref(), &chain)
                        .await
                    {
                        Ok(instance) => {
                            descriptor.settle_resolved(instance, started.elapsed());
                            debug!("{} 解析完成", descriptor.name());
                            Ok(())
                        }
                        Err(err) => {
                            descriptor.settle_failed(err.clone());
                            Err(err)
                        }
                    }
                }
            }
        }
        .boxed()
    }

    /// 并发解析构造依赖与属性依赖，全部就绪后实例化并注入属性
    async fn resolve_and_instantiate(
        &self,
        descriptor: &DescriptorRef,
        record: &ModuleRecord,
        parent_inquirer: Option<&DescriptorRef>,
        chain: &ResolutionChain,
    ) -> DependencyResult<Instance> {
        let metatype = descriptor.metatype().cloned().ok_or_else(|| {
            DependencyError::instantiation_failed(descriptor.name(), "描述符不可构造")
        })?;
        let (args, properties) = future::try_join(
            self.resolve_constructor_params(descriptor, &metatype, record, parent_inquirer, chain),
            self.resolve_properties(descriptor, &metatype, record, parent_inquirer, chain),
        )
        .await?;

        debug!("实例化 {}", descriptor.name());
        let mut instance = metatype.instantiate(ResolvedArgs::new(descriptor.name(), args))?;
        for (property, value) in properties {
            if let Some(value) = value {
                metatype.assign_property(&mut instance, &property.key, value)?;
            }
        }
        Ok(Arc::from(instance))
    }

    /// 按声明顺序并发解析构造依赖
    ///
    /// 可选依赖解析失败时降级为空位，必选依赖失败短路整批
    async fn resolve_constructor_params(
        &self,
        descriptor: &DescriptorRef,
        metatype: &Arc<Metatype>,
        record: &ModuleRecord,
        parent_inquirer: Option<&DescriptorRef>,
        chain: &ResolutionChain,
    ) -> DependencyResult<Vec<Option<Instance>>> {
        let dependencies = self.reader.dependencies_of(metatype);
        let optional_indices = self.reader.optional_indices_of(metatype);
        let params = dependencies.into_iter().enumerate().map(|(index, token)| {
            let optional = optional_indices.contains(&index);
            async move {
                match self
                    .resolve_single_param(
                        descriptor,
                        token,
                        DependencyKey::Index(index),
                        record,
                        parent_inquirer,
                        chain,
                    )
                    .await
                {
                    Ok(instance) => Ok(instance),
                    Err(_) if optional => Ok(None),
                    Err(err) => Err(err),
                }
            }
        });
        future::try_join_all(params).await
    }

    /// 并发解析属性依赖
    async fn resolve_properties(
        &self,
        descriptor: &DescriptorRef,
        metatype: &Arc<Metatype>,
        record: &ModuleRecord,
        parent_inquirer: Option<&DescriptorRef>,
        chain: &ResolutionChain,
    ) -> DependencyResult<Vec<(PropertyDependency, Option<Instance>)>> {
        let properties = self.reader.property_dependencies_of(metatype);
        let resolutions = properties.into_iter().map(|property| async move {
            match self
                .resolve_single_param(
                    descriptor,
                    Some(property.token.clone()),
                    DependencyKey::Key(property.key.clone()),
                    record,
                    parent_inquirer,
                    chain,
                )
                .await
            {
                Ok(instance) => Ok((property, instance)),
                Err(_) if property.optional => Ok((property, None)),
                Err(err) => Err(err),
            }
        });
        future::try_join_all(resolutions).await
    }

    /// 解析单个依赖项
    ///
    /// 请求方伪令牌直接取父请求方实例；其余令牌在提供者分区查找，
    /// 未解析的依赖以当前组件为请求方递归解析。自引用与缺失声明
    /// 判定为未知依赖。
    async fn resolve_single_param(
        &self,
        descriptor: &DescriptorRef,
        token: Option<InjectionToken>,
        key: DependencyKey,
        record: &ModuleRecord,
        parent_inquirer: Option<&DescriptorRef>,
        chain: &ResolutionChain,
    ) -> DependencyResult<Option<Instance>> {
        let Some(token) = token else {
            warn!(
                "{} 存在缺失的依赖声明，可能由循环导入或漏写声明导致",
                descriptor.name()
            );
            return Err(DependencyError::unknown_dependencies(descriptor.name()));
        };
        if token == InjectionToken::Inquirer {
            return Ok(parent_inquirer.and_then(|inquirer| inquirer.instance()));
        }
        if token == *descriptor.token() {
            warn!("{} 声明了对自身的依赖", descriptor.name());
            return Err(DependencyError::unknown_dependencies(descriptor.name()));
        }
        debug!("在 {} 中解析 {} 的依赖 {token}", record.name(), descriptor.name());
        let Some(dependency) = self.registry.get_provider(&token) else {
            return Err(DependencyError::unknown_dependencies(descriptor.name()));
        };
        debug!("在 {} 中找到 {token}", record.name());
        match key {
            DependencyKey::Index(index) => descriptor.add_ctor_edge(index, &dependency),
            DependencyKey::Key(ref property_key) => {
                descriptor.add_property_edge(property_key, &dependency);
            }
        }
        if !dependency.is_resolved() {
            self.load_instance(
                &dependency,
                Partition::Providers,
                record,
                Some(descriptor.clone()),
                chain.clone(),
            )
            .await?;
        }
        Ok(dependency.instance())
    }
}

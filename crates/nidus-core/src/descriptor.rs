//! 组件描述符
//!
//! 描述符包装一个可注入单元的完整解析状态，是运行时依赖图的节点。
//! 状态机：空闲 → 挂起 → 已解析；失败时由挂起退回未解析，
//! 允许后续调用方重新发起一次全新的解析尝试。
//! 已解析状态不可回退，实例最多写入一次。

use crate::signal::SettlementSignal;
use nidus_common::{DependencyError, Instance, InjectionToken, InstanceIdFactory, Metatype};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 描述符共享引用
pub type DescriptorRef = Arc<ComponentDescriptor>;

/// `begin_resolution` 的原子判定结果
pub enum ResolutionTicket {
    /// 已解析，无需任何工作
    Resolved,
    /// 他人解析中，凭信号加入等待
    Join(Arc<SettlementSignal>),
    /// 本调用成为所有者，负责驱动解析并恰好结算一次
    Owner(Arc<SettlementSignal>),
}

#[derive(Default)]
struct DescriptorState {
    instance: Option<Instance>,
    is_resolved: bool,
    is_pending: bool,
    signal: Option<Arc<SettlementSignal>>,
    init_time: Option<Duration>,
    ctor_edges: Vec<Option<DescriptorRef>>,
    property_edges: Vec<(String, DescriptorRef)>,
}

/// 组件描述符
pub struct ComponentDescriptor {
    id: String,
    token: InjectionToken,
    name: String,
    metatype: Option<Arc<Metatype>>,
    state: Mutex<DescriptorState>,
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ComponentDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("token", &self.token.to_string())
            .field("is_resolved", &state.is_resolved)
            .field("is_pending", &state.is_pending)
            .finish()
    }
}

impl ComponentDescriptor {
    /// 创建类描述符（未解析）
    pub fn new_class(token: InjectionToken, metatype: Arc<Metatype>) -> DescriptorRef {
        let name = metatype.name().to_string();
        Arc::new(Self {
            id: InstanceIdFactory::get(&name),
            token,
            name,
            metatype: Some(metatype),
            state: Mutex::new(DescriptorState::default()),
        })
    }

    /// 创建值描述符，注册时即已解析
    pub fn new_value(token: InjectionToken, value: Instance) -> DescriptorRef {
        let name = token.to_string();
        Arc::new(Self {
            id: InstanceIdFactory::get(&name),
            token,
            name,
            metatype: None,
            state: Mutex::new(DescriptorState {
                instance: Some(value),
                is_resolved: true,
                ..DescriptorState::default()
            }),
        })
    }

    /// 实例 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 注册令牌
    pub fn token(&self) -> &InjectionToken {
        &self.token
    }

    /// 组件名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 元类型；值描述符无元类型
    pub fn metatype(&self) -> Option<&Arc<Metatype>> {
        self.metatype.as_ref()
    }

    /// 当前实例（原型壳或已解析实例）
    pub fn instance(&self) -> Option<Instance> {
        self.state.lock().instance.clone()
    }

    /// 是否已解析
    pub fn is_resolved(&self) -> bool {
        self.state.lock().is_resolved
    }

    /// 是否解析中
    pub fn is_pending(&self) -> bool {
        self.state.lock().is_pending
    }

    /// 成功解析耗时
    pub fn init_time(&self) -> Option<Duration> {
        self.state.lock().init_time
    }

    /// 分配原型壳
    ///
    /// 仅对可构造且未解析的描述符生效，纯同步、不触发依赖解析
    pub fn create_prototype(&self) {
        let Some(metatype) = &self.metatype else {
            return;
        };
        let mut state = self.state.lock();
        if state.is_resolved || state.instance.is_some() {
            return;
        }
        if let Some(shell) = metatype.create_prototype() {
            debug!("为 {} 分配原型壳", self.name);
            state.instance = Some(Arc::from(shell));
        }
    }

    /// 进入解析：原子判定已解析 / 加入等待 / 成为所有者
    pub fn begin_resolution(&self) -> ResolutionTicket {
        let mut state = self.state.lock();
        if state.is_resolved {
            return ResolutionTicket::Resolved;
        }
        if state.is_pending {
            if let Some(signal) = &state.signal {
                return ResolutionTicket::Join(signal.clone());
            }
        }
        let signal = Arc::new(SettlementSignal::new());
        state.is_pending = true;
        state.signal = Some(signal.clone());
        ResolutionTicket::Owner(signal)
    }

    /// 以成功结算：写入实例、记录耗时并广播完成
    pub fn settle_resolved(&self, instance: Instance, elapsed: Duration) {
        let signal = {
            let mut state = self.state.lock();
            state.instance = Some(instance);
            state.is_resolved = true;
            state.is_pending = false;
            state.init_time = Some(elapsed);
            state.signal.take()
        };
        if let Some(signal) = signal {
            signal.complete();
        }
    }

    /// 以失败结算：退回未解析并向等待方广播错误
    pub fn settle_failed(&self, err: DependencyError) {
        let signal = {
            let mut state = self.state.lock();
            state.is_pending = false;
            state.signal.take()
        };
        if let Some(signal) = signal {
            signal.error(err);
        }
    }

    /// 记录一条构造依赖边
    pub fn add_ctor_edge(&self, index: usize, dependency: &DescriptorRef) {
        let mut state = self.state.lock();
        if state.ctor_edges.len() <= index {
            state.ctor_edges.resize(index + 1, None);
        }
        state.ctor_edges[index] = Some(dependency.clone());
    }

    /// 记录一条属性依赖边
    pub fn add_property_edge(&self, key: &str, dependency: &DescriptorRef) {
        self.state
            .lock()
            .property_edges
            .push((key.to_string(), dependency.clone()));
    }

    /// 已记录的构造依赖边快照
    pub fn constructor_edges(&self) -> Vec<Option<DescriptorRef>> {
        self.state.lock().ctor_edges.clone()
    }

    /// 已记录的属性依赖边快照
    pub fn property_edges(&self) -> Vec<(String, DescriptorRef)> {
        self.state.lock().property_edges.clone()
    }
}

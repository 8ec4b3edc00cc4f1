//! 组件元类型定义
//!
//! Rust 没有运行时反射，组件通过显式元类型声明自身的构造方式与依赖元数据。
//! 解析引擎只消费这些声明的结果，不关心声明是如何产生的。

use crate::errors::{DependencyError, DependencyResult};
use crate::metadata::{ConstructorDependency, MethodMetadata, PropertyDependency};
use crate::token::{InjectionToken, TypeKey};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 已解析的组件实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 属性注入前的可变实例
pub type BoxedInstance = Box<dyn Any + Send + Sync>;

/// 构造函数类型
///
/// 按声明顺序接收已解析的构造依赖，可选依赖解析失败时对应位置为空
pub type ConstructFn = dyn Fn(ResolvedArgs) -> DependencyResult<BoxedInstance> + Send + Sync;

/// 原型分配函数类型：分配尚未初始化的实例壳
pub type PrototypeFn = dyn Fn() -> BoxedInstance + Send + Sync;

/// 属性注入函数类型
pub type PropertySetterFn =
    dyn Fn(&mut BoxedInstance, &str, Instance) -> DependencyResult<()> + Send + Sync;

/// 组件元类型
///
/// 一个可构造组件的完整描述：类型键、可注入标记、构造依赖与属性依赖声明、
/// 方法参数管道声明、构造函数，以及可选的原型分配与属性注入函数。
/// 通过 [`Metatype::builder`] 构建。
pub struct Metatype {
    type_key: TypeKey,
    injectable: bool,
    dependencies: Vec<ConstructorDependency>,
    properties: Vec<PropertyDependency>,
    methods: Vec<MethodMetadata>,
    construct: Box<ConstructFn>,
    prototype: Option<Box<PrototypeFn>>,
    property_setter: Option<Box<PropertySetterFn>>,
}

impl fmt::Debug for Metatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metatype")
            .field("type_key", &self.type_key)
            .field("injectable", &self.injectable)
            .field("dependencies", &self.dependencies)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .field("construct", &"<function>")
            .finish()
    }
}

impl Metatype {
    /// 创建元类型构建器
    pub fn builder<T: Send + Sync + 'static>() -> MetatypeBuilder<T> {
        MetatypeBuilder::new()
    }

    /// 类型键
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// 组件名称
    pub fn name(&self) -> &'static str {
        self.type_key.name()
    }

    /// 由类型键派生的令牌
    pub fn token(&self) -> InjectionToken {
        InjectionToken::Type(self.type_key)
    }

    /// 是否携带可注入标记
    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    /// 构造依赖声明（按声明顺序）
    pub fn dependencies(&self) -> &[ConstructorDependency] {
        &self.dependencies
    }

    /// 属性依赖声明
    pub fn properties(&self) -> &[PropertyDependency] {
        &self.properties
    }

    /// 方法元数据
    pub fn methods(&self) -> &[MethodMetadata] {
        &self.methods
    }

    /// 使用已解析的构造依赖实例化组件
    pub fn instantiate(&self, args: ResolvedArgs) -> DependencyResult<BoxedInstance> {
        (self.construct)(args)
    }

    /// 分配原型壳；元类型未提供分配函数时返回空
    pub fn create_prototype(&self) -> Option<BoxedInstance> {
        self.prototype.as_ref().map(|allocate| allocate())
    }

    /// 向实例注入一个属性依赖
    pub fn assign_property(
        &self,
        instance: &mut BoxedInstance,
        key: &str,
        value: Instance,
    ) -> DependencyResult<()> {
        match &self.property_setter {
            Some(setter) => setter(instance, key, value),
            None => Err(DependencyError::instantiation_failed(
                self.name(),
                format!("声明了属性依赖 {key} 但未提供属性注入函数"),
            )),
        }
    }
}

/// 元类型构建器
///
/// 包装用户提供的强类型闭包，完成向 `dyn Any` 的类型擦除
pub struct MetatypeBuilder<T> {
    type_key: TypeKey,
    injectable: bool,
    dependencies: Vec<ConstructorDependency>,
    properties: Vec<PropertyDependency>,
    methods: Vec<MethodMetadata>,
    prototype: Option<Box<PrototypeFn>>,
    property_setter: Option<Box<PropertySetterFn>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> MetatypeBuilder<T> {
    fn new() -> Self {
        Self {
            type_key: TypeKey::of::<T>(),
            injectable: true,
            dependencies: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            prototype: None,
            property_setter: None,
            _marker: PhantomData,
        }
    }

    /// 声明一个必选构造依赖
    pub fn with_dependency(mut self, token: impl Into<InjectionToken>) -> Self {
        self.dependencies
            .push(ConstructorDependency::required(token.into()));
        self
    }

    /// 声明一个可选构造依赖
    pub fn with_optional_dependency(mut self, token: impl Into<InjectionToken>) -> Self {
        self.dependencies
            .push(ConstructorDependency::optional(token.into()));
        self
    }

    /// 声明一个令牌缺失的构造依赖
    ///
    /// 对应循环导入或漏写声明产生的空位，解析时必然失败
    pub fn with_undeclared_dependency(mut self) -> Self {
        self.dependencies.push(ConstructorDependency::undeclared());
        self
    }

    /// 声明一个必选属性依赖
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        token: impl Into<InjectionToken>,
    ) -> Self {
        self.properties.push(PropertyDependency {
            key: key.into(),
            token: token.into(),
            optional: false,
        });
        self
    }

    /// 声明一个可选属性依赖
    pub fn with_optional_property(
        mut self,
        key: impl Into<String>,
        token: impl Into<InjectionToken>,
    ) -> Self {
        self.properties.push(PropertyDependency {
            key: key.into(),
            token: token.into(),
            optional: true,
        });
        self
    }

    /// 声明一个方法及其参数管道
    pub fn with_method(mut self, name: impl Into<String>, param_pipes: Vec<Arc<Metatype>>) -> Self {
        self.methods.push(MethodMetadata {
            name: name.into(),
            param_pipes,
        });
        self
    }

    /// 去掉可注入标记
    ///
    /// 被管道声明引用时会在扫描阶段触发 `InvalidInjectable`
    pub fn without_injectable_marker(mut self) -> Self {
        self.injectable = false;
        self
    }

    /// 设置原型壳分配函数
    pub fn with_prototype(mut self, allocate: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.prototype = Some(Box::new(move || Box::new(allocate()) as BoxedInstance));
        self
    }

    /// 设置属性注入函数
    pub fn with_property_setter(
        mut self,
        setter: impl Fn(&mut T, &str, Instance) -> DependencyResult<()> + Send + Sync + 'static,
    ) -> Self {
        let name = self.type_key.name();
        self.property_setter = Some(Box::new(move |instance, key, value| {
            let Some(typed) = instance.downcast_mut::<T>() else {
                return Err(DependencyError::instantiation_failed(
                    name,
                    "属性注入时类型转换失败",
                ));
            };
            setter(typed, key, value)
        }));
        self
    }

    /// 设置构造函数并完成构建
    pub fn constructed_by(
        self,
        construct: impl Fn(ResolvedArgs) -> DependencyResult<T> + Send + Sync + 'static,
    ) -> Arc<Metatype> {
        Arc::new(Metatype {
            type_key: self.type_key,
            injectable: self.injectable,
            dependencies: self.dependencies,
            properties: self.properties,
            methods: self.methods,
            construct: Box::new(move |args| {
                construct(args).map(|instance| Box::new(instance) as BoxedInstance)
            }),
            prototype: self.prototype,
            property_setter: self.property_setter,
        })
    }
}

/// 已解析的构造依赖参数
///
/// 位置与声明顺序一致；可选依赖解析失败时对应位置为 `None`
pub struct ResolvedArgs {
    component: String,
    values: Vec<Option<Instance>>,
}

impl ResolvedArgs {
    /// 创建参数列表
    pub fn new(component: impl Into<String>, values: Vec<Option<Instance>>) -> Self {
        Self {
            component: component.into(),
            values,
        }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 参数列表是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 取出指定位置的必选依赖并转换为具体类型
    pub fn get<D: Send + Sync + 'static>(&self, index: usize) -> DependencyResult<Arc<D>> {
        let value = self
            .values
            .get(index)
            .and_then(Clone::clone)
            .ok_or_else(|| {
                DependencyError::instantiation_failed(
                    self.component.as_str(),
                    format!("构造参数 {index} 缺失"),
                )
            })?;
        value.downcast::<D>().map_err(|_| {
            DependencyError::instantiation_failed(
                self.component.as_str(),
                format!("构造参数 {index} 类型转换失败"),
            )
        })
    }

    /// 取出指定位置的可选依赖；缺失或类型不匹配时返回 `None`
    pub fn get_optional<D: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<D>> {
        self.values
            .get(index)
            .and_then(Clone::clone)
            .and_then(|value| value.downcast::<D>().ok())
    }

    /// 取出指定位置的原始参数
    pub fn raw(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(Option::as_ref)
    }
}

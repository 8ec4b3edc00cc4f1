//! 依赖元数据与模块声明
//!
//! 元数据读取器是解析引擎消费的外部协作者接口：
//! 引擎只读取声明结果，声明机制本身不在核心范围内。

use crate::component::{Instance, Metatype};
use crate::token::InjectionToken;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// 构造依赖声明
#[derive(Debug, Clone)]
pub struct ConstructorDependency {
    /// 依赖令牌；`None` 表示声明缺失（静态配置错误）
    pub token: Option<InjectionToken>,
    /// 是否可选
    pub optional: bool,
}

impl ConstructorDependency {
    /// 创建必选依赖声明
    pub fn required(token: InjectionToken) -> Self {
        Self {
            token: Some(token),
            optional: false,
        }
    }

    /// 创建可选依赖声明
    pub fn optional(token: InjectionToken) -> Self {
        Self {
            token: Some(token),
            optional: true,
        }
    }

    /// 创建令牌缺失的依赖声明
    pub fn undeclared() -> Self {
        Self {
            token: None,
            optional: false,
        }
    }
}

/// 属性依赖声明
#[derive(Debug, Clone)]
pub struct PropertyDependency {
    /// 属性键
    pub key: String,
    /// 依赖令牌
    pub token: InjectionToken,
    /// 是否可选
    pub optional: bool,
}

/// 方法元数据
///
/// 记录方法名与其参数上声明的次级可注入对象（管道）
#[derive(Debug, Clone)]
pub struct MethodMetadata {
    /// 方法名
    pub name: String,
    /// 参数管道声明
    pub param_pipes: Vec<Arc<Metatype>>,
}

/// 原始提供者声明
///
/// 分类规则：携带自定义令牌（`provide`）的为自定义提供者，其中
/// 类提供者按普通类构建但注册在自定义令牌下，值提供者在注册时即已解析；
/// 否则声明本身既是令牌也是元类型。
#[derive(Clone)]
pub enum ProviderDecl {
    /// 普通类提供者
    Class(Arc<Metatype>),
    /// 自定义令牌 + 类提供者
    ClassWithToken {
        /// 注入令牌
        provide: InjectionToken,
        /// 实际构造的类
        use_class: Arc<Metatype>,
    },
    /// 自定义令牌 + 预解析值提供者
    Value {
        /// 注入令牌
        provide: InjectionToken,
        /// 注入的值（包括 `0`、`false` 等原始值）
        use_value: Instance,
    },
}

impl fmt::Debug for ProviderDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(metatype) => f.debug_tuple("Class").field(&metatype.name()).finish(),
            Self::ClassWithToken { provide, use_class } => f
                .debug_struct("ClassWithToken")
                .field("provide", &provide.to_string())
                .field("use_class", &use_class.name())
                .finish(),
            Self::Value { provide, .. } => f
                .debug_struct("Value")
                .field("provide", &provide.to_string())
                .field("use_value", &"<instance>")
                .finish(),
        }
    }
}

impl ProviderDecl {
    /// 创建普通类提供者声明
    pub fn class(metatype: Arc<Metatype>) -> Self {
        Self::Class(metatype)
    }

    /// 创建自定义令牌的类提供者声明
    pub fn class_with_token(provide: impl Into<InjectionToken>, use_class: Arc<Metatype>) -> Self {
        Self::ClassWithToken {
            provide: provide.into(),
            use_class,
        }
    }

    /// 创建值提供者声明
    pub fn value(provide: impl Into<InjectionToken>, value: impl Any + Send + Sync) -> Self {
        Self::Value {
            provide: provide.into(),
            use_value: Arc::new(value),
        }
    }

    /// 是否为自定义提供者
    pub fn is_custom(&self) -> bool {
        !matches!(self, Self::Class(_))
    }
}

impl From<Arc<Metatype>> for ProviderDecl {
    fn from(metatype: Arc<Metatype>) -> Self {
        Self::Class(metatype)
    }
}

/// 模块声明
///
/// 一个部署单元声明的提供者与控制器列表
#[derive(Debug, Clone)]
pub struct ModuleDecl {
    name: String,
    providers: Vec<ProviderDecl>,
    controllers: Vec<Arc<Metatype>>,
}

impl ModuleDecl {
    /// 创建模块声明构建器
    pub fn builder(name: impl Into<String>) -> ModuleDeclBuilder {
        ModuleDeclBuilder {
            name: name.into(),
            providers: Vec::new(),
            controllers: Vec::new(),
        }
    }

    /// 模块名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明的提供者列表
    pub fn providers(&self) -> &[ProviderDecl] {
        &self.providers
    }

    /// 声明的控制器列表
    pub fn controllers(&self) -> &[Arc<Metatype>] {
        &self.controllers
    }
}

/// 模块声明构建器
#[derive(Debug)]
pub struct ModuleDeclBuilder {
    name: String,
    providers: Vec<ProviderDecl>,
    controllers: Vec<Arc<Metatype>>,
}

impl ModuleDeclBuilder {
    /// 添加一个提供者声明
    pub fn with_provider(mut self, provider: impl Into<ProviderDecl>) -> Self {
        self.providers.push(provider.into());
        self
    }

    /// 添加一个控制器声明
    pub fn with_controller(mut self, controller: Arc<Metatype>) -> Self {
        self.controllers.push(controller);
        self
    }

    /// 完成构建
    pub fn build(self) -> ModuleDecl {
        ModuleDecl {
            name: self.name,
            providers: self.providers,
            controllers: self.controllers,
        }
    }
}

/// 元数据读取器 trait
///
/// 解析引擎通过该接口读取组件与模块的声明元数据
pub trait MetadataReader: Send + Sync {
    /// 组件声明的构造依赖令牌（按声明顺序；`None` 为缺失声明）
    fn dependencies_of(&self, component: &Metatype) -> Vec<Option<InjectionToken>>;

    /// 可选构造依赖所在的位置集合
    fn optional_indices_of(&self, component: &Metatype) -> HashSet<usize>;

    /// 组件声明的属性依赖
    fn property_dependencies_of(&self, component: &Metatype) -> Vec<PropertyDependency>;

    /// 组件是否携带可注入标记
    fn is_injectable(&self, component: &Metatype) -> bool;

    /// 模块声明的提供者列表
    fn providers_of(&self, module: &ModuleDecl) -> Vec<ProviderDecl>;

    /// 模块声明的控制器列表
    fn controllers_of(&self, module: &ModuleDecl) -> Vec<Arc<Metatype>>;

    /// 组件的方法名列表
    fn method_names_of(&self, component: &Metatype) -> Vec<String>;

    /// 指定方法的参数级可注入对象（管道）
    fn param_injectables_of(&self, component: &Metatype, method: &str) -> Vec<Arc<Metatype>>;
}

/// 标准元数据读取器
///
/// 直接读取元类型与模块声明上的显式元数据
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticMetadataReader;

impl MetadataReader for StaticMetadataReader {
    fn dependencies_of(&self, component: &Metatype) -> Vec<Option<InjectionToken>> {
        component
            .dependencies()
            .iter()
            .map(|dependency| dependency.token.clone())
            .collect()
    }

    fn optional_indices_of(&self, component: &Metatype) -> HashSet<usize> {
        component
            .dependencies()
            .iter()
            .enumerate()
            .filter(|(_, dependency)| dependency.optional)
            .map(|(index, _)| index)
            .collect()
    }

    fn property_dependencies_of(&self, component: &Metatype) -> Vec<PropertyDependency> {
        component.properties().to_vec()
    }

    fn is_injectable(&self, component: &Metatype) -> bool {
        component.is_injectable()
    }

    fn providers_of(&self, module: &ModuleDecl) -> Vec<ProviderDecl> {
        module.providers().to_vec()
    }

    fn controllers_of(&self, module: &ModuleDecl) -> Vec<Arc<Metatype>> {
        module.controllers().to_vec()
    }

    fn method_names_of(&self, component: &Metatype) -> Vec<String> {
        component
            .methods()
            .iter()
            .map(|method| method.name.clone())
            .collect()
    }

    fn param_injectables_of(&self, component: &Metatype, method: &str) -> Vec<Arc<Metatype>> {
        component
            .methods()
            .iter()
            .find(|metadata| metadata.name == method)
            .map(|metadata| metadata.param_pipes.clone())
            .unwrap_or_default()
    }
}

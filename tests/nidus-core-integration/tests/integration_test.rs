//! nidus-core 集成测试
//!
//! 覆盖从模块声明到应用句柄的完整装配流程：扫描、原型分配、
//! 并发实例化、循环依赖检测与属性注入。

use nidus_common::{
    BootstrapError, DependencyError, InjectionToken, Metatype, ModuleDecl, ProviderDecl,
    StaticMetadataReader,
};
use nidus_core::{
    ApplicationFactory, ComponentRegistry, DependencyScanner, Injector, InstanceLoader,
    ModuleRecord, Partition,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct FoodService {
    portions: u32,
}

fn food_metatype(portions: u32) -> Arc<Metatype> {
    Metatype::builder::<FoodService>().constructed_by(move |_| Ok(FoodService { portions }))
}

struct CatsService {
    food: Arc<FoodService>,
    amount: u32,
}

struct CatsController {
    cats: Arc<CatsService>,
}

#[tokio::test]
async fn bootstrap_resolves_acyclic_graph() {
    init_tracing();
    let food = food_metatype(3);
    let food_token = food.token();
    let cats = Metatype::builder::<CatsService>()
        .with_dependency(food_token.clone())
        .with_dependency(InjectionToken::named("AMOUNT"))
        .constructed_by(|args| {
            Ok(CatsService {
                food: args.get::<FoodService>(0)?,
                amount: *args.get::<u32>(1)?,
            })
        });
    let cats_token = cats.token();
    let controller = Metatype::builder::<CatsController>()
        .with_dependency(cats_token.clone())
        .constructed_by(|args| {
            Ok(CatsController {
                cats: args.get::<CatsService>(0)?,
            })
        });
    let module = ModuleDecl::builder("AppModule")
        .with_provider(food)
        .with_provider(cats)
        .with_provider(ProviderDecl::value("AMOUNT", 123_u32))
        .with_controller(controller)
        .build();

    let app = ApplicationFactory::create(&module).await.unwrap();

    let cats_service = app.get::<CatsService>(&cats_token).unwrap();
    assert_eq!(cats_service.amount, 123);
    assert_eq!(cats_service.food.portions, 3);

    // 单例同一性：注入的实例与注册表查询到的实例共享同一分配
    let food_service = app.get::<FoodService>(&food_token).unwrap();
    assert!(Arc::ptr_eq(&cats_service.food, &food_service));

    let controllers = app.controllers();
    assert_eq!(controllers.len(), 1);
    let (_, descriptor) = &controllers[0];
    assert!(descriptor.is_resolved());
    assert!(descriptor.init_time().is_some());
    let controller = descriptor
        .instance()
        .unwrap()
        .downcast::<CatsController>()
        .unwrap();
    assert!(Arc::ptr_eq(&controller.cats, &cats_service));
}

#[tokio::test]
async fn shared_dependency_is_instantiated_once() {
    init_tracing();
    struct DogService {
        food: Arc<FoodService>,
    }
    struct BirdService {
        food: Arc<FoodService>,
    }

    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();
    let food = Metatype::builder::<FoodService>().constructed_by(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(FoodService { portions: 1 })
    });
    let food_token = food.token();
    let dogs = Metatype::builder::<DogService>()
        .with_dependency(food_token.clone())
        .constructed_by(|args| {
            Ok(DogService {
                food: args.get::<FoodService>(0)?,
            })
        });
    let dogs_token = dogs.token();
    let birds = Metatype::builder::<BirdService>()
        .with_dependency(food_token.clone())
        .constructed_by(|args| {
            Ok(BirdService {
                food: args.get::<FoodService>(0)?,
            })
        });
    let birds_token = birds.token();
    let module = ModuleDecl::builder("AppModule")
        .with_provider(food)
        .with_provider(dogs)
        .with_provider(birds)
        .build();

    let app = ApplicationFactory::create(&module).await.unwrap();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    let dogs = app.get::<DogService>(&dogs_token).unwrap();
    let birds = app.get::<BirdService>(&birds_token).unwrap();
    assert!(Arc::ptr_eq(&dogs.food, &birds.food));
}

#[tokio::test]
async fn two_node_cycle_is_rejected() {
    init_tracing();
    struct Chicken;
    struct Egg;

    let chicken = Metatype::builder::<Chicken>()
        .with_dependency(InjectionToken::of::<Egg>())
        .constructed_by(|_| Ok(Chicken));
    let egg = Metatype::builder::<Egg>()
        .with_dependency(InjectionToken::of::<Chicken>())
        .constructed_by(|_| Ok(Egg));
    let module = ModuleDecl::builder("AppModule")
        .with_provider(chicken)
        .with_provider(egg)
        .build();

    let err = ApplicationFactory::create(&module).await.unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Dependency {
            source: DependencyError::CircularDependency { .. }
        }
    ));
}

#[tokio::test]
async fn three_node_cycle_leaves_no_partial_instances() {
    init_tracing();
    struct RoundA;
    struct RoundB;
    struct RoundC;

    let a = Metatype::builder::<RoundA>()
        .with_dependency(InjectionToken::of::<RoundB>())
        .constructed_by(|_| Ok(RoundA));
    let b = Metatype::builder::<RoundB>()
        .with_dependency(InjectionToken::of::<RoundC>())
        .constructed_by(|_| Ok(RoundB));
    let c = Metatype::builder::<RoundC>()
        .with_dependency(InjectionToken::of::<RoundA>())
        .constructed_by(|_| Ok(RoundC));
    let module = ModuleDecl::builder("AppModule")
        .with_provider(a)
        .with_provider(b)
        .with_provider(c)
        .build();

    let registry = Arc::new(ComponentRegistry::new());
    let record = ModuleRecord::new(module.name(), registry.clone());
    let reader = Arc::new(StaticMetadataReader);
    DependencyScanner::new(registry.clone(), reader.clone())
        .scan(&module, &record)
        .unwrap();
    let loader = InstanceLoader::new(registry.clone(), Injector::new(registry.clone(), reader));

    let outcome = loader.create_instances_of_dependencies(&record).await;
    assert!(matches!(
        outcome,
        Err(DependencyError::CircularDependency { .. })
    ));
    // 环上没有任何成员留下部分初始化的实例或悬挂的挂起状态
    for descriptor in registry.providers() {
        assert!(!descriptor.is_resolved());
        assert!(!descriptor.is_pending());
    }
}

#[tokio::test]
async fn required_missing_dependency_fails_bootstrap() {
    init_tracing();
    struct StrictService;

    let strict = Metatype::builder::<StrictService>()
        .with_dependency(InjectionToken::named("MISSING"))
        .constructed_by(|_| Ok(StrictService));
    let module = ModuleDecl::builder("AppModule").with_provider(strict).build();

    let err = ApplicationFactory::create(&module).await.unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Dependency {
            source: DependencyError::UnknownDependencies { ref name }
        } if name == "StrictService"
    ));
}

#[tokio::test]
async fn optional_missing_dependency_degrades_to_none() {
    init_tracing();
    struct LenientService {
        fallback: Option<Arc<FoodService>>,
    }

    let lenient = Metatype::builder::<LenientService>()
        .with_optional_dependency(InjectionToken::named("MISSING"))
        .constructed_by(|args| {
            Ok(LenientService {
                fallback: args.get_optional::<FoodService>(0),
            })
        });
    let token = lenient.token();
    let module = ModuleDecl::builder("AppModule")
        .with_provider(lenient)
        .build();

    let app = ApplicationFactory::create(&module).await.unwrap();
    assert!(app.get::<LenientService>(&token).unwrap().fallback.is_none());
}

#[tokio::test]
async fn self_referential_dependency_fails_bootstrap() {
    init_tracing();
    struct SelfishService;

    let selfish = Metatype::builder::<SelfishService>()
        .with_dependency(InjectionToken::of::<SelfishService>())
        .constructed_by(|_| Ok(SelfishService));
    let module = ModuleDecl::builder("AppModule")
        .with_provider(selfish)
        .build();

    let err = ApplicationFactory::create(&module).await.unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Dependency {
            source: DependencyError::UnknownDependencies { ref name }
        } if name == "SelfishService"
    ));
}

#[tokio::test]
async fn undeclared_dependency_fails_bootstrap() {
    init_tracing();
    struct BrokenService;

    let broken = Metatype::builder::<BrokenService>()
        .with_undeclared_dependency()
        .constructed_by(|_| Ok(BrokenService));
    let module = ModuleDecl::builder("AppModule").with_provider(broken).build();

    let err = ApplicationFactory::create(&module).await.unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Dependency {
            source: DependencyError::UnknownDependencies { .. }
        }
    ));
}

#[tokio::test]
async fn custom_token_providers_resolve_by_token() {
    init_tracing();
    struct MockFoodService {
        portions: u32,
    }
    struct Eater {
        food: Arc<MockFoodService>,
    }

    let mock = Metatype::builder::<MockFoodService>()
        .constructed_by(|_| Ok(MockFoodService { portions: 9 }));
    let eater = Metatype::builder::<Eater>()
        .with_dependency(InjectionToken::named("FOOD"))
        .constructed_by(|args| {
            Ok(Eater {
                food: args.get::<MockFoodService>(0)?,
            })
        });
    let eater_token = eater.token();
    let module = ModuleDecl::builder("AppModule")
        .with_provider(ProviderDecl::class_with_token("FOOD", mock))
        .with_provider(eater)
        .build();

    let app = ApplicationFactory::create(&module).await.unwrap();

    let food_token = InjectionToken::named("FOOD");
    let food = app.get::<MockFoodService>(&food_token).unwrap();
    assert_eq!(food.portions, 9);
    assert!(Arc::ptr_eq(&app.get::<Eater>(&eater_token).unwrap().food, &food));

    // 未注册令牌与错误类型均以错误报告，而不是恐慌
    assert!(matches!(
        app.get::<FoodService>(&InjectionToken::named("NOPE")),
        Err(DependencyError::UnregisteredToken { .. })
    ));
    assert!(app.get::<FoodService>(&food_token).is_err());
}

#[tokio::test]
async fn controller_receives_itself_as_inquirer() {
    init_tracing();
    struct GreeterController {
        inquired: bool,
    }
    struct TopLevelService {
        inquired: bool,
    }

    let controller = Metatype::builder::<GreeterController>()
        .with_prototype(|| GreeterController { inquired: false })
        .with_dependency(InjectionToken::Inquirer)
        .constructed_by(|args| {
            Ok(GreeterController {
                inquired: args.get_optional::<GreeterController>(0).is_some(),
            })
        });
    // 顶层加载的提供者没有请求方，对应位置为空
    let service = Metatype::builder::<TopLevelService>()
        .with_dependency(InjectionToken::Inquirer)
        .constructed_by(|args| {
            Ok(TopLevelService {
                inquired: args.raw(0).is_some(),
            })
        });
    let service_token = service.token();
    let module = ModuleDecl::builder("AppModule")
        .with_provider(service)
        .with_controller(controller)
        .build();

    let app = ApplicationFactory::create(&module).await.unwrap();

    assert!(!app.get::<TopLevelService>(&service_token).unwrap().inquired);
    let (_, descriptor) = &app.controllers()[0];
    let greeter = descriptor
        .instance()
        .unwrap()
        .downcast::<GreeterController>()
        .unwrap();
    assert!(greeter.inquired);
}

#[tokio::test]
async fn property_dependencies_are_injected_after_construction() {
    init_tracing();
    struct AuditLog;
    struct BillingService {
        audit: Option<Arc<AuditLog>>,
    }

    let audit = Metatype::builder::<AuditLog>().constructed_by(|_| Ok(AuditLog));
    let audit_token = audit.token();
    let billing = Metatype::builder::<BillingService>()
        .with_property("audit", audit_token.clone())
        .with_optional_property("missing", InjectionToken::named("NOPE"))
        .with_property_setter(|service: &mut BillingService, key, value| {
            if key == "audit" {
                service.audit = value.downcast::<AuditLog>().ok();
            }
            Ok(())
        })
        .constructed_by(|_| Ok(BillingService { audit: None }));
    let billing_token = billing.token();
    let module = ModuleDecl::builder("AppModule")
        .with_provider(audit)
        .with_provider(billing)
        .build();

    let app = ApplicationFactory::create(&module).await.unwrap();

    let billing = app.get::<BillingService>(&billing_token).unwrap();
    let injected = billing.audit.as_ref().unwrap();
    assert!(Arc::ptr_eq(injected, &app.get::<AuditLog>(&audit_token).unwrap()));
}

#[tokio::test]
async fn method_param_pipes_resolve_with_provider_dependencies() {
    init_tracing();
    struct ParsePipe {
        food: Arc<FoodService>,
    }
    struct PetsController;

    let food = food_metatype(5);
    let food_token = food.token();
    let pipe = Metatype::builder::<ParsePipe>()
        .with_dependency(food_token.clone())
        .constructed_by(|args| {
            Ok(ParsePipe {
                food: args.get::<FoodService>(0)?,
            })
        });
    let pipe_token = pipe.token();
    let controller = Metatype::builder::<PetsController>()
        .with_method("create", vec![pipe])
        .constructed_by(|_| Ok(PetsController));
    let module = ModuleDecl::builder("AppModule")
        .with_provider(food)
        .with_controller(controller)
        .build();

    let app = ApplicationFactory::create(&module).await.unwrap();

    let registry = app.registry();
    let descriptor = registry.get_in(Partition::Injectables, &pipe_token).unwrap();
    assert!(descriptor.is_resolved());
    let pipe = descriptor.instance().unwrap().downcast::<ParsePipe>().unwrap();
    assert!(Arc::ptr_eq(&pipe.food, &app.get::<FoodService>(&food_token).unwrap()));
}

#[tokio::test]
async fn non_injectable_pipe_aborts_bootstrap() {
    init_tracing();
    struct RawPipe;
    struct PetsController;

    let pipe = Metatype::builder::<RawPipe>()
        .without_injectable_marker()
        .constructed_by(|_| Ok(RawPipe));
    let controller = Metatype::builder::<PetsController>()
        .with_method("create", vec![pipe])
        .constructed_by(|_| Ok(PetsController));
    let module = ModuleDecl::builder("AppModule")
        .with_controller(controller)
        .build();

    let err = ApplicationFactory::create(&module).await.unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Dependency {
            source: DependencyError::InvalidInjectable { ref name }
        } if name == "RawPipe"
    ));
}

//! 实例 ID 工厂
//!
//! 随机模式生成 UUID v4；确定性模式对组件名哈希生成可复现 ID，
//! 冲突时附加递增后缀并重新哈希，直至进程级注册表中无冲突。

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// ID 生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceIdMode {
    /// 随机模式（默认）
    Random,
    /// 确定性模式，用于可复现测试
    Deterministic,
}

static ID_MODE: Lazy<RwLock<InstanceIdMode>> = Lazy::new(|| RwLock::new(InstanceIdMode::Random));

static DETERMINISTIC_REGISTRY: Lazy<Mutex<HashSet<String>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));

/// 实例 ID 工厂
#[derive(Debug)]
pub struct InstanceIdFactory;

impl InstanceIdFactory {
    /// 设置生成模式
    pub fn set_mode(mode: InstanceIdMode) {
        *ID_MODE.write() = mode;
    }

    /// 当前生成模式
    pub fn mode() -> InstanceIdMode {
        *ID_MODE.read()
    }

    /// 按当前模式生成一个进程内唯一的实例 ID
    pub fn get(key: &str) -> String {
        match Self::mode() {
            InstanceIdMode::Random => uuid::Uuid::new_v4().to_string(),
            InstanceIdMode::Deterministic => deterministic_id(key),
        }
    }

    /// 清空确定性 ID 注册表，测试运行之间调用
    pub fn reset() {
        DETERMINISTIC_REGISTRY.lock().clear();
    }
}

fn deterministic_id(key: &str) -> String {
    let mut registry = DETERMINISTIC_REGISTRY.lock();
    let mut inc: u32 = 0;
    loop {
        let candidate = if inc == 0 {
            hash_code(key)
        } else {
            hash_code(&format!("{key}_{inc}"))
        };
        if registry.insert(candidate.clone()) {
            return candidate;
        }
        inc += 1;
    }
}

fn hash_code(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish().to_string()
}

//! 结算信号
//!
//! 以"挂起 + 结算信号"协议替代可重入锁：首个解析方创建并持有信号，
//! 其余并发请求方只观察其结果，从而保证每个令牌至多实例化一次。

use nidus_common::{DependencyError, DependencyResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::sync::watch;

/// 一次解析尝试的结算结果
type Settlement = Result<(), DependencyError>;

/// 结算信号
///
/// 一次性广播：每次解析尝试恰好结算一次（成功或失败）。
/// 同时承载循环见证者集合：解析链上的每个信号都会登记链上其后
/// 新进入解析的组件 ID，挂起节点据此识别出绕回自身下游的请求方。
pub struct SettlementSignal {
    sender: watch::Sender<Option<Settlement>>,
    witnesses: Mutex<HashSet<String>>,
}

impl SettlementSignal {
    /// 创建未结算的信号
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            witnesses: Mutex::new(HashSet::new()),
        }
    }

    /// 登记一个见证者
    pub fn insert_witness(&self, id: &str) {
        self.witnesses.lock().insert(id.to_string());
    }

    /// 判断请求方是否构成循环
    pub fn is_cycle(&self, id: &str) -> bool {
        self.witnesses.lock().contains(id)
    }

    /// 以成功结算
    ///
    /// `send_replace` 在没有任何接收方时也会写入结果，晚到的等待方
    /// 订阅后仍能立即观察到结算
    pub fn complete(&self) {
        self.sender.send_replace(Some(Ok(())));
    }

    /// 以失败结算
    pub fn error(&self, err: DependencyError) {
        self.sender.send_replace(Some(Err(err)));
    }

    /// 等待结算；信号携带错误时向本等待方重新抛出
    pub async fn settled(&self) -> DependencyResult<()> {
        let mut receiver = self.sender.subscribe();
        loop {
            if let Some(outcome) = receiver.borrow_and_update().clone() {
                return outcome;
            }
            if receiver.changed().await.is_err() {
                return Err(DependencyError::instantiation_failed(
                    "SettlementSignal",
                    "信号在结算前被丢弃",
                ));
            }
        }
    }
}

impl Default for SettlementSignal {
    fn default() -> Self {
        Self::new()
    }
}

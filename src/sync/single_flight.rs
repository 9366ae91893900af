//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了 `wrap` 计算的单飞合并：同一键上并发的未命中只计算一次。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

type Slot = Option<Vec<u8>>;

/// 正在进行中的计算表
///
/// 每个键最多一个领导者。跟随者订阅领导者的 watch 通道，
/// 通道保留最后的值，因此晚到的跟随者不会错过通知。
#[derive(Default)]
pub struct SingleFlight {
    in_flight: DashMap<String, watch::Receiver<Slot>>,
}

/// 加入某个键的计算后得到的角色
pub enum Flight<'a> {
    /// 负责调用计算函数并发布结果
    Leader(FlightLeader<'a>),
    /// 等待领导者的结果
    Follower(watch::Receiver<Slot>),
}

/// 领导者句柄，释放时从进行中表移除该键
pub struct FlightLeader<'a> {
    owner: &'a SingleFlight,
    key: String,
    tx: watch::Sender<Slot>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入某个键的计算
    pub fn join(&self, key: &str) -> Flight<'_> {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => Flight::Follower(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx);
                Flight::Leader(FlightLeader {
                    owner: self,
                    key: key.to_string(),
                    tx,
                })
            }
        }
    }

    /// 等待领导者发布结果
    ///
    /// 领导者计算失败或被取消时返回 `None`，调用方应自行计算
    pub async fn wait(rx: &mut watch::Receiver<Slot>) -> Option<Vec<u8>> {
        match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        }
    }

    /// 当前进行中的键数量
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl FlightLeader<'_> {
    /// 向所有跟随者发布计算结果
    pub fn publish(&self, value: &[u8]) {
        self.tx.send_replace(Some(value.to_vec()));
    }
}

impl Drop for FlightLeader<'_> {
    fn drop(&mut self) {
        self.owner.in_flight.remove(&self.key);
    }
}

//! `post` 요청/응답 상관관계 관리.
//!
//! 요청마다 단조 증가 ID를 발급하고, 같은 ID의 `post` 응답이 도착하면 대기 중인
//! 호출자에게 전달합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};

type Responder = oneshot::Sender<FeedResult<Value>>;

/// 진행 중인 요청 테이블.
#[derive(Debug)]
pub struct RequestBridge {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Responder>>,
}

impl Default for RequestBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBridge {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// 새 요청 ID와 응답 수신자를 발급합니다.
    pub fn register(&self) -> (u64, oneshot::Receiver<FeedResult<Value>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        (id, rx)
    }

    /// 응답을 대기 중인 호출자에게 전달합니다.
    pub fn resolve(&self, id: u64, outcome: Result<Value, String>) -> bool {
        let Some(tx) = self.pending.lock().remove(&id) else {
            warn!(request_id = id, "대기 중이지 않은 post 응답");
            return false;
        };

        let result = outcome.map_err(FeedError::Api);
        if tx.send(result).is_err() {
            debug!(request_id = id, "호출자가 이미 응답 대기를 중단함");
        }
        true
    }

    /// 타임아웃 등으로 대기를 포기한 요청을 제거합니다.
    pub fn cancel(&self, id: u64) {
        self.pending.lock().remove(&id);
    }

    /// 모든 대기 요청을 `Disconnected`로 실패시킵니다.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(FeedError::Disconnected));
        }
        if count > 0 {
            debug!(count, "대기 중인 요청 실패 처리");
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

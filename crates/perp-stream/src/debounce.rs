//! 심볼 구독 디바운서.
//!
//! 같은 (코인, 호가 파라미터) 요청이 창 안에서 반복되면 첫 요청만 통과시킵니다.
//! 마커마다 만료 시각과 정리 타이머를 가지며, 타이머는 세대 번호가 일치할 때만
//! 마커를 지웁니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use perp_core::{BookParams, Coin};
use tokio::task::AbortHandle;
use tokio::time::Instant;

type MarkerKey = (Coin, BookParams);

#[derive(Debug)]
struct Marker {
    expires_at: Instant,
    generation: u64,
    cleanup: Option<AbortHandle>,
}

impl Marker {
    fn cancel(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Default)]
struct MarkerTable {
    markers: HashMap<MarkerKey, Marker>,
    next_generation: u64,
}

/// 심볼 구독 디바운서.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    table: Arc<Mutex<MarkerTable>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            table: Arc::new(Mutex::new(MarkerTable::default())),
        }
    }

    /// 요청을 통과시킬지 결정합니다.
    ///
    /// 같은 키의 마커가 아직 유효하면 `false`. 같은 코인의 다른 파라미터 마커는
    /// 지워지므로, 파라미터를 바꿨다가 되돌리는 요청은 억제되지 않습니다.
    pub fn try_begin(&self, coin: &str, params: BookParams) -> bool {
        let now = Instant::now();
        let key = (coin.to_string(), params);
        let mut table = self.table.lock();

        if let Some(marker) = table.markers.get(&key) {
            if marker.expires_at > now {
                return false;
            }
        }

        table.markers.retain(|(c, _), marker| {
            if c == coin {
                marker.cancel();
                false
            } else {
                true
            }
        });

        table.next_generation += 1;
        let generation = table.next_generation;
        let cleanup = self.spawn_cleanup(key.clone(), generation);
        table.markers.insert(
            key,
            Marker {
                expires_at: now + self.window,
                generation,
                cleanup,
            },
        );
        true
    }

    /// 코인의 모든 마커를 취소합니다.
    pub fn cancel(&self, coin: &str) {
        self.table.lock().markers.retain(|(c, _), marker| {
            if c == coin {
                marker.cancel();
                false
            } else {
                true
            }
        });
    }

    pub fn is_pending(&self, coin: &str, params: BookParams) -> bool {
        let table = self.table.lock();
        table
            .markers
            .get(&(coin.to_string(), params))
            .is_some_and(|m| m.expires_at > Instant::now())
    }

    pub fn len(&self) -> usize {
        self.table.lock().markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 모든 마커와 정리 타이머를 제거합니다.
    pub fn clear(&self) {
        let mut table = self.table.lock();
        for marker in table.markers.values_mut() {
            marker.cancel();
        }
        table.markers.clear();
    }

    fn spawn_cleanup(&self, key: MarkerKey, generation: u64) -> Option<AbortHandle> {
        // 런타임 밖에서는 만료 시각 비교만으로 동작
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let table = Arc::clone(&self.table);
        let window = self.window;

        let task = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let mut table = table.lock();
            if table.markers.get(&key).map(|m| m.generation) == Some(generation) {
                table.markers.remove(&key);
            }
        });
        Some(task.abort_handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(n: u8) -> BookParams {
        BookParams::sig_figs(n).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_within_window_are_suppressed() {
        let debouncer = Debouncer::new(Duration::from_millis(100));

        assert!(debouncer.try_begin("BTC", sig(5)));
        assert!(!debouncer.try_begin("BTC", sig(5)));
        assert!(debouncer.try_begin("ETH", sig(5)));

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert!(debouncer.is_empty());
        assert!(debouncer.try_begin("BTC", sig(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_param_flip_is_not_suppressed() {
        let debouncer = Debouncer::new(Duration::from_millis(100));

        assert!(debouncer.try_begin("BTC", sig(3)));
        assert!(debouncer.try_begin("BTC", sig(4)));
        assert!(!debouncer.is_pending("BTC", sig(3)));
        assert!(debouncer.try_begin("BTC", sig(3)));
        assert_eq!(debouncer.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cleanup_does_not_remove_new_marker() {
        let debouncer = Debouncer::new(Duration::from_millis(100));

        assert!(debouncer.try_begin("BTC", sig(5)));
        tokio::time::sleep(Duration::from_millis(60)).await;
        debouncer.cancel("BTC");
        assert!(debouncer.try_begin("BTC", sig(5)));

        // 첫 마커의 정리 시각이 지나도 새 마커는 유지
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(debouncer.is_pending("BTC", sig(5)));
    }

    #[test]
    fn test_works_without_runtime() {
        let debouncer = Debouncer::new(Duration::from_secs(60));
        assert!(debouncer.try_begin("BTC", sig(5)));
        assert!(!debouncer.try_begin("BTC", sig(5)));
        debouncer.clear();
        assert!(debouncer.is_empty());
    }
}

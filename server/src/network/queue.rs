//! 受信キュー
//!
//! 受信を別スレッドで行う場合に、受信スレッドとフレームループの間で
//! メッセージを受け渡す容量付きキューです。

use super::{NetworkError, Transport};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// キューが満杯のときの動作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// 最も古いメッセージを捨てて新しいものを入れる
    #[default]
    DropOldest,
    /// 新しいメッセージを捨てる
    DropNewest,
}

/// 容量付きのメッセージキュー
///
/// 生産者と消費者はそれぞれ一つを想定しています。
#[derive(Debug)]
pub struct ActionQueue {
    inner: Mutex<VecDeque<Vec<u8>>>,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl ActionQueue {
    /// 新しいキューを作成
    ///
    /// 容量 0 は 1 として扱います。
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    /// メッセージを追加
    ///
    /// 追加したメッセージが残る場合は true を返します。
    pub fn push(&self, message: Vec<u8>) -> bool {
        let mut queue = self.inner.lock();
        if queue.len() < self.capacity {
            queue.push_back(message);
            return true;
        }

        self.dropped.fetch_add(1, Ordering::Relaxed);
        match self.policy {
            OverflowPolicy::DropOldest => {
                queue.pop_front();
                queue.push_back(message);
                true
            }
            OverflowPolicy::DropNewest => false,
        }
    }

    /// メッセージを一つ取り出す
    pub fn pop(&self) -> Option<Vec<u8>> {
        self.inner.lock().pop_front()
    }

    /// 現在のメッセージ数
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// 容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// あふれて捨てたメッセージ数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// 受信スレッド付きトランスポート
///
/// 内側のトランスポートを専用スレッドで読み続け、キューに積みます。
/// `try_receive` はキューから取り出すだけでブロックしません。
pub struct ThreadedTransport {
    queue: Arc<ActionQueue>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ThreadedTransport {
    /// 受信スレッドを起動
    pub fn spawn<T>(mut inner: T, queue: Arc<ActionQueue>) -> Result<Self, NetworkError>
    where
        T: Transport + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let thread_queue = queue.clone();

        let handle = thread::Builder::new()
            .name("action-receiver".to_string())
            .spawn(move || {
                log::debug!("受信スレッド開始");
                while thread_running.load(Ordering::Acquire) {
                    match inner.try_receive() {
                        Ok(Some(message)) => {
                            if !thread_queue.push(message) {
                                log::debug!("キューが満杯のため新しいメッセージを破棄しました");
                            }
                        }
                        Ok(None) => thread::sleep(Duration::from_millis(1)),
                        Err(e) => {
                            log::warn!("受信スレッドでエラーが発生しました: {}", e);
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                }
                log::debug!("受信スレッド終了");
            })
            .map_err(|e| NetworkError::ThreadError(e.to_string()))?;

        Ok(Self {
            queue,
            running,
            handle: Some(handle),
        })
    }

    /// キューへの参照
    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    /// 受信スレッドを停止
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("受信スレッドの終了に失敗しました");
            }
        }
    }
}

impl Transport for ThreadedTransport {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, NetworkError> {
        Ok(self.queue.pop())
    }
}

impl Drop for ThreadedTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

//! 時間ユーティリティ
//!
//! 固定レートのループ（ホストのフレーム、コントローラの送信）に使う
//! ペースメーカーを提供します。

use std::time::{Duration, Instant};

/// 固定レートでループを回すためのペースメーカー
#[derive(Debug)]
pub struct FramePacer {
    /// 1 フレームの長さ
    interval: Duration,
    /// 次のフレームの開始予定時刻
    next: Instant,
    /// 経過フレーム数
    frames: u64,
}

impl FramePacer {
    /// 1 秒あたりのフレーム数から作成
    ///
    /// 0 が指定された場合は 1 として扱います。
    pub fn from_rate(per_second: u32) -> Self {
        Self::new(Duration::from_secs(1) / per_second.max(1))
    }

    /// フレーム間隔から作成
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
            frames: 0,
        }
    }

    /// フレーム間隔を取得
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 経過フレーム数を取得
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 次のフレームまでの残り時間
    pub fn remaining(&self) -> Duration {
        self.next.saturating_duration_since(Instant::now())
    }

    /// 次のフレームまで待機
    ///
    /// 処理が遅れて予定時刻を過ぎていた場合は待機せず、
    /// 遅れを取り戻そうとせずに予定を現在時刻から組み直します。
    pub fn wait(&mut self) {
        let remaining = self.remaining();
        if remaining.is_zero() {
            self.next = Instant::now() + self.interval;
        } else {
            std::thread::sleep(remaining);
            self.next += self.interval;
        }
        self.frames += 1;
    }
}

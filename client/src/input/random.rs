//! ランダム操作
//!
//! 全キーを一様ランダムに押し、マウスを範囲内でランダムに動かす操作方針です。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use remote_input_rs_common::keys::LogicalKey;
use remote_input_rs_common::protocol::Action;

use super::command::ActionBuilder;
use super::ActionSource;

/// ランダム操作方針
#[derive(Debug)]
pub struct RandomPolicy<R = StdRng> {
    rng: R,
    max_dx: i32,
    max_dy: i32,
    /// キーを押す確率
    press_probability: f64,
}

impl RandomPolicy<StdRng> {
    /// シードを指定して作成（シード無しならエントロピーから）
    pub fn new(seed: Option<u64>, max_dx: i32, max_dy: i32) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng, max_dx, max_dy)
    }
}

impl<R: Rng> RandomPolicy<R> {
    /// 乱数生成器を指定して作成
    pub fn with_rng(rng: R, max_dx: i32, max_dy: i32) -> Self {
        Self {
            rng,
            max_dx: max_dx.saturating_abs(),
            max_dy: max_dy.saturating_abs(),
            press_probability: 0.5,
        }
    }

    /// キーを押す確率を設定（0.0 から 1.0 に丸める）
    pub fn with_press_probability(mut self, probability: f64) -> Self {
        self.press_probability = probability.clamp(0.0, 1.0);
        self
    }
}

impl<R: Rng> ActionSource for RandomPolicy<R> {
    fn next_action(&mut self) -> Action {
        let mut builder = ActionBuilder::new();
        for key in LogicalKey::ALL {
            builder = builder.key(key, self.rng.gen_bool(self.press_probability));
        }
        let dx = self.rng.gen_range(-self.max_dx..=self.max_dx);
        let dy = self.rng.gen_range(-self.max_dy..=self.max_dy);
        builder.mouse(dx, dy).snapshot()
    }
}

//! 入力モジュール
//!
//! エンジンへ送るアクションを作る機能を提供します。

pub mod command;
pub mod random;

pub use command::ActionBuilder;
pub use random::RandomPolicy;

use remote_input_rs_common::protocol::Action;

/// アクションの供給元
pub trait ActionSource {
    /// 次に送るアクション
    fn next_action(&mut self) -> Action;
}

/// 同じアクションを繰り返す供給元
#[derive(Debug, Clone)]
pub struct Repeat(pub Action);

impl ActionSource for Repeat {
    fn next_action(&mut self) -> Action {
        self.0.clone()
    }
}

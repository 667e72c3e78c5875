//! アクション組み立て
//!
//! 論理キーの押下・解放とマウス移動量からエンジンへ送るアクションを組み立てます。

use remote_input_rs_common::keys::LogicalKey;
use remote_input_rs_common::protocol::{AbsentKeyPolicy, Action};

/// アクションビルダー
///
/// 同じキーを複数回指定した場合は最後の指定が有効です。
#[derive(Debug, Clone, Default)]
pub struct ActionBuilder {
    keys: Vec<(LogicalKey, bool)>,
    mouse: (i32, i32),
}

impl ActionBuilder {
    /// 空のビルダーを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// キーを押す
    pub fn press(self, key: LogicalKey) -> Self {
        self.key(key, true)
    }

    /// キーを離す
    pub fn release(self, key: LogicalKey) -> Self {
        self.key(key, false)
    }

    /// キーの状態を指定
    pub fn key(mut self, key: LogicalKey, down: bool) -> Self {
        self.keys.retain(|(k, _)| *k != key);
        self.keys.push((key, down));
        self
    }

    /// マウス移動量を指定
    pub fn mouse(mut self, dx: i32, dy: i32) -> Self {
        self.mouse = (dx, dy);
        self
    }

    /// 指定したキーだけを含むアクション
    ///
    /// 受信側では指定しなかったキーは変化しません。
    pub fn build(self) -> Action {
        self.assemble(AbsentKeyPolicy::NoChange, false)
    }

    /// 全キーを含むスナップショット
    ///
    /// 指定しなかったキーは離されたものとして含めます。
    pub fn snapshot(self) -> Action {
        self.assemble(AbsentKeyPolicy::Released, true)
    }

    fn assemble(self, absent: AbsentKeyPolicy, fill: bool) -> Action {
        let mut action = Action::new(absent).with_mouse(self.mouse.0, self.mouse.1);
        if fill {
            for key in LogicalKey::ALL {
                let down = self
                    .keys
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map_or(false, |(_, down)| *down);
                action.push_key(key.name(), down);
            }
        } else {
            for (key, down) in self.keys {
                action.push_key(key.name(), down);
            }
        }
        action
    }
}

/// 何も押さず、マウスも動かさないアクション
pub fn noop() -> Action {
    ActionBuilder::new().snapshot()
}

//! キー状態の追跡
//!
//! キーごとに四つのフラグ（`down` / `was_down` / `was_pressed` /
//! `was_released`）を持ち、デコード済みアクションからエッジを検出します。

use remote_input_rs_common::keys::LogicalKey;
use remote_input_rs_common::protocol::{AbsentKeyPolicy, Action};

/// キーのエッジ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    /// 離された状態から押された
    Pressed,
    /// 押された状態から離された
    Released,
}

impl KeyEdge {
    /// 押下方向かどうか
    pub fn is_down(self) -> bool {
        self == KeyEdge::Pressed
    }
}

/// 一つのキーの状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    /// 現在押されている
    pub down: bool,
    /// 押されてから読み出されていない
    pub was_down: bool,
    /// 押下エッジがあった
    pub was_pressed: bool,
    /// 解放エッジがあった
    pub was_released: bool,
}

impl KeyState {
    /// 新しい押下状態を適用
    ///
    /// 押しっぱなしでは `was_pressed` は再設定されません。
    /// 押されていないキーの解放は何も変えません。
    pub fn apply(&mut self, down: bool) -> Option<KeyEdge> {
        match (self.down, down) {
            (false, true) => {
                self.down = true;
                self.was_down = true;
                self.was_pressed = true;
                Some(KeyEdge::Pressed)
            }
            (true, false) => {
                self.down = false;
                self.was_released = true;
                Some(KeyEdge::Released)
            }
            _ => None,
        }
    }
}

/// アクション適用の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyApplication {
    /// 発生したエッジ（適用順）
    pub edges: Vec<(LogicalKey, KeyEdge)>,
    /// サポート外のキー名
    pub unresolved: Vec<String>,
}

/// キー状態テーブル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStateTable {
    states: [KeyState; LogicalKey::COUNT],
}

impl Default for KeyStateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStateTable {
    /// 全キーが離された状態のテーブルを作成
    pub fn new() -> Self {
        Self {
            states: [KeyState::default(); LogicalKey::COUNT],
        }
    }

    /// キーの状態
    pub fn get(&self, key: LogicalKey) -> KeyState {
        self.states[key.index()]
    }

    /// 押されているかどうか
    pub fn is_down(&self, key: LogicalKey) -> bool {
        self.get(key).down
    }

    /// `was_down` を読み出してクリア
    pub fn take_was_down(&mut self, key: LogicalKey) -> bool {
        std::mem::take(&mut self.states[key.index()].was_down)
    }

    /// `was_down` をクリアせずに読み出す
    pub fn peek_was_down(&self, key: LogicalKey) -> bool {
        self.get(key).was_down
    }

    /// 押下エッジがあったかどうか
    pub fn was_pressed(&self, key: LogicalKey) -> bool {
        self.get(key).was_pressed
    }

    /// 解放エッジがあったかどうか
    pub fn was_released(&self, key: LogicalKey) -> bool {
        self.get(key).was_released
    }

    /// 一つのキーに押下状態を適用
    pub fn set(&mut self, key: LogicalKey, down: bool) -> Option<KeyEdge> {
        self.states[key.index()].apply(down)
    }

    /// アクションを適用
    ///
    /// 同じキーが複数回現れた場合は最後の値が有効です。
    /// エッジはアクション内で最初に現れた順に並び、スナップショット形式で
    /// 含まれなかったキーはその後に正準順で続きます。
    pub fn apply_action(&mut self, action: &Action) -> KeyApplication {
        let mut result = KeyApplication::default();
        let mut desired: [Option<bool>; LogicalKey::COUNT] = [None; LogicalKey::COUNT];
        let mut order = Vec::with_capacity(action.keys.len());

        for entry in &action.keys {
            match LogicalKey::from_name(&entry.name) {
                Some(key) => {
                    if desired[key.index()].is_none() {
                        order.push(key);
                    }
                    desired[key.index()] = Some(entry.down);
                }
                None => {
                    log::warn!("サポートされていないキーを無視します: {}", entry.name);
                    result.unresolved.push(entry.name.clone());
                }
            }
        }

        if action.absent == AbsentKeyPolicy::Released {
            order.extend(
                LogicalKey::ALL
                    .iter()
                    .copied()
                    .filter(|key| desired[key.index()].is_none()),
            );
        }

        for key in order {
            let down = desired[key.index()].unwrap_or(false);
            if let Some(edge) = self.set(key, down) {
                result.edges.push((key, edge));
            }
        }

        result
    }

    /// 全キーの `was_pressed` をクリア
    pub fn clear_was_pressed(&mut self) {
        for state in &mut self.states {
            state.was_pressed = false;
        }
    }

    /// 全キーの `was_released` をクリア
    pub fn clear_was_released(&mut self) {
        for state in &mut self.states {
            state.was_released = false;
        }
    }

    /// 全キーの四つのフラグをすべてクリア
    pub fn clear_all(&mut self) {
        self.states = [KeyState::default(); LogicalKey::COUNT];
    }

    /// マウスボタン集約（dig=1, place=2, middle=4）
    ///
    /// 保存はせず、呼び出しごとに現在の `down` から計算します。
    pub fn button_mask(&self) -> u32 {
        LogicalKey::ALL
            .iter()
            .filter(|key| self.is_down(**key))
            .filter_map(|key| key.mouse_button_bit())
            .fold(0, |mask, bit| mask | bit)
    }
}

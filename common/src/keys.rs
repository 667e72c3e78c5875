//! 論理キーとキーコード解決
//!
//! コントローラーが送ってくるキー名（`"forward"` や `"esc"` など）を
//! 固定された論理キー集合にマップし、さらにホストのキーコードへ解決します。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 論理キー
///
/// サポートするキー集合は固定です。`index()` はキー状態テーブルの
/// 密なインデックスとして使われます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalKey {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Sneak,
    Dig,
    Place,
    Middle,
    Drop,
    Inventory,
    Aux1,
    HotbarNext,
    HotbarPrevious,
    Slot1,
    Slot2,
    Slot3,
    Slot4,
    Slot5,
    Slot6,
    Slot7,
    Slot8,
    Autoforward,
    Pitchmove,
    Freemove,
    Fastmove,
    Noclip,
    Zoom,
    Screenshot,
    Esc,
}

impl LogicalKey {
    /// サポートするキーの数
    pub const COUNT: usize = 30;

    /// サポートする全キー（正準順）
    pub const ALL: [LogicalKey; LogicalKey::COUNT] = [
        LogicalKey::Forward,
        LogicalKey::Backward,
        LogicalKey::Left,
        LogicalKey::Right,
        LogicalKey::Jump,
        LogicalKey::Sneak,
        LogicalKey::Dig,
        LogicalKey::Place,
        LogicalKey::Middle,
        LogicalKey::Drop,
        LogicalKey::Inventory,
        LogicalKey::Aux1,
        LogicalKey::HotbarNext,
        LogicalKey::HotbarPrevious,
        LogicalKey::Slot1,
        LogicalKey::Slot2,
        LogicalKey::Slot3,
        LogicalKey::Slot4,
        LogicalKey::Slot5,
        LogicalKey::Slot6,
        LogicalKey::Slot7,
        LogicalKey::Slot8,
        LogicalKey::Autoforward,
        LogicalKey::Pitchmove,
        LogicalKey::Freemove,
        LogicalKey::Fastmove,
        LogicalKey::Noclip,
        LogicalKey::Zoom,
        LogicalKey::Screenshot,
        LogicalKey::Esc,
    ];

    /// 密なインデックス
    pub fn index(self) -> usize {
        self as usize
    }

    /// ワイヤ上のキー名
    pub fn name(self) -> &'static str {
        match self {
            LogicalKey::Forward => "forward",
            LogicalKey::Backward => "backward",
            LogicalKey::Left => "left",
            LogicalKey::Right => "right",
            LogicalKey::Jump => "jump",
            LogicalKey::Sneak => "sneak",
            LogicalKey::Dig => "dig",
            LogicalKey::Place => "place",
            LogicalKey::Middle => "middle",
            LogicalKey::Drop => "drop",
            LogicalKey::Inventory => "inventory",
            LogicalKey::Aux1 => "aux1",
            LogicalKey::HotbarNext => "hotbar_next",
            LogicalKey::HotbarPrevious => "hotbar_previous",
            LogicalKey::Slot1 => "slot1",
            LogicalKey::Slot2 => "slot2",
            LogicalKey::Slot3 => "slot3",
            LogicalKey::Slot4 => "slot4",
            LogicalKey::Slot5 => "slot5",
            LogicalKey::Slot6 => "slot6",
            LogicalKey::Slot7 => "slot7",
            LogicalKey::Slot8 => "slot8",
            LogicalKey::Autoforward => "autoforward",
            LogicalKey::Pitchmove => "pitchmove",
            LogicalKey::Freemove => "freemove",
            LogicalKey::Fastmove => "fastmove",
            LogicalKey::Noclip => "noclip",
            LogicalKey::Zoom => "zoom",
            LogicalKey::Screenshot => "screenshot",
            LogicalKey::Esc => "esc",
        }
    }

    /// キー名から論理キーを取得
    pub fn from_name(name: &str) -> Option<Self> {
        LogicalKey::ALL.iter().copied().find(|key| key.name() == name)
    }

    /// マウスボタンに割り当てられたキーかどうか
    pub fn is_mouse_button(self) -> bool {
        self.mouse_button_bit().is_some()
    }

    /// ボタン集約ビット（dig=1, place=2, middle=4）
    pub fn mouse_button_bit(self) -> Option<u32> {
        match self {
            LogicalKey::Dig => Some(1),
            LogicalKey::Place => Some(2),
            LogicalKey::Middle => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ホスト側のキーコード
///
/// 値は仮想キーコード（Windows の VK_* と同じ番号体系）です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    /// 左マウスボタン
    pub const LBUTTON: KeyCode = KeyCode(0x01);
    /// 右マウスボタン
    pub const RBUTTON: KeyCode = KeyCode(0x02);
    /// 中マウスボタン
    pub const MBUTTON: KeyCode = KeyCode(0x04);
    /// Escape
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(0x{:02X})", self.0)
    }
}

/// キーコード解決
///
/// 論理キーから具体的なキーコードへの純粋な写像です。
pub trait KeyCodeResolver {
    /// 論理キーを解決
    fn resolve(&self, key: LogicalKey) -> KeyCode;
}

/// キーバインド表
///
/// 設定ファイルの `keymap` でデフォルトを上書きできます。
/// `esc` とマウスボタン（dig/place/middle）は固定で、上書きは無視されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    codes: [KeyCode; LogicalKey::COUNT],
}

impl KeyBindings {
    /// デフォルトのキーバインドを作成
    pub fn new() -> Self {
        let mut codes = [KeyCode(0); LogicalKey::COUNT];
        for key in LogicalKey::ALL {
            codes[key.index()] = default_code(key);
        }
        Self { codes }
    }

    /// 上書き表からキーバインドを作成
    ///
    /// 未知のキー名は警告を出して無視します。
    pub fn from_overrides(overrides: &HashMap<String, u32>) -> Self {
        let mut bindings = Self::new();
        for (name, code) in overrides {
            match LogicalKey::from_name(name) {
                Some(key) => {
                    bindings.bind(key, KeyCode(*code));
                }
                None => log::warn!("keymap に未知のキー名があります: {}", name),
            }
        }
        bindings
    }

    /// キーを割り当て
    ///
    /// 固定キーの場合は何もせず false を返します。
    pub fn bind(&mut self, key: LogicalKey, code: KeyCode) -> bool {
        if fixed_code(key).is_some() {
            log::debug!("固定キー {} の割り当ては変更できません", key);
            return false;
        }
        self.codes[key.index()] = code;
        true
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyCodeResolver for KeyBindings {
    fn resolve(&self, key: LogicalKey) -> KeyCode {
        fixed_code(key).unwrap_or(self.codes[key.index()])
    }
}

/// 設定で変更できない組み込みの割り当て
fn fixed_code(key: LogicalKey) -> Option<KeyCode> {
    match key {
        LogicalKey::Esc => Some(KeyCode::ESCAPE),
        LogicalKey::Dig => Some(KeyCode::LBUTTON),
        LogicalKey::Place => Some(KeyCode::RBUTTON),
        LogicalKey::Middle => Some(KeyCode::MBUTTON),
        _ => None,
    }
}

fn default_code(key: LogicalKey) -> KeyCode {
    if let Some(code) = fixed_code(key) {
        return code;
    }
    let code = match key {
        LogicalKey::Forward => 0x57,     // W
        LogicalKey::Backward => 0x53,    // S
        LogicalKey::Left => 0x41,        // A
        LogicalKey::Right => 0x44,       // D
        LogicalKey::Jump => 0x20,        // Space
        LogicalKey::Sneak => 0xA0,       // LShift
        LogicalKey::Drop => 0x51,        // Q
        LogicalKey::Inventory => 0x49,   // I
        LogicalKey::Aux1 => 0x45,        // E
        LogicalKey::HotbarNext => 0x4E,  // N
        LogicalKey::HotbarPrevious => 0x42, // B
        LogicalKey::Slot1 => 0x31,
        LogicalKey::Slot2 => 0x32,
        LogicalKey::Slot3 => 0x33,
        LogicalKey::Slot4 => 0x34,
        LogicalKey::Slot5 => 0x35,
        LogicalKey::Slot6 => 0x36,
        LogicalKey::Slot7 => 0x37,
        LogicalKey::Slot8 => 0x38,
        LogicalKey::Autoforward => 0x70, // F1
        LogicalKey::Pitchmove => 0x50,   // P
        LogicalKey::Freemove => 0x4B,    // K
        LogicalKey::Fastmove => 0x4A,    // J
        LogicalKey::Noclip => 0x48,      // H
        LogicalKey::Zoom => 0x5A,        // Z
        LogicalKey::Screenshot => 0x7B,  // F12
        LogicalKey::Esc | LogicalKey::Dig | LogicalKey::Place | LogicalKey::Middle => 0,
    };
    KeyCode(code)
}

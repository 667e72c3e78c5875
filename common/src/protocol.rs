//! 通信プロトコル定義
//!
//! コントローラーからエンジンへ送られるアクションメッセージを定義します。
//! ワイヤ形式はバイナリ（タグ付きフィールド）とテキスト（JSON）の二種類で、
//! どちらも同じ [`Action`] にデコードされます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, DecodeError};
use crate::wire::{binary, text};

/// メッセージに含まれないキーの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsentKeyPolicy {
    /// 変化したキーだけを列挙する形式。含まれないキーは変化なし
    NoChange,
    /// 全キーのスナップショット形式。含まれないキーは離されたものとする
    Released,
}

/// キーイベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventType {
    /// 押下
    Press,
    /// 解放
    Release,
}

impl KeyEventType {
    /// ワイヤ上の値
    pub fn wire_value(self) -> u64 {
        match self {
            KeyEventType::Press => 0,
            KeyEventType::Release => 1,
        }
    }

    /// ワイヤ上の値から変換
    pub fn from_wire(value: u64) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(KeyEventType::Press),
            1 => Ok(KeyEventType::Release),
            other => Err(DecodeError::InvalidEventType(other)),
        }
    }

    /// 押下かどうか
    pub fn is_down(self) -> bool {
        self == KeyEventType::Press
    }
}

/// アクション内のキー指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// キー名（サポート外の名前も含まれ得る）
    pub name: String,
    /// 押下状態
    pub down: bool,
}

/// デコード済みのアクション
///
/// メッセージごとに新しく作られ、すぐに消費されます。
/// 同じキーが複数回現れた場合は最後のものが有効です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// キー指定（メッセージ内の順序）
    pub keys: Vec<KeyEntry>,
    /// マウス移動量 X
    pub mouse_dx: i32,
    /// マウス移動量 Y
    pub mouse_dy: i32,
    /// 含まれないキーの扱い
    pub absent: AbsentKeyPolicy,
}

impl Action {
    /// 空のアクションを作成
    pub fn new(absent: AbsentKeyPolicy) -> Self {
        Self {
            keys: Vec::new(),
            mouse_dx: 0,
            mouse_dy: 0,
            absent,
        }
    }

    /// キー指定を追加
    pub fn with_key(mut self, name: impl Into<String>, down: bool) -> Self {
        self.push_key(name, down);
        self
    }

    /// マウス移動量を設定
    pub fn with_mouse(mut self, dx: i32, dy: i32) -> Self {
        self.mouse_dx = dx;
        self.mouse_dy = dy;
        self
    }

    /// キー指定を追加
    pub fn push_key(&mut self, name: impl Into<String>, down: bool) {
        self.keys.push(KeyEntry {
            name: name.into(),
            down,
        });
    }

    /// マウス移動量
    pub fn mouse_delta(&self) -> (i32, i32) {
        (self.mouse_dx, self.mouse_dy)
    }
}

/// バイナリ形式のキーボードイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// キー名
    pub key: String,
    /// イベント種別
    pub event_type: KeyEventType,
}

/// バイナリ形式のアクション（変化したキーのイベント列）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryAction {
    /// キーイベント
    pub key_events: Vec<KeyboardEvent>,
    /// マウス移動量 X
    pub mouse_dx: i32,
    /// マウス移動量 Y
    pub mouse_dy: i32,
}

/// テキスト形式のアクション（全キーのスナップショット）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextAction {
    /// キー名と押下状態
    pub keys: Vec<(String, bool)>,
    /// マウス移動量 [dx, dy]
    pub mouse: [i32; 2],
}

/// ワイヤ形式ごとのアクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireAction {
    /// バイナリ形式
    Binary(BinaryAction),
    /// テキスト形式
    Text(TextAction),
}

impl WireAction {
    /// 正準の [`Action`] に変換
    pub fn into_action(self) -> Action {
        match self {
            WireAction::Binary(msg) => Action {
                keys: msg
                    .key_events
                    .into_iter()
                    .map(|ev| KeyEntry {
                        name: ev.key,
                        down: ev.event_type.is_down(),
                    })
                    .collect(),
                mouse_dx: msg.mouse_dx,
                mouse_dy: msg.mouse_dy,
                absent: AbsentKeyPolicy::NoChange,
            },
            WireAction::Text(msg) => Action {
                keys: msg
                    .keys
                    .into_iter()
                    .map(|(name, down)| KeyEntry { name, down })
                    .collect(),
                mouse_dx: msg.mouse[0],
                mouse_dy: msg.mouse[1],
                absent: AbsentKeyPolicy::Released,
            },
        }
    }
}

/// ワイヤ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// タグ付きフィールドのバイナリ形式
    Binary,
    /// JSON テキスト形式
    Json,
}

impl Default for WireFormat {
    fn default() -> Self {
        WireFormat::Binary
    }
}

impl WireFormat {
    /// 形式名
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Binary => "binary",
            WireFormat::Json => "json",
        }
    }

    /// 形式ごとのメッセージにデコード
    pub fn decode_wire(&self, bytes: &[u8]) -> Result<WireAction, DecodeError> {
        match self {
            WireFormat::Binary => binary::decode(bytes).map(WireAction::Binary),
            WireFormat::Json => text::decode(bytes).map(WireAction::Text),
        }
    }

    /// アクションをこの形式でエンコード
    ///
    /// JSON 形式はスナップショットなので、含まれないキーは受信側で
    /// 離されたものとして扱われます。
    pub fn encode(&self, action: &Action) -> Result<Vec<u8>, CommonError> {
        match self {
            WireFormat::Binary => Ok(binary::encode(action)),
            WireFormat::Json => text::encode(action),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binary" | "bin" | "protobuf" => Ok(WireFormat::Binary),
            "json" | "text" => Ok(WireFormat::Json),
            other => Err(format!("未知のワイヤ形式: {}", other)),
        }
    }
}

/// アクションデコーダー
///
/// デコードは純粋で副作用を持ちません。
pub trait ActionDecoder {
    /// バイト列をアクションにデコード
    fn decode(&self, bytes: &[u8]) -> Result<Action, DecodeError>;
}

impl ActionDecoder for WireFormat {
    fn decode(&self, bytes: &[u8]) -> Result<Action, DecodeError> {
        self.decode_wire(bytes).map(WireAction::into_action)
    }
}

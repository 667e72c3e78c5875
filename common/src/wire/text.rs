//! テキスト形式
//!
//! キー名から 0/1 へのフラットな JSON オブジェクトと、
//! マウス移動量 `"mouse": [dx, dy]` からなるスナップショットです。
//!
//! ```json
//! {"forward": 1, "left": 0, "dig": 1, "mouse": [5, -2]}
//! ```

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::{CommonError, DecodeError};
use crate::protocol::{Action, TextAction};

/// マウス移動量のフィールド名
pub const MOUSE_FIELD: &str = "mouse";

/// オブジェクトのエントリをメッセージ内の順序のまま読み出す
struct Entries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("JSON オブジェクト")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// バイト列からテキストアクションをデコード
///
/// キーは現れた順に並びます。同じキーが複数回現れた場合もすべて残し、
/// 最後のものを有効とするのは受け取る側です。
/// キーの値は 1 が押下、それ以外の数値は解放として扱います。
/// 真偽値も受け付けます。`mouse` が無い場合は移動量 0 です。
pub fn decode(bytes: &[u8]) -> Result<TextAction, DecodeError> {
    let Entries(entries) = serde_json::from_slice(bytes)?;

    let mut action = TextAction::default();
    for (name, value) in entries {
        if name == MOUSE_FIELD {
            action.mouse = decode_mouse(&value)?;
            continue;
        }
        let down = decode_key_value(&name, &value)?;
        action.keys.push((name, down));
    }

    Ok(action)
}

fn decode_key_value(name: &str, value: &Value) -> Result<bool, DecodeError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(v) => Ok(v == 1),
            None => Ok(n.as_f64() == Some(1.0)),
        },
        other => Err(DecodeError::InvalidField {
            field: name.to_string(),
            reason: format!("数値が必要ですが {} でした", type_name(other)),
        }),
    }
}

fn decode_mouse(value: &Value) -> Result<[i32; 2], DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidField {
        field: MOUSE_FIELD.to_string(),
        reason,
    };

    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("配列が必要ですが {} でした", type_name(value))))?;
    if items.len() != 2 {
        return Err(invalid(format!("要素数が 2 ではありません: {}", items.len())));
    }

    let mut mouse = [0i32; 2];
    for (slot, item) in mouse.iter_mut().zip(items) {
        *slot = item
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| invalid(format!("32 ビット整数ではありません: {}", item)))?;
    }
    Ok(mouse)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "真偽値",
        Value::Number(_) => "数値",
        Value::String(_) => "文字列",
        Value::Array(_) => "配列",
        Value::Object(_) => "オブジェクト",
    }
}

/// エンコード用のスナップショット
struct Snapshot<'a> {
    keys: Vec<(&'a str, bool)>,
    mouse: [i32; 2],
}

impl<'a> Snapshot<'a> {
    /// 同じキーは最初の位置に最後の値で一つにまとめる
    fn from_action(action: &'a Action) -> Self {
        let mut keys: Vec<(&str, bool)> = Vec::with_capacity(action.keys.len());
        for entry in action.keys.iter().filter(|e| e.name != MOUSE_FIELD) {
            match keys.iter_mut().find(|(name, _)| *name == entry.name) {
                Some(slot) => slot.1 = entry.down,
                None => keys.push((entry.name.as_str(), entry.down)),
            }
        }
        Self {
            keys,
            mouse: [action.mouse_dx, action.mouse_dy],
        }
    }
}

impl Serialize for Snapshot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len() + 1))?;
        for (name, down) in &self.keys {
            map.serialize_entry(name, &u8::from(*down))?;
        }
        map.serialize_entry(MOUSE_FIELD, &self.mouse)?;
        map.end()
    }
}

/// アクションを JSON 形式にエンコード
///
/// キーはアクション内の順に書き出します。
/// 同じキーが複数ある場合は最初の位置に最後の値が残ります。
pub fn encode(action: &Action) -> Result<Vec<u8>, CommonError> {
    serde_json::to_vec(&Snapshot::from_action(action))
        .map_err(|e| CommonError::EncodeError(e.to_string()))
}

//! バイナリ形式
//!
//! protobuf 互換のタグ付きフィールドでエンコードされたアクションです。
//!
//! ```text
//! message InputAction {
//!     repeated KeyboardEvent keyEvents = 1;
//!     int32 mouseDx = 2;
//!     int32 mouseDy = 3;
//! }
//! message KeyboardEvent {
//!     string key = 1;
//!     EventType eventType = 2;   // PRESS = 0, RELEASE = 1
//! }
//! ```
//!
//! 未知のフィールドは読み飛ばします。

use crate::error::DecodeError;
use crate::protocol::{Action, BinaryAction, KeyEventType, KeyboardEvent};

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

const FIELD_KEY_EVENTS: u32 = 1;
const FIELD_MOUSE_DX: u32 = 2;
const FIELD_MOUSE_DY: u32 = 3;

const FIELD_EVENT_KEY: u32 = 1;
const FIELD_EVENT_TYPE: u32 = 2;

const MAX_VARINT_LEN: usize = 10;

/// バイト列からバイナリアクションをデコード
pub fn decode(bytes: &[u8]) -> Result<BinaryAction, DecodeError> {
    let mut reader = WireReader::new(bytes, 0);
    let mut action = BinaryAction::default();

    while !reader.is_empty() {
        let (field, wire_type) = reader.read_tag()?;
        match (field, wire_type) {
            (FIELD_KEY_EVENTS, WIRE_LEN) => {
                let (offset, body) = reader.read_len_delimited()?;
                action.key_events.push(decode_key_event(body, offset)?);
            }
            (FIELD_MOUSE_DX, WIRE_VARINT) => action.mouse_dx = reader.read_int32()?,
            (FIELD_MOUSE_DY, WIRE_VARINT) => action.mouse_dy = reader.read_int32()?,
            (FIELD_KEY_EVENTS | FIELD_MOUSE_DX | FIELD_MOUSE_DY, _) => {
                return Err(DecodeError::InvalidWireType { field, wire_type });
            }
            _ => reader.skip(field, wire_type)?,
        }
    }

    Ok(action)
}

fn decode_key_event(bytes: &[u8], base: usize) -> Result<KeyboardEvent, DecodeError> {
    let mut reader = WireReader::new(bytes, base);
    let mut key = String::new();
    let mut event_type = KeyEventType::Press;

    while !reader.is_empty() {
        let (field, wire_type) = reader.read_tag()?;
        match (field, wire_type) {
            (FIELD_EVENT_KEY, WIRE_LEN) => {
                let (_, raw) = reader.read_len_delimited()?;
                key = std::str::from_utf8(raw)
                    .map_err(|_| DecodeError::InvalidUtf8)?
                    .to_string();
            }
            (FIELD_EVENT_TYPE, WIRE_VARINT) => {
                event_type = KeyEventType::from_wire(reader.read_varint()?)?;
            }
            (FIELD_EVENT_KEY | FIELD_EVENT_TYPE, _) => {
                return Err(DecodeError::InvalidWireType { field, wire_type });
            }
            _ => reader.skip(field, wire_type)?,
        }
    }

    Ok(KeyboardEvent { key, event_type })
}

/// アクションをバイナリ形式にエンコード
///
/// 値が 0 のマウスフィールドは省略します。
pub fn encode(action: &Action) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + action.keys.len() * 16);

    for entry in &action.keys {
        let event_type = if entry.down {
            KeyEventType::Press
        } else {
            KeyEventType::Release
        };

        let mut body = Vec::with_capacity(entry.name.len() + 4);
        write_tag(&mut body, FIELD_EVENT_KEY, WIRE_LEN);
        write_varint(&mut body, entry.name.len() as u64);
        body.extend_from_slice(entry.name.as_bytes());
        write_tag(&mut body, FIELD_EVENT_TYPE, WIRE_VARINT);
        write_varint(&mut body, event_type.wire_value());

        write_tag(&mut out, FIELD_KEY_EVENTS, WIRE_LEN);
        write_varint(&mut out, body.len() as u64);
        out.extend_from_slice(&body);
    }

    if action.mouse_dx != 0 {
        write_tag(&mut out, FIELD_MOUSE_DX, WIRE_VARINT);
        write_varint(&mut out, action.mouse_dx as i64 as u64);
    }
    if action.mouse_dy != 0 {
        write_tag(&mut out, FIELD_MOUSE_DY, WIRE_VARINT);
        write_varint(&mut out, action.mouse_dy as i64 as u64);
    }

    out
}

fn write_tag(out: &mut Vec<u8>, field: u32, wire_type: u8) {
    write_varint(out, ((field as u64) << 3) | wire_type as u64);
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// タグ付きフィールドの読み取り
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// エラー報告用の外側メッセージでの開始位置
    base: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset();
        let mut value = 0u64;

        for i in 0..MAX_VARINT_LEN {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(DecodeError::Truncated { offset: self.offset() })?;
            self.pos += 1;
            value |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(DecodeError::MalformedVarint { offset: start })
    }

    /// int32 は 64 ビット符号拡張で送られるので下位 32 ビットを取る
    fn read_int32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_varint()? as i32)
    }

    fn read_tag(&mut self) -> Result<(u32, u8), DecodeError> {
        let offset = self.offset();
        let tag = self.read_varint()?;
        let field = (tag >> 3) as u32;
        if field == 0 {
            return Err(DecodeError::InvalidFieldNumber { offset });
        }
        Ok((field, (tag & 0x07) as u8))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(DecodeError::Truncated { offset: self.offset() })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// 長さ付きフィールドを読み、外側での開始位置と本体を返す
    fn read_len_delimited(&mut self) -> Result<(usize, &'a [u8]), DecodeError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::Truncated {
            offset: self.offset(),
        })?;
        let offset = self.offset();
        Ok((offset, self.take(len)?))
    }

    fn skip(&mut self, field: u32, wire_type: u8) -> Result<(), DecodeError> {
        match wire_type {
            WIRE_VARINT => self.read_varint().map(|_| ()),
            WIRE_FIXED64 => self.take(8).map(|_| ()),
            WIRE_LEN => self.read_len_delimited().map(|_| ()),
            WIRE_FIXED32 => self.take(4).map(|_| ()),
            _ => Err(DecodeError::InvalidWireType { field, wire_type }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AbsentKeyPolicy;

    #[test]
    fn test_decode_known_bytes() {
        // keyEvents { key: "jump", eventType: RELEASE }, mouseDx: -2, mouseDy: 7
        let mut bytes = vec![0x0A, 0x08, 0x0A, 0x04];
        bytes.extend_from_slice(b"jump");
        bytes.extend_from_slice(&[0x10, 0x01]);
        bytes.push(0x10);
        bytes.extend_from_slice(&[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        bytes.extend_from_slice(&[0x18, 0x07]);

        let action = decode(&bytes).expect("デコードに失敗しました");
        assert_eq!(action.key_events.len(), 1);
        assert_eq!(action.key_events[0].key, "jump");
        assert_eq!(action.key_events[0].event_type, KeyEventType::Release);
        assert_eq!(action.mouse_dx, -2);
        assert_eq!(action.mouse_dy, 7);
    }

    #[test]
    fn test_empty_message_is_noop_action() {
        let action = decode(&[]).unwrap();
        assert!(action.key_events.is_empty());
        assert_eq!((action.mouse_dx, action.mouse_dy), (0, 0));
    }

    #[test]
    fn test_missing_event_type_defaults_to_press() {
        let mut bytes = vec![0x0A, 0x05, 0x0A, 0x03];
        bytes.extend_from_slice(b"dig");
        let action = decode(&bytes).unwrap();
        assert_eq!(action.key_events[0].event_type, KeyEventType::Press);
    }

    #[test]
    fn test_encoded_order_is_preserved() {
        let action = Action::new(AbsentKeyPolicy::NoChange)
            .with_key("place", true)
            .with_key("esc", false)
            .with_key("forward", true)
            .with_mouse(-120, 45);

        let decoded = decode(&encode(&action)).unwrap();
        let names: Vec<_> = decoded.key_events.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(names, vec!["place", "esc", "forward"]);
        assert_eq!(decoded.key_events[1].event_type, KeyEventType::Release);
        assert_eq!((decoded.mouse_dx, decoded.mouse_dy), (-120, 45));
    }

    #[test]
    fn test_truncated_input_is_error() {
        let action = Action::new(AbsentKeyPolicy::NoChange)
            .with_key("forward", true)
            .with_mouse(300, 0);
        let bytes = encode(&action);
        // キーイベント 13 バイト + mouseDx 3 バイト
        assert_eq!(bytes.len(), 16);

        for cut in (1..13).chain(14..16) {
            let result = decode(&bytes[..cut]);
            assert!(result.is_err(), "{} バイトで切ってもエラーになりません", cut);
        }
        // フィールド境界で切れた場合は検出できない
        assert!(decode(&bytes[..13]).is_ok());
    }

    #[test]
    fn test_overlong_varint_is_error() {
        let bytes = [0x10, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::MalformedVarint { offset: 1 })
        );
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let mut bytes = vec![
            0x20, 0x05, // field 4 varint
            0x29, 1, 2, 3, 4, 5, 6, 7, 8, // field 5 fixed64
            0x32, 0x02, 0xAA, 0xBB, // field 6 len
            0x3D, 1, 2, 3, 4, // field 7 fixed32
        ];
        bytes.extend_from_slice(&[0x10, 0x03]);
        let action = decode(&bytes).unwrap();
        assert_eq!(action.mouse_dx, 3);
    }

    #[test]
    fn test_wrong_wire_type_for_known_field() {
        // mouseDx を長さ付きで送る
        let bytes = [0x12, 0x01, 0x00];
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::InvalidWireType { field: 2, wire_type: 2 })
        );
    }

    #[test]
    fn test_invalid_utf8_key() {
        let bytes = [0x0A, 0x04, 0x0A, 0x02, 0xC3, 0x28];
        assert_eq!(decode(&bytes), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_group_wire_type_is_rejected() {
        let bytes = [0x23];
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::InvalidWireType { field: 4, wire_type: 3 })
        );
    }
}

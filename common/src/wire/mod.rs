//! ワイヤ形式のコーデック
//!
//! - [`binary`]: タグ付きフィールド形式（protobuf 互換のエンコーディング）
//! - [`text`]: JSON スナップショット形式

pub mod binary;
pub mod text;

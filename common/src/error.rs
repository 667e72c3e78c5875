//! エラー型定義
//!
//! リモート入力合成エンジンで使用する共通エラー型を定義します。

use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// アクションのデコードエラー
///
/// 不正または途中で切れたメッセージはすべてこの型で報告されます。
/// 呼び出し側はそのステップを破棄し、前回の状態を保持します。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// メッセージが途中で切れている
    #[error("メッセージが途中で切れています (オフセット {offset})")]
    Truncated {
        /// 読み取りに失敗した位置
        offset: usize,
    },

    /// 可変長整数が長すぎる
    #[error("不正な可変長整数 (オフセット {offset})")]
    MalformedVarint {
        /// 可変長整数の開始位置
        offset: usize,
    },

    /// 未対応のワイヤタイプ
    #[error("未対応のワイヤタイプ {wire_type} (フィールド {field})")]
    InvalidWireType {
        /// フィールド番号
        field: u32,
        /// ワイヤタイプ
        wire_type: u8,
    },

    /// フィールド番号が 0
    #[error("不正なフィールド番号 0 (オフセット {offset})")]
    InvalidFieldNumber {
        /// タグの位置
        offset: usize,
    },

    /// キー名が UTF-8 ではない
    #[error("キー名が UTF-8 ではありません")]
    InvalidUtf8,

    /// 未知のイベント種別
    #[error("未知のキーイベント種別: {0}")]
    InvalidEventType(u64),

    /// テキスト形式の解析エラー
    #[error("テキスト形式の解析に失敗しました: {0}")]
    Malformed(String),

    /// フィールドの型が不正
    #[error("フィールド '{field}' の型が不正です: {reason}")]
    InvalidField {
        /// フィールド名
        field: String,
        /// 理由
        reason: String,
    },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// 共通エラー
#[derive(Error, Debug)]
pub enum CommonError {
    /// 入出力エラー
    #[error("I/Oエラー: {0}")]
    IoError(#[from] io::Error),

    /// デコードエラー
    #[error("デコードエラー: {0}")]
    DecodeError(#[from] DecodeError),

    /// エンコードエラー
    #[error("エンコードエラー: {0}")]
    EncodeError(String),

    /// 設定エラー
    #[error("設定エラー: {0}")]
    ConfigError(#[from] ConfigError),

    /// フレームが大きすぎる
    #[error("フレームサイズ {size} バイトは上限 {limit} バイトを超えています")]
    FrameTooLarge {
        /// 受信したサイズ
        size: usize,
        /// 上限
        limit: usize,
    },

    /// 未対応のキー名
    #[error("未対応のキー名: {0}")]
    UnresolvedKey(String),

    /// その他のエラー
    #[error("{0}")]
    Other(String),
}

/// 結果型のエイリアス
pub type Result<T> = std::result::Result<T, CommonError>;

//! ネットワークモジュール
//!
//! コントローラーからアクションメッセージを受け取るトランスポートを提供します。
//! エンジンは [`Transport::try_receive`] をフレームごとに一度呼び、
//! 受信を待ってブロックすることはありません。

pub mod queue;
pub mod tcp_server;

use remote_input_rs_common::CommonError;
use std::collections::VecDeque;
use thiserror::Error;

pub use queue::{ActionQueue, OverflowPolicy, ThreadedTransport};
pub use tcp_server::TcpTransport;

/// ネットワークエラー
#[derive(Error, Debug)]
pub enum NetworkError {
    /// バインド失敗
    #[error("{addr} へのバインドに失敗しました: {source}")]
    Bind {
        /// バインド先
        addr: String,
        /// 原因
        #[source]
        source: std::io::Error,
    },

    /// I/Oエラー
    #[error("I/Oエラー: {0}")]
    IoError(#[from] std::io::Error),

    /// フレームが大きすぎる
    #[error("フレームが大きすぎます: {size} バイト (上限 {limit} バイト)")]
    FrameTooLarge {
        /// 受信したサイズ
        size: usize,
        /// 上限
        limit: usize,
    },

    /// スレッドエラー
    #[error("スレッドエラー: {0}")]
    ThreadError(String),

    /// その他のエラー
    #[error("ネットワークエラー: {0}")]
    Other(String),
}

impl From<CommonError> for NetworkError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::IoError(e) => NetworkError::IoError(e),
            CommonError::FrameTooLarge { size, limit } => NetworkError::FrameTooLarge { size, limit },
            other => NetworkError::Other(other.to_string()),
        }
    }
}

/// アクションメッセージのトランスポート
pub trait Transport {
    /// メッセージを一つ受信（ノンブロッキング）
    ///
    /// メッセージが無ければ `Ok(None)` を返します。
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, NetworkError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, NetworkError> {
        (**self).try_receive()
    }
}

/// 事前に用意したメッセージを順に返すトランスポート
impl Transport for VecDeque<Vec<u8>> {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, NetworkError> {
        Ok(self.pop_front())
    }
}

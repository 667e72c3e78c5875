//! ネットワークモジュール
//!
//! エンジンへアクションを送る TCP 接続を提供します。

mod tcp_client;

pub use tcp_client::ControllerConnection;

use remote_input_rs_common::CommonError;
use std::io;
use thiserror::Error;

/// ネットワークエラー
#[derive(Error, Debug)]
pub enum NetworkError {
    /// 接続エラー
    #[error("{addr} への接続に失敗しました: {source}")]
    Connect {
        /// 接続先
        addr: String,
        /// 原因
        #[source]
        source: io::Error,
    },

    /// IO エラー
    #[error("IO エラー: {0}")]
    IoError(#[from] io::Error),

    /// 接続されていない
    #[error("接続されていません")]
    NotConnected,

    /// その他のエラー
    #[error("ネットワークエラー: {0}")]
    Other(String),
}

impl From<CommonError> for NetworkError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::IoError(err) => NetworkError::IoError(err),
            other => NetworkError::Other(other.to_string()),
        }
    }
}

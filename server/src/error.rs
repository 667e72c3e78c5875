//! サーバーエラー定義

use remote_input_rs_common::config::ConfigError;
use thiserror::Error;

use crate::network::NetworkError;

/// サーバーエラー
#[derive(Error, Debug)]
pub enum ServerError {
    /// 設定エラー
    #[error("設定エラー: {0}")]
    Config(#[from] ConfigError),

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    Network(#[from] NetworkError),
}

/// サーバーの結果型
pub type Result<T> = std::result::Result<T, ServerError>;

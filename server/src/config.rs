//! エンジン設定
//!
//! エンジンの設定情報を管理するモジュール

use remote_input_rs_common::config::{self, ConfigError};
use remote_input_rs_common::framing::DEFAULT_MAX_FRAME_SIZE;
use remote_input_rs_common::keys::KeyBindings;
use remote_input_rs_common::utils::logging::LogLevel;
use remote_input_rs_common::utils::path;
use remote_input_rs_common::WireFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::input::Viewport;
use crate::network::queue::OverflowPolicy;

/// 既定の設定ファイル名
pub const DEFAULT_CONFIG_FILE: &str = "engine.toml";

/// エンジン設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// ネットワーク設定
    pub network: NetworkSettings,
    /// 表示設定
    pub display: DisplaySettings,
    /// 入力設定
    pub input: InputSettings,
    /// 受信キュー設定
    pub queue: QueueSettings,
    /// ログ設定
    pub logging: LoggingSettings,
}

/// ネットワーク設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// バインドアドレス
    pub bind_address: String,
    /// ポート番号
    pub port: u16,
    /// 最大フレームサイズ（バイト）
    pub max_frame_size: usize,
}

/// 表示設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// ビューポートの幅
    pub width: u32,
    /// ビューポートの高さ
    pub height: u32,
    /// フレームレート
    pub fps: u32,
}

/// 入力設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// ワイヤ形式
    pub wire_format: WireFormat,
    /// キー名からキーコードへの上書き
    pub keymap: HashMap<String, u32>,
}

/// 受信キュー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// 受信スレッドを使うかどうか
    pub enabled: bool,
    /// 受信済みフレームの保持数（受信スレッドの有無に関わらず使う）
    pub capacity: usize,
    /// 満杯時の動作
    pub overflow: OverflowPolicy,
}

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// ログレベル
    pub level: String,
    /// ログファイル
    pub file: Option<PathBuf>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5555,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            fps: 30,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 64,
            overflow: OverflowPolicy::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl NetworkSettings {
    /// バインド先のアドレス文字列
    pub fn bind_target(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl DisplaySettings {
    /// ビューポートを取得
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

impl InputSettings {
    /// キーバインドを作成
    pub fn key_bindings(&self) -> KeyBindings {
        KeyBindings::from_overrides(&self.keymap)
    }
}

impl LoggingSettings {
    /// ログレベルを取得
    pub fn level(&self) -> Result<LogLevel, ConfigError> {
        self.level.parse().map_err(|reason| ConfigError::InvalidValue {
            key: "logging.level".to_string(),
            reason,
        })
    }
}

impl EngineSettings {
    /// 設定ファイルを読み込み
    ///
    /// パスが指定されない場合は既定の場所を探し、無ければデフォルト値を使います。
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings: Self = match path {
            Some(path) => config::load(path)?,
            None => config::load_or_default(path::default_config_file(DEFAULT_CONFIG_FILE))?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// 設定ファイルに保存
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        config::save(self, path)
    }

    /// 値の整合性を確認
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if self.display.width == 0 || self.display.height == 0 {
            return Err(invalid("display", "ビューポートの大きさは 1 以上が必要です"));
        }
        if self.display.fps == 0 {
            return Err(invalid("display.fps", "1 以上が必要です"));
        }
        if self.network.max_frame_size == 0 {
            return Err(invalid("network.max_frame_size", "1 以上が必要です"));
        }
        if self.queue.capacity == 0 {
            return Err(invalid("queue.capacity", "1 以上が必要です"));
        }
        self.logging.level()?;

        Ok(())
    }
}

//! コントローラー設定

use remote_input_rs_common::config::{self, ConfigError};
use remote_input_rs_common::utils::logging::LogLevel;
use remote_input_rs_common::utils::path;
use remote_input_rs_common::WireFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 既定の設定ファイル名
pub const DEFAULT_CONFIG_FILE: &str = "controller.toml";

/// コントローラー設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// 接続先
    pub server: ServerSettings,
    /// 送信設定
    pub send: SendSettings,
    /// ランダム操作設定
    pub policy: PolicySettings,
    /// ログ設定
    pub logging: LoggingSettings,
}

/// 接続先設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// ホスト名
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// 接続タイムアウト（ミリ秒）
    pub connect_timeout_ms: u64,
}

/// 送信設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendSettings {
    /// ワイヤ形式
    pub wire_format: WireFormat,
    /// 一秒あたりの送信数
    pub rate: u32,
    /// 送信数（無指定なら停止されるまで）
    pub count: Option<u64>,
}

/// ランダム操作設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// マウス移動量 X の最大値
    pub max_mouse_x: i32,
    /// マウス移動量 Y の最大値
    pub max_mouse_y: i32,
    /// キーを押す確率
    pub press_probability: f64,
    /// 乱数シード
    pub seed: Option<u64>,
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

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
            connect_timeout_ms: 3000,
        }
    }
}

impl Default for SendSettings {
    fn default() -> Self {
        Self {
            wire_format: WireFormat::default(),
            rate: 30,
            count: None,
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            max_mouse_x: 800,
            max_mouse_y: 600,
            press_probability: 0.5,
            seed: None,
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

impl ServerSettings {
    /// 接続先のアドレス文字列
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 接続タイムアウト
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
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

impl ControllerSettings {
    /// 設定ファイルを読み込み
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

        if self.server.host.is_empty() {
            return Err(invalid("server.host", "空にできません"));
        }
        if self.send.rate == 0 {
            return Err(invalid("send.rate", "1 以上が必要です"));
        }
        if self.policy.max_mouse_x < 0 || self.policy.max_mouse_y < 0 {
            return Err(invalid("policy", "マウス移動量の最大値は 0 以上が必要です"));
        }
        if !(0.0..=1.0).contains(&self.policy.press_probability) {
            return Err(invalid("policy.press_probability", "0.0 から 1.0 の範囲が必要です"));
        }
        self.logging.level()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ControllerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server.address(), "127.0.0.1:5555");
        assert_eq!(settings.server.connect_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("controller.toml");
        std::fs::write(
            &file,
            r#"
[server]
port = 7000

[send]
wire_format = "json"
count = 10

[policy]
seed = 42
"#,
        )
        .unwrap();

        let settings = ControllerSettings::load(Some(&file)).unwrap();
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.send.wire_format, WireFormat::Json);
        assert_eq!(settings.send.count, Some(10));
        assert_eq!(settings.send.rate, 30);
        assert_eq!(settings.policy.seed, Some(42));
    }

    #[test]
    fn test_validate_rejects_bad_policy() {
        let mut settings = ControllerSettings::default();
        settings.policy.press_probability = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = ControllerSettings::default();
        settings.send.rate = 0;
        assert!(settings.validate().is_err());
    }
}

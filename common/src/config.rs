//! 設定管理
//!
//! 設定ファイルの読み込みと保存を提供します。
//! 形式（JSON / TOML）はファイル拡張子から判定します。

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// 設定エラー
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O エラー
    #[error("設定の読み書き中にI/Oエラーが発生しました: {0}")]
    IoError(#[from] io::Error),

    /// JSON エラー
    #[error("JSONの解析に失敗しました: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML デシリアライズエラー
    #[error("TOMLの解析に失敗しました: {0}")]
    TomlDeError(#[from] toml::de::Error),

    /// TOML シリアライズエラー
    #[error("TOMLのシリアライズに失敗しました: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// 値が不正
    #[error("設定値 '{key}' が不正です: {reason}")]
    InvalidValue {
        /// 設定キー
        key: String,
        /// 理由
        reason: String,
    },
}

/// 設定形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON 形式
    Json,
    /// TOML 形式
    Toml,
}

impl Default for ConfigFormat {
    fn default() -> Self {
        ConfigFormat::Toml
    }
}

impl ConfigFormat {
    /// ファイル拡張子から設定形式を判定
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// ファイル名から設定形式を判定
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path)
    }

    /// 文字列から設定を解析
    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T, ConfigError> {
        Ok(match self {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        })
    }

    /// 設定を文字列に変換
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String, ConfigError> {
        Ok(match self {
            ConfigFormat::Json => serde_json::to_string_pretty(value)?,
            ConfigFormat::Toml => toml::to_string(value)?,
        })
    }
}

/// ファイルから設定を読み込み
pub fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path).unwrap_or_default();
    let content = fs::read_to_string(path)?;
    format.parse(&content)
}

/// ファイルから設定を読み込み（存在しない場合はデフォルト値）
pub fn load_or_default<T, P>(path: P) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    match load(path.as_ref()) {
        Ok(value) => Ok(value),
        Err(ConfigError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {
            log::info!(
                "設定ファイルが見つからないためデフォルト値を使用します: {}",
                path.as_ref().display()
            );
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

/// 設定をファイルに保存
pub fn save<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();

    // ディレクトリが存在することを確認
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let format = ConfigFormat::from_path(path).unwrap_or_default();
    fs::write(path, format.render(value)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    #[serde(default)]
    struct Sample {
        name: String,
        port: u16,
        enabled: bool,
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), None);
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = tempfile::tempdir().expect("一時ディレクトリの作成に失敗しました");
        let sample = Sample {
            name: "engine".to_string(),
            port: 5555,
            enabled: true,
        };

        for file in ["nested/settings.toml", "settings.json"] {
            let path = dir.path().join(file);
            save(&sample, &path).expect("保存に失敗しました");
            let loaded: Sample = load(&path).expect("読み込みに失敗しました");
            assert_eq!(loaded, sample);
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Sample = load_or_default(dir.path().join("none.toml")).unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_broken_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let result: Result<Sample, _> = load_or_default(&path);
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }
}

//! ユーティリティモジュール
//!
//! 各種ユーティリティ機能を提供します。

pub mod time;
pub mod logging;

/// パス関連のユーティリティ
pub mod path {
    use std::path::{Path, PathBuf};

    /// アプリケーションディレクトリ名
    pub const APP_DIR_NAME: &str = "remote-input-rs";

    /// 設定ディレクトリを取得
    pub fn get_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    /// 既定の設定ファイルパスを取得
    pub fn default_config_file(file_name: &str) -> PathBuf {
        get_config_dir().join(file_name)
    }

    /// 既定のログファイルパスを取得
    pub fn default_log_file(file_name: &str) -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("logs")
            .join(file_name)
    }

    /// パスが存在するか確認し、ディレクトリなら作成
    pub fn ensure_dir_exists(path: &Path) -> std::io::Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        } else if !path.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Path exists but is not a directory: {:?}", path),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_paths_end_with_app_dir() {
            assert!(get_config_dir().ends_with(APP_DIR_NAME));
            assert!(default_config_file("engine.toml").ends_with("remote-input-rs/engine.toml"));
            assert!(default_log_file("engine.log").ends_with("logs/engine.log"));
        }

        #[test]
        fn test_ensure_dir_exists() {
            let dir = tempfile::tempdir().unwrap();
            let nested = dir.path().join("a").join("b");
            ensure_dir_exists(&nested).unwrap();
            assert!(nested.is_dir());

            let file = dir.path().join("file");
            std::fs::write(&file, b"x").unwrap();
            assert!(ensure_dir_exists(&file).is_err());
        }
    }
}

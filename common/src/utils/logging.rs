//! ロギング機能
//!
//! `log` ファサードのバックエンドとして `env_logger` を初期化します。
//! ログファイルが指定された場合はファイルに書き出します。

use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

/// ログレベル
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// トレース情報
    Trace,
    /// デバッグ情報
    Debug,
    /// 一般情報
    Info,
    /// 警告
    Warn,
    /// エラー
    Error,
}

impl LogLevel {
    /// ログレベルを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// `log` クレートのフィルタに変換
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" | "ERR" => Ok(LogLevel::Error),
            other => Err(format!("未知のログレベル: {}", other)),
        }
    }
}

/// ロガーを初期化
///
/// `RUST_LOG` が設定されている場合はそちらが優先されます。
/// 二度目以降の呼び出しはエラーを返さずに無視されます。
pub fn init_logger(level: LogLevel, log_file: Option<&Path>) -> io::Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.as_str()),
    );

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        // ディレクトリが存在しない場合は作成
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    if builder.try_init().is_err() {
        log::debug!("ロガーは既に初期化されています");
    }

    Ok(())
}

/// パニック時のログ記録ハンドラーを設定
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let message = match panic_info.payload().downcast_ref::<&str>() {
            Some(s) => *s,
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(s) => s.as_str(),
                None => "Unknown panic payload",
            },
        };

        let location = match panic_info.location() {
            Some(loc) => format!(" at {}:{}", loc.file(), loc.line()),
            None => String::new(),
        };

        eprintln!("Panic: {}{}", message, location);
        log::error!("Panic: {}{}", message, location);
    }));
}

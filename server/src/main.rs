//! リモート入力サーバーエントリポイント
//!
//! 設定ファイルとコマンドライン引数からエンジンを起動します。

use anyhow::Context;
use clap::Parser;
use remote_input_rs_common::utils::logging::{self, LogLevel};
use remote_input_rs_common::WireFormat;
use remote_input_rs_server::EngineSettings;
use std::path::PathBuf;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "remote-input-server", version, about = "リモート入力合成エンジン")]
struct Args {
    /// 設定ファイル（.toml / .json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// バインドアドレス
    #[arg(long)]
    bind: Option<String>,

    /// ポート番号
    #[arg(short, long)]
    port: Option<u16>,

    /// ワイヤ形式（binary / json）
    #[arg(short, long)]
    format: Option<WireFormat>,

    /// ビューポートの幅
    #[arg(long)]
    width: Option<u32>,

    /// ビューポートの高さ
    #[arg(long)]
    height: Option<u32>,

    /// フレームレート
    #[arg(long)]
    fps: Option<u32>,

    /// 指定フレーム数で終了
    #[arg(long)]
    frames: Option<u64>,

    /// 詳細ログを出力
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// 引数で設定を上書き
    fn apply(&self, settings: &mut EngineSettings) {
        if let Some(bind) = &self.bind {
            settings.network.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            settings.network.port = port;
        }
        if let Some(format) = self.format {
            settings.input.wire_format = format;
        }
        if let Some(width) = self.width {
            settings.display.width = width;
        }
        if let Some(height) = self.height {
            settings.display.height = height;
        }
        if let Some(fps) = self.fps {
            settings.display.fps = fps;
        }
        if self.verbose {
            settings.logging.level = LogLevel::Debug.as_str().to_string();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = EngineSettings::load(args.config.as_deref())
        .context("設定ファイルの読み込みに失敗しました")?;
    args.apply(&mut settings);
    settings.validate().context("設定値が不正です")?;

    // ロガーを初期化
    logging::init_logger(settings.logging.level()?, settings.logging.file.as_deref())
        .context("ロガーの初期化に失敗しました")?;
    // パニックハンドラを設定（未処理のパニックをログに記録）
    logging::set_panic_hook();

    log::info!(
        "リモート入力サーバー v{} ({})",
        env!("CARGO_PKG_VERSION"),
        remote_input_rs_common::get_platform_name()
    );

    let target = settings.network.bind_target();
    remote_input_rs_server::run(settings, args.frames)
        .with_context(|| format!("サーバーの実行に失敗しました ({})", target))?;

    Ok(())
}

//! リモート入力コントローラーエントリポイント
//!
//! エンジンへ接続し、ランダム操作のアクションを一定間隔で送ります。

use anyhow::Context;
use clap::Parser;
use remote_input_rs_client::{ControllerConnection, ControllerSettings, RandomPolicy};
use remote_input_rs_common::utils::logging::{self, LogLevel};
use remote_input_rs_common::WireFormat;
use std::path::PathBuf;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "remote-input-controller", version, about = "リモート入力コントローラー")]
struct Args {
    /// 設定ファイル（.toml / .json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 接続先ホスト
    #[arg(long)]
    host: Option<String>,

    /// ポート番号
    #[arg(short, long)]
    port: Option<u16>,

    /// ワイヤ形式（binary / json）
    #[arg(short, long)]
    format: Option<WireFormat>,

    /// 一秒あたりの送信数
    #[arg(short, long)]
    rate: Option<u32>,

    /// 送信数
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// 乱数シード
    #[arg(long)]
    seed: Option<u64>,

    /// 詳細ログを出力
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// 引数で設定を上書き
    fn apply(&self, settings: &mut ControllerSettings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(format) = self.format {
            settings.send.wire_format = format;
        }
        if let Some(rate) = self.rate {
            settings.send.rate = rate;
        }
        if self.count.is_some() {
            settings.send.count = self.count;
        }
        if self.seed.is_some() {
            settings.policy.seed = self.seed;
        }
        if self.verbose {
            settings.logging.level = LogLevel::Debug.as_str().to_string();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = ControllerSettings::load(args.config.as_deref())
        .context("設定ファイルの読み込みに失敗しました")?;
    args.apply(&mut settings);
    settings.validate().context("設定値が不正です")?;

    logging::init_logger(settings.logging.level()?, settings.logging.file.as_deref())
        .context("ロガーの初期化に失敗しました")?;
    logging::set_panic_hook();

    log::info!(
        "リモート入力コントローラー v{} ({})",
        env!("CARGO_PKG_VERSION"),
        remote_input_rs_common::get_platform_name()
    );

    let address = settings.server.address();
    let mut conn = ControllerConnection::connect(
        &address,
        settings.server.connect_timeout(),
        settings.send.wire_format,
    )
    .with_context(|| format!("{} に接続できませんでした", address))?;

    let policy = &settings.policy;
    let mut source = RandomPolicy::new(policy.seed, policy.max_mouse_x, policy.max_mouse_y)
        .with_press_probability(policy.press_probability);

    remote_input_rs_client::drive(&mut conn, &mut source, settings.send.rate, settings.send.count)
        .context("アクションの送信に失敗しました")?;
    conn.close();

    Ok(())
}

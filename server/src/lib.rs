//! リモート入力合成エンジンライブラリ
//!
//! このクレートは、外部コントローラーから届くアクションメッセージを
//! ポーリング可能な入力状態と合成 UI イベントに変換するエンジンを提供します。

pub mod app;
pub mod config;
pub mod error;
pub mod input;
pub mod network;

pub use app::App;
pub use config::EngineSettings;
pub use error::ServerError;
pub use input::{InputQuery, RemoteInputEngine, StepOutcome};
pub use network::{NetworkError, Transport};

/// 設定を読み込んでアプリケーションを実行
pub fn run(settings: EngineSettings, max_frames: Option<u64>) -> Result<(), ServerError> {
    let mut app = App::new(settings)?;
    app.run(max_frames)
}

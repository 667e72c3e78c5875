//! リモート入力共通ライブラリ
//!
//! このクレートは、リモート入力エンジン（ホスト側）とコントローラの
//! 両方で使用される共通の機能を提供します。
//! アクションのデータモデル、ワイヤ形式のコーデック、論理キーの定義、
//! ストリームのフレーミング、設定ファイルの読み書きを含みます。

pub mod config;
pub mod error;
pub mod framing;
pub mod keys;
pub mod protocol;
pub mod utils;
pub mod wire;

// 主要コンポーネントを再エクスポート
pub use error::{CommonError, DecodeError, Result};
pub use keys::{KeyBindings, KeyCode, KeyCodeResolver, LogicalKey};
pub use protocol::{AbsentKeyPolicy, Action, ActionDecoder, KeyEntry, KeyEventType, WireFormat};

/// ライブラリのバージョン
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// プラットフォーム名を取得
pub fn get_platform_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "Windows"
    } else if cfg!(target_os = "macos") {
        "macOS"
    } else if cfg!(target_os = "linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

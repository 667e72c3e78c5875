//! 入力処理モジュール
//!
//! コントローラーから受信したアクションを入力状態に反映し、
//! 必要に応じてホストの UI イベントを合成します。

pub mod engine;
pub mod focus;
pub mod keyboard;
pub mod mouse;
pub mod query;
pub mod system;

pub use engine::{
    EngineStats, OverlayQuery, RemoteInputEngine, StepOutcome, StepReport, ViewportQuery,
};
pub use focus::FocusMode;
pub use keyboard::{KeyEdge, KeyState, KeyStateTable};
pub use mouse::Viewport;
pub use query::InputQuery;
pub use system::{HostEventSink, MouseEventKind, SynthesizedEvent};

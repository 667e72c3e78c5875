//! ホストアプリケーション
//!
//! エンジンを固定フレームレートで回すヘッドレスなホストを実装します。
//! ビューポートとオーバーレイは設定とキー入力から模擬し、
//! 合成イベントはログに出力します。

use crate::config::EngineSettings;
use crate::error::Result;
use crate::input::{
    FocusMode, HostEventSink, InputQuery, OverlayQuery, RemoteInputEngine, StepOutcome,
    SynthesizedEvent, Viewport, ViewportQuery,
};
use crate::network::{ActionQueue, ThreadedTransport, TcpTransport, Transport};

use log::{debug, info};
use remote_input_rs_common::keys::{KeyBindings, KeyCode, KeyCodeResolver, LogicalKey};
use remote_input_rs_common::utils::time::FramePacer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// アプリケーション状態
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum AppState {
    /// 準備完了
    Ready,
    /// 実行中
    Running,
    /// 終了中
    ShuttingDown,
}

/// 合成イベントをログに出力するシンク
#[derive(Debug, Default)]
pub struct HeadlessSink {
    blocked: bool,
    pending: Vec<SynthesizedEvent>,
}

impl HeadlessSink {
    /// ホスト入力が遮断されているか
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// まだホストが処理していないイベントを取り出す
    pub fn take_pending(&mut self) -> Vec<SynthesizedEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl HostEventSink for HeadlessSink {
    fn set_input_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    fn deliver(&mut self, event: SynthesizedEvent) {
        info!("合成イベント: {:?}", event);
        self.pending.push(event);
    }
}

/// ヘッドレスなホスト
///
/// `inventory` がポーリング中に押されるとオーバーレイを開き、
/// 注入中に esc か inventory の押下イベントが届くと閉じます。
#[derive(Debug)]
pub struct HeadlessHost {
    viewport: Viewport,
    overlay: bool,
    close_keys: [KeyCode; 2],
}

impl HeadlessHost {
    /// 新しいホストを作成
    pub fn new(viewport: Viewport, bindings: &KeyBindings) -> Self {
        Self {
            viewport,
            overlay: false,
            close_keys: [
                bindings.resolve(LogicalKey::Esc),
                bindings.resolve(LogicalKey::Inventory),
            ],
        }
    }

    /// オーバーレイを開く
    pub fn open_overlay(&mut self) {
        if !self.overlay {
            info!("オーバーレイを開きます");
            self.overlay = true;
        }
    }

    /// オーバーレイを閉じる
    pub fn close_overlay(&mut self) {
        if self.overlay {
            info!("オーバーレイを閉じます");
            self.overlay = false;
        }
    }

    /// 合成イベントに反応する
    pub fn handle_events(&mut self, events: &[SynthesizedEvent]) {
        for event in events {
            if let SynthesizedEvent::Key {
                key_code,
                is_down: true,
            } = event
            {
                if self.close_keys.contains(key_code) {
                    self.close_overlay();
                }
            }
        }
    }
}

impl ViewportQuery for HeadlessHost {
    fn current_viewport_size(&self) -> Viewport {
        self.viewport
    }
}

impl OverlayQuery for HeadlessHost {
    fn is_overlay_active(&self) -> bool {
        self.overlay
    }
}

/// アプリケーション
pub struct App {
    state: AppState,
    settings: EngineSettings,
    engine: RemoteInputEngine<HeadlessSink>,
    host: HeadlessHost,
    transport: Box<dyn Transport>,
    shutdown: Arc<AtomicBool>,
}

impl App {
    /// 設定からトランスポートを作成してアプリケーションを初期化
    ///
    /// バインドに失敗した場合は初期化を中止します。
    pub fn new(settings: EngineSettings) -> Result<Self> {
        settings.validate()?;

        let tcp = TcpTransport::bind(
            &settings.network.bind_target(),
            settings.network.max_frame_size,
        )?
        .with_backlog(settings.queue.capacity, settings.queue.overflow);

        let transport: Box<dyn Transport> = if settings.queue.enabled {
            info!(
                "受信スレッドを使用します (容量 {}, {:?})",
                settings.queue.capacity, settings.queue.overflow
            );
            let queue = Arc::new(ActionQueue::new(
                settings.queue.capacity,
                settings.queue.overflow,
            ));
            Box::new(ThreadedTransport::spawn(tcp, queue)?)
        } else {
            Box::new(tcp)
        };

        Ok(Self::with_transport(settings, transport))
    }

    /// トランスポートを指定して作成
    pub fn with_transport(settings: EngineSettings, transport: Box<dyn Transport>) -> Self {
        let bindings = settings.input.key_bindings();
        let host = HeadlessHost::new(settings.display.viewport(), &bindings);
        let engine = RemoteInputEngine::new(
            settings.input.wire_format,
            bindings,
            HeadlessSink::default(),
        );

        info!(
            "エンジン初期化: 形式 {}, ビューポート {}x{}",
            settings.input.wire_format, settings.display.width, settings.display.height
        );

        Self {
            state: AppState::Ready,
            settings,
            engine,
            host,
            transport,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 外部から終了を要求するためのフラグ
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// アプリケーション状態を取得
    pub fn get_state(&self) -> AppState {
        self.state
    }

    /// エンジンへの参照
    pub fn engine(&self) -> &RemoteInputEngine<HeadlessSink> {
        &self.engine
    }

    /// ホストへの参照
    pub fn host(&self) -> &HeadlessHost {
        &self.host
    }

    /// 1 フレーム進める
    pub fn frame(&mut self) -> StepOutcome {
        let outcome = self.engine.step(&mut self.transport, &self.host);

        let events = self.engine.sink_mut().take_pending();
        self.host.handle_events(&events);

        if self.engine.mode() == FocusMode::Polling {
            self.consume_polled_input();
        }

        // フレームの終わりにエッジをクリア
        self.engine.clear_was_key_pressed();
        self.engine.clear_was_key_released();

        outcome
    }

    /// ゲームループ相当の読み出し
    fn consume_polled_input(&mut self) {
        for key in LogicalKey::ALL {
            if self.engine.was_key_pressed(key) {
                debug!("押下: {}", key);
            }
        }

        if self.engine.was_key_pressed(LogicalKey::Inventory) {
            self.host.open_overlay();
        }

        if self.engine.was_key_down(LogicalKey::Esc) {
            info!("キャンセルが押されました");
        }

        let speed = self.engine.movement_speed();
        if speed > 0.0 {
            debug!(
                "移動: 速度 {:.1}, 方向 {:.3} rad",
                speed,
                self.engine.movement_direction()
            );
        }
    }

    /// アプリケーションを実行
    ///
    /// `max_frames` が指定された場合はそのフレーム数で終了します。
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<()> {
        self.state = AppState::Running;
        let mut pacer = FramePacer::from_rate(self.settings.display.fps);
        info!("メインループ開始: {} fps", self.settings.display.fps);

        while !self.shutdown.load(Ordering::Acquire) {
            if let Some(limit) = max_frames {
                if pacer.frames() >= limit {
                    break;
                }
            }
            self.frame();
            pacer.wait();
        }

        self.state = AppState::ShuttingDown;
        let stats = self.engine.stats();
        info!(
            "アプリケーションを終了します: ステップ {}, 待機 {}, デコード失敗 {}, 未解決キー {}, 遷移 {}, 合成イベント {}",
            stats.steps,
            stats.idle_steps,
            stats.decode_errors,
            stats.unresolved_keys,
            stats.transitions,
            stats.synthesized_events
        );

        Ok(())
    }
}

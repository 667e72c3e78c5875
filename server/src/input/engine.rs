//! リモート入力合成エンジン
//!
//! 受信したアクションを一つずつ取り込み、ポーリング用の入力状態を更新し、
//! オーバーレイがフォーカスを持っている間は UI イベントを合成します。
//!
//! エンジンは呼び出し側のフレームループが排他的に所有し、
//! [`RemoteInputEngine::step`] を一フレームに一度呼び出します。

use remote_input_rs_common::error::DecodeError;
use remote_input_rs_common::keys::{KeyBindings, KeyCodeResolver, LogicalKey};
use remote_input_rs_common::protocol::ActionDecoder;
use remote_input_rs_common::WireFormat;

use super::focus::{FocusMode, FocusSwitch};
use super::keyboard::{KeyEdge, KeyStateTable};
use super::mouse::{MouseTracker, Viewport};
use super::query::{self, InputQuery};
use super::system::{EventSynthesizer, HostEventSink, PointerSnapshot};
use crate::network::Transport;

/// ビューポートの大きさの問い合わせ
pub trait ViewportQuery {
    /// 現在のビューポートの大きさ
    fn current_viewport_size(&self) -> Viewport;
}

/// オーバーレイの問い合わせ
pub trait OverlayQuery {
    /// モーダルなオーバーレイが表示されているか
    fn is_overlay_active(&self) -> bool;
}

/// エンジン統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// メッセージを取り込んだステップ数
    pub steps: u64,
    /// メッセージが無かったステップ数
    pub idle_steps: u64,
    /// デコードに失敗したメッセージ数
    pub decode_errors: u64,
    /// サポート外のキー指定の数
    pub unresolved_keys: u64,
    /// フォーカスモード遷移の数
    pub transitions: u64,
    /// 合成したイベント数
    pub synthesized_events: u64,
}

/// 取り込んだステップの内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// このステップのモード
    pub mode: FocusMode,
    /// モード遷移ステップかどうか
    pub transitioned: bool,
    /// 発生したキーのエッジ
    pub edges: Vec<(LogicalKey, KeyEdge)>,
    /// 無視したキー名
    pub unresolved: Vec<String>,
    /// 合成したイベント数
    pub events: usize,
}

/// ステップの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// メッセージが無く、状態は変わらない
    Idle,
    /// デコードに失敗し、ステップ全体を破棄した
    Rejected(DecodeError),
    /// メッセージを取り込んだ
    Applied(StepReport),
}

/// リモート入力合成エンジン
pub struct RemoteInputEngine<S: HostEventSink> {
    decoder: Box<dyn ActionDecoder>,
    resolver: Box<dyn KeyCodeResolver>,
    keys: KeyStateTable,
    mouse: MouseTracker,
    focus: FocusSwitch,
    synthesizer: EventSynthesizer<S>,
    /// 外部から与えられた移動方向
    movement_direction: f32,
    stats: EngineStats,
}

impl<S: HostEventSink> RemoteInputEngine<S> {
    /// ワイヤ形式とキーバインドを指定して作成
    pub fn new(format: WireFormat, bindings: KeyBindings, sink: S) -> Self {
        Self::with_parts(Box::new(format), Box::new(bindings), sink)
    }

    /// デコーダーとキーコード解決を差し替えて作成
    pub fn with_parts(
        decoder: Box<dyn ActionDecoder>,
        resolver: Box<dyn KeyCodeResolver>,
        sink: S,
    ) -> Self {
        Self {
            decoder,
            resolver,
            keys: KeyStateTable::new(),
            mouse: MouseTracker::new(),
            focus: FocusSwitch::new(),
            synthesizer: EventSynthesizer::new(sink),
            movement_direction: 0.0,
            stats: EngineStats::default(),
        }
    }

    /// トランスポートから一つ受信してステップを進める
    ///
    /// 受信エラーはメッセージ無しとして扱います。
    pub fn step<T, H>(&mut self, transport: &mut T, host: &H) -> StepOutcome
    where
        T: Transport + ?Sized,
        H: ViewportQuery + OverlayQuery + ?Sized,
    {
        let message = match transport.try_receive() {
            Ok(message) => message,
            Err(e) => {
                log::warn!("受信に失敗しました: {}", e);
                None
            }
        };
        self.step_with(message.as_deref(), host)
    }

    /// 受信済みのメッセージでステップを進める
    pub fn step_with<H>(&mut self, message: Option<&[u8]>, host: &H) -> StepOutcome
    where
        H: ViewportQuery + OverlayQuery + ?Sized,
    {
        self.synthesizer.block_input();

        let Some(bytes) = message else {
            self.stats.idle_steps += 1;
            return StepOutcome::Idle;
        };

        let action = match self.decoder.decode(bytes) {
            Ok(action) => action,
            Err(e) => {
                self.stats.decode_errors += 1;
                log::warn!("アクションのデコードに失敗したためステップを破棄します: {}", e);
                return StepOutcome::Rejected(e);
            }
        };
        self.stats.steps += 1;

        let viewport = host.current_viewport_size();
        let latch = self.focus.latch(host.is_overlay_active());

        if latch.transitioned {
            self.stats.transitions += 1;
            self.keys.clear_all();
            self.mouse.recenter(viewport);
            log::debug!(
                "モード遷移 ({}): キー状態をクリアしマウスを {:?} に戻しました",
                latch.mode,
                self.mouse.position()
            );
            return StepOutcome::Applied(StepReport {
                mode: latch.mode,
                transitioned: true,
                edges: Vec::new(),
                unresolved: Vec::new(),
                events: 0,
            });
        }

        let application = self.keys.apply_action(&action);
        self.stats.unresolved_keys += application.unresolved.len() as u64;

        let before = self.mouse.position();
        let (dx, dy) = action.mouse_delta();
        let clamp_to = latch.mode.is_injecting().then_some(viewport);
        self.mouse.apply_delta(dx, dy, clamp_to);

        let mut events = 0;
        if latch.mode.is_injecting() {
            let pointer = PointerSnapshot {
                before,
                after: self.mouse.position(),
                moved: dx != 0 || dy != 0,
                button_mask: self.keys.button_mask(),
            };
            events = self
                .synthesizer
                .synthesize(&application.edges, self.resolver.as_ref(), pointer);
            self.stats.synthesized_events += events as u64;
        }

        log::debug!(
            "ステップ ({}): エッジ {} 件, マウス {:?}, 合成イベント {} 件",
            latch.mode,
            application.edges.len(),
            self.mouse.position(),
            events
        );

        StepOutcome::Applied(StepReport {
            mode: latch.mode,
            transitioned: false,
            edges: application.edges,
            unresolved: application.unresolved,
            events,
        })
    }

    /// 現在のフォーカスモード
    pub fn mode(&self) -> FocusMode {
        self.focus.mode()
    }

    /// キー状態テーブル
    pub fn keys(&self) -> &KeyStateTable {
        &self.keys
    }

    /// 統計
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// マウスボタン集約（dig=1, place=2, middle=4）
    pub fn button_mask(&self) -> u32 {
        self.keys.button_mask()
    }

    /// マウス位置を設定
    pub fn set_mouse_pos(&mut self, x: i32, y: i32) {
        self.mouse.set_position(x, y);
    }

    /// 移動キーが押されていないときの移動方向を設定
    pub fn set_movement_direction(&mut self, radians: f32) {
        self.movement_direction = radians;
    }

    /// イベントシンクへの参照
    pub fn sink(&self) -> &S {
        self.synthesizer.sink()
    }

    /// イベントシンクへの可変参照
    pub fn sink_mut(&mut self) -> &mut S {
        self.synthesizer.sink_mut()
    }
}

impl<S: HostEventSink> InputQuery for RemoteInputEngine<S> {
    fn is_key_down(&self, key: LogicalKey) -> bool {
        self.keys.is_down(key)
    }

    fn was_key_down(&mut self, key: LogicalKey) -> bool {
        self.keys.take_was_down(key)
    }

    fn was_key_pressed(&self, key: LogicalKey) -> bool {
        self.keys.was_pressed(key)
    }

    fn was_key_released(&self, key: LogicalKey) -> bool {
        self.keys.was_released(key)
    }

    fn cancel_pressed(&self) -> bool {
        self.keys.peek_was_down(LogicalKey::Esc)
    }

    fn movement_speed(&self) -> f32 {
        query::movement_speed(&self.keys)
    }

    fn movement_direction(&self) -> f32 {
        query::movement_direction(&self.keys, self.movement_direction)
    }

    fn mouse_pos(&self) -> (i32, i32) {
        self.mouse.position()
    }

    fn mouse_speed(&self) -> (i32, i32) {
        self.mouse.speed()
    }

    fn clear_was_key_pressed(&mut self) {
        self.keys.clear_was_pressed();
    }

    fn clear_was_key_released(&mut self) {
        self.keys.clear_was_released();
    }

    fn clear_input(&mut self) {
        self.keys.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::system::{MouseEventKind, SynthesizedEvent};
    use crate::input::testing::{FakeHost, RecordingSink, SinkCall};
    use remote_input_rs_common::keys::KeyCode;
    use remote_input_rs_common::protocol::{AbsentKeyPolicy, Action};
    use std::collections::VecDeque;
    use std::f32::consts::FRAC_PI_4;

    fn engine(format: WireFormat) -> RemoteInputEngine<RecordingSink> {
        RemoteInputEngine::new(format, KeyBindings::default(), RecordingSink::default())
    }

    fn json(text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }

    fn binary(action: Action) -> Vec<u8> {
        WireFormat::Binary.encode(&action).unwrap()
    }

    fn press(keys: &[(&str, bool)], dx: i32, dy: i32) -> Action {
        keys.iter()
            .fold(Action::new(AbsentKeyPolicy::NoChange), |action, (name, down)| {
                action.with_key(*name, *down)
            })
            .with_mouse(dx, dy)
    }

    #[test]
    fn test_scenario_polling_movement() {
        let mut engine = engine(WireFormat::Json);
        let host = FakeHost::new(800, 600);

        engine.step_with(Some(&json(r#"{"forward": 1, "left": 0, "mouse": [5, 0]}"#)), &host);
        assert!(engine.is_key_down(LogicalKey::Forward));
        assert!(engine.movement_direction().abs() < 1e-6);
        assert_eq!(engine.mouse_pos(), (5, 0));

        engine.step_with(Some(&json(r#"{"forward": 1, "left": 1}"#)), &host);
        assert_eq!(engine.movement_speed(), 1.0);
        assert!((engine.movement_direction() + FRAC_PI_4).abs() < 1e-6);

        engine.step_with(Some(&json(r#"{"forward": 0, "left": 0}"#)), &host);
        assert_eq!(engine.movement_speed(), 0.0);

        // ポーリング中はイベントを合成しない
        assert!(engine.sink().events().is_empty());
    }

    #[test]
    fn test_scenario_overlay_activation() {
        let mut engine = engine(WireFormat::Binary);
        let mut host = FakeHost::new(800, 600);

        engine.step_with(Some(&binary(press(&[("jump", true)], 7, 9))), &host);
        assert!(engine.was_key_pressed(LogicalKey::Jump));

        host.overlay = true;
        let outcome = engine.step_with(
            Some(&binary(press(&[("dig", true), ("esc", true)], 50, 50))),
            &host,
        );

        match outcome {
            StepOutcome::Applied(report) => {
                assert!(report.transitioned);
                assert_eq!(report.mode, FocusMode::Injecting);
                assert_eq!(report.events, 0);
            }
            other => panic!("予期しない結果: {:?}", other),
        }
        assert!(engine.sink().events().is_empty());
        assert_eq!(engine.mouse_pos(), (400, 300));
        assert_eq!(engine.mouse_speed(), (0, 0));
        for key in LogicalKey::ALL {
            assert_eq!(engine.keys().get(key), Default::default(), "{}", key);
        }
    }

    #[test]
    fn test_transition_back_to_polling_also_resets() {
        let mut engine = engine(WireFormat::Binary);
        let mut host = FakeHost::new(640, 480);
        host.overlay = true;
        engine.step_with(Some(&binary(press(&[], 0, 0))), &host);
        engine.step_with(Some(&binary(press(&[("sneak", true)], 1000, 1000))), &host);
        assert_eq!(engine.mouse_pos(), (639, 479));

        host.overlay = false;
        engine.step_with(Some(&binary(press(&[("jump", true)], 3, 3))), &host);
        assert_eq!(engine.mode(), FocusMode::Polling);
        assert_eq!(engine.mouse_pos(), (320, 240));
        assert!(!engine.is_key_down(LogicalKey::Sneak));
        // 遷移ステップのキー指定は適用されない
        assert!(!engine.is_key_down(LogicalKey::Jump));
        assert_eq!(engine.stats().transitions, 2);
    }

    #[test]
    fn test_injecting_synthesizes_in_order() {
        let mut engine = engine(WireFormat::Binary);
        let mut host = FakeHost::new(800, 600);
        host.overlay = true;
        engine.step_with(Some(&binary(press(&[], 0, 0))), &host);
        engine.sink_mut().calls.clear();

        engine.step_with(
            Some(&binary(press(&[("inventory", true), ("dig", true)], 10, -400))),
            &host,
        );

        let inventory_code = KeyBindings::default().resolve(LogicalKey::Inventory);
        assert_eq!(
            engine.sink().events(),
            vec![
                SynthesizedEvent::Key {
                    key_code: inventory_code,
                    is_down: true,
                },
                SynthesizedEvent::Mouse {
                    x: 400,
                    y: 300,
                    button_mask: 1,
                    kind: MouseEventKind::ButtonDown,
                },
                SynthesizedEvent::Mouse {
                    x: 410,
                    y: 0,
                    button_mask: 1,
                    kind: MouseEventKind::Move,
                },
            ]
        );
        assert_eq!(engine.stats().synthesized_events, 3);
    }

    #[test]
    fn test_json_events_follow_message_order() {
        let mut engine = engine(WireFormat::Json);
        let mut host = FakeHost::new(800, 600);
        host.overlay = true;
        engine.step_with(Some(&json("{}")), &host);

        engine.step_with(Some(&json(r#"{"zoom": 1, "aux1": 1}"#)), &host);

        let bindings = KeyBindings::default();
        assert_eq!(
            engine.sink().events(),
            vec![
                SynthesizedEvent::Key {
                    key_code: bindings.resolve(LogicalKey::Zoom),
                    is_down: true,
                },
                SynthesizedEvent::Key {
                    key_code: bindings.resolve(LogicalKey::Aux1),
                    is_down: true,
                },
            ]
        );
    }

    #[test]
    fn test_held_key_emits_no_event() {
        let mut engine = engine(WireFormat::Json);
        let mut host = FakeHost::new(800, 600);
        host.overlay = true;
        engine.step_with(Some(&json("{}")), &host);

        engine.step_with(Some(&json(r#"{"esc": 1}"#)), &host);
        engine.step_with(Some(&json(r#"{"esc": 1}"#)), &host);
        engine.step_with(Some(&json(r#"{"esc": 0}"#)), &host);

        assert_eq!(
            engine.sink().events(),
            vec![
                SynthesizedEvent::Key {
                    key_code: KeyCode::ESCAPE,
                    is_down: true,
                },
                SynthesizedEvent::Key {
                    key_code: KeyCode::ESCAPE,
                    is_down: false,
                },
            ]
        );
    }

    #[test]
    fn test_clamp_pins_while_injecting() {
        let mut engine = engine(WireFormat::Json);
        let mut host = FakeHost::new(800, 600);
        host.overlay = true;
        engine.step_with(Some(&json("{}")), &host);

        engine.step_with(Some(&json(r#"{"mouse": [-5000, 5000]}"#)), &host);
        assert_eq!(engine.mouse_pos(), (0, 599));
        engine.step_with(Some(&json(r#"{"mouse": [5000, -5000]}"#)), &host);
        assert_eq!(engine.mouse_pos(), (799, 0));
    }

    #[test]
    fn test_polling_is_unclamped() {
        let mut engine = engine(WireFormat::Json);
        let host = FakeHost::new(800, 600);
        engine.step_with(Some(&json(r#"{"mouse": [-5, 9000]}"#)), &host);
        assert_eq!(engine.mouse_pos(), (-5, 9000));
    }

    #[test]
    fn test_decode_error_retains_state() {
        let mut engine = engine(WireFormat::Json);
        let mut host = FakeHost::new(800, 600);
        engine.step_with(Some(&json(r#"{"forward": 1, "mouse": [3, 4]}"#)), &host);
        let keys_before = engine.keys().clone();

        // 壊れたメッセージではモードも評価しない
        host.overlay = true;
        let outcome = engine.step_with(Some(b"{\"forward\": 0, \"mouse\": [1"), &host);
        assert!(matches!(outcome, StepOutcome::Rejected(_)));
        assert_eq!(engine.keys(), &keys_before);
        assert_eq!(engine.mouse_pos(), (3, 4));
        assert_eq!(engine.mode(), FocusMode::Polling);
        assert_eq!(engine.stats().decode_errors, 1);
    }

    #[test]
    fn test_idle_step_is_noop() {
        let mut engine = engine(WireFormat::Json);
        let host = FakeHost::new(800, 600);
        engine.step_with(Some(&json(r#"{"jump": 1, "mouse": [2, 2]}"#)), &host);

        let mut transport: VecDeque<Vec<u8>> = VecDeque::new();
        assert_eq!(engine.step(&mut transport, &host), StepOutcome::Idle);
        assert!(engine.is_key_down(LogicalKey::Jump));
        assert_eq!(engine.mouse_pos(), (2, 2));
        assert_eq!(engine.mouse_speed(), (2, 2));
        assert_eq!(engine.stats().idle_steps, 1);
    }

    #[test]
    fn test_unresolved_keys_do_not_block_rest() {
        let mut engine = engine(WireFormat::Binary);
        let host = FakeHost::new(800, 600);
        let outcome = engine.step_with(
            Some(&binary(press(&[("chat", true), ("drop", true)], 0, 0))),
            &host,
        );

        match outcome {
            StepOutcome::Applied(report) => assert_eq!(report.unresolved, vec!["chat"]),
            other => panic!("予期しない結果: {:?}", other),
        }
        assert!(engine.is_key_down(LogicalKey::Drop));
        assert_eq!(engine.stats().unresolved_keys, 1);
    }

    #[test]
    fn test_sticky_was_down_through_engine() {
        let mut engine = engine(WireFormat::Binary);
        let host = FakeHost::new(800, 600);
        engine.step_with(Some(&binary(press(&[("esc", true)], 0, 0))), &host);

        for _ in 0..3 {
            assert!(engine.is_key_down(LogicalKey::Esc));
            assert!(engine.cancel_pressed());
        }
        assert!(engine.was_key_down(LogicalKey::Esc));
        assert!(!engine.was_key_down(LogicalKey::Esc));
        assert!(!engine.cancel_pressed());
    }

    #[test]
    fn test_input_blocked_every_step() {
        let mut engine = engine(WireFormat::Binary);
        let host = FakeHost::new(800, 600);
        engine.step_with(None, &host);
        engine.step_with(Some(&binary(press(&[], 0, 0))), &host);
        assert_eq!(
            engine.sink().calls,
            vec![SinkCall::Blocked(true), SinkCall::Blocked(true)]
        );
    }

    #[test]
    fn test_movement_direction_fallback() {
        let mut engine = engine(WireFormat::Binary);
        engine.set_movement_direction(1.5);
        assert_eq!(engine.movement_direction(), 1.5);
        engine.set_mouse_pos(12, 34);
        assert_eq!(engine.mouse_pos(), (12, 34));
    }

    #[test]
    fn test_bulk_clears() {
        let mut engine = engine(WireFormat::Binary);
        let host = FakeHost::new(800, 600);
        engine.step_with(Some(&binary(press(&[("dig", true), ("zoom", true)], 0, 0))), &host);
        engine.step_with(Some(&binary(press(&[("zoom", false)], 0, 0))), &host);
        assert_eq!(engine.button_mask(), 1);

        engine.clear_was_key_pressed();
        assert!(!engine.was_key_pressed(LogicalKey::Dig));
        assert!(engine.was_key_released(LogicalKey::Zoom));
        engine.clear_was_key_released();
        assert!(!engine.was_key_released(LogicalKey::Zoom));

        engine.clear_input();
        assert!(!engine.is_key_down(LogicalKey::Dig));
        assert_eq!(engine.button_mask(), 0);
    }
}

//! イベント合成
//!
//! イベント注入モードでキーのエッジとマウス移動を離散的な UI イベントに変換し、
//! ホストのイベントシンクへ渡します。
//! シンクの実装（ウィンドウシステムへの投入など）はホスト側の責務です。

use remote_input_rs_common::keys::{KeyCode, KeyCodeResolver, LogicalKey};

use super::keyboard::KeyEdge;

/// マウスイベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    /// 移動
    Move,
    /// ボタン押下
    ButtonDown,
    /// ボタン解放
    ButtonUp,
}

/// 合成イベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesizedEvent {
    /// キーイベント
    Key {
        /// キーコード
        key_code: KeyCode,
        /// 押下かどうか
        is_down: bool,
    },
    /// マウスイベント
    Mouse {
        /// X 座標
        x: i32,
        /// Y 座標
        y: i32,
        /// ボタン集約
        button_mask: u32,
        /// 種別
        kind: MouseEventKind,
    },
}

/// ホストのイベントシンク
///
/// 受け取ったイベントの順序は保たれるものとします。
pub trait HostEventSink {
    /// ホスト自身の入力デバイスからの入力を遮断するかどうか
    fn set_input_blocked(&mut self, blocked: bool);

    /// イベントを渡す
    fn deliver(&mut self, event: SynthesizedEvent);
}

impl<S: HostEventSink + ?Sized> HostEventSink for &mut S {
    fn set_input_blocked(&mut self, blocked: bool) {
        (**self).set_input_blocked(blocked)
    }

    fn deliver(&mut self, event: SynthesizedEvent) {
        (**self).deliver(event)
    }
}

impl<S: HostEventSink + ?Sized> HostEventSink for Box<S> {
    fn set_input_blocked(&mut self, blocked: bool) {
        (**self).set_input_blocked(blocked)
    }

    fn deliver(&mut self, event: SynthesizedEvent) {
        (**self).deliver(event)
    }
}

/// 合成時のポインタ情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSnapshot {
    /// 移動量適用前の位置（ボタンイベントに使う）
    pub before: (i32, i32),
    /// 移動量適用後（クランプ済み）の位置
    pub after: (i32, i32),
    /// このステップで移動量が 0 でなかったか
    pub moved: bool,
    /// 現在のボタン集約
    pub button_mask: u32,
}

/// イベント合成器
#[derive(Debug)]
pub struct EventSynthesizer<S> {
    sink: S,
}

impl<S: HostEventSink> EventSynthesizer<S> {
    /// シンクを受け取って作成
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// シンクへの参照
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// シンクへの可変参照
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// ホストの入力を遮断
    pub fn block_input(&mut self) {
        self.sink.set_input_blocked(true);
    }

    /// イベントを一つ渡す
    ///
    /// 渡している間だけ入力遮断を解除し、戻るときに必ず遮断し直します。
    pub fn emit(&mut self, event: SynthesizedEvent) {
        self.sink.set_input_blocked(false);
        let mut sink = scopeguard::guard(&mut self.sink, |sink| sink.set_input_blocked(true));
        sink.deliver(event);
    }

    /// エッジとマウス移動からイベントを合成して渡す
    ///
    /// キーとボタンのイベントをエッジの順に渡し、移動があれば最後に
    /// 移動イベントを一つ渡します。渡したイベント数を返します。
    pub fn synthesize(
        &mut self,
        edges: &[(LogicalKey, KeyEdge)],
        resolver: &dyn KeyCodeResolver,
        pointer: PointerSnapshot,
    ) -> usize {
        let mut count = 0;

        for (key, edge) in edges {
            let event = if key.is_mouse_button() {
                SynthesizedEvent::Mouse {
                    x: pointer.before.0,
                    y: pointer.before.1,
                    button_mask: pointer.button_mask,
                    kind: if edge.is_down() {
                        MouseEventKind::ButtonDown
                    } else {
                        MouseEventKind::ButtonUp
                    },
                }
            } else {
                SynthesizedEvent::Key {
                    key_code: resolver.resolve(*key),
                    is_down: edge.is_down(),
                }
            };
            log::trace!("合成イベント: {} {:?}", key, event);
            self.emit(event);
            count += 1;
        }

        if pointer.moved {
            self.emit(SynthesizedEvent::Mouse {
                x: pointer.after.0,
                y: pointer.after.1,
                button_mask: pointer.button_mask,
                kind: MouseEventKind::Move,
            });
            count += 1;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::testing::{RecordingSink, SinkCall};
    use remote_input_rs_common::keys::KeyBindings;

    fn pointer(moved: bool) -> PointerSnapshot {
        PointerSnapshot {
            before: (10, 20),
            after: (15, 20),
            moved,
            button_mask: 1,
        }
    }

    #[test]
    fn test_each_delivery_is_unblocked_individually() {
        let mut synth = EventSynthesizer::new(RecordingSink::default());
        let edges = [
            (LogicalKey::Jump, KeyEdge::Pressed),
            (LogicalKey::Dig, KeyEdge::Pressed),
        ];
        let count = synth.synthesize(&edges, &KeyBindings::default(), pointer(true));
        assert_eq!(count, 3);

        let calls = &synth.sink().calls;
        assert_eq!(calls.len(), 9);
        for chunk in calls.chunks(3) {
            assert_eq!(chunk[0], SinkCall::Blocked(false));
            assert!(matches!(chunk[1], SinkCall::Deliver(_)));
            assert_eq!(chunk[2], SinkCall::Blocked(true));
        }
    }

    #[test]
    fn test_event_shapes_and_order() {
        let mut synth = EventSynthesizer::new(RecordingSink::default());
        let edges = [
            (LogicalKey::Esc, KeyEdge::Pressed),
            (LogicalKey::Place, KeyEdge::Released),
        ];
        synth.synthesize(&edges, &KeyBindings::default(), pointer(true));

        assert_eq!(
            synth.sink().events(),
            vec![
                SynthesizedEvent::Key {
                    key_code: KeyCode::ESCAPE,
                    is_down: true,
                },
                SynthesizedEvent::Mouse {
                    x: 10,
                    y: 20,
                    button_mask: 1,
                    kind: MouseEventKind::ButtonUp,
                },
                SynthesizedEvent::Mouse {
                    x: 15,
                    y: 20,
                    button_mask: 1,
                    kind: MouseEventKind::Move,
                },
            ]
        );
    }

    #[test]
    fn test_no_move_event_without_delta() {
        let mut synth = EventSynthesizer::new(RecordingSink::default());
        assert_eq!(synth.synthesize(&[], &KeyBindings::default(), pointer(false)), 0);
        assert!(synth.sink().calls.is_empty());
    }

    #[test]
    fn test_block_restored_when_sink_panics() {
        struct PanickingSink<'a>(&'a mut Vec<bool>);

        impl HostEventSink for PanickingSink<'_> {
            fn set_input_blocked(&mut self, blocked: bool) {
                self.0.push(blocked);
            }

            fn deliver(&mut self, _event: SynthesizedEvent) {
                panic!("ホストが拒否しました");
            }
        }

        let mut blocked = Vec::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut synth = EventSynthesizer::new(PanickingSink(&mut blocked));
            synth.emit(SynthesizedEvent::Key {
                key_code: KeyCode(0x20),
                is_down: true,
            });
        }));

        assert!(result.is_err());
        assert_eq!(blocked, vec![false, true]);
    }
}

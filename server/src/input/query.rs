//! 入力問い合わせ
//!
//! ポーリングモードのフレームループが毎フレーム読む API です。

use remote_input_rs_common::keys::LogicalKey;

use super::keyboard::KeyStateTable;

/// 入力問い合わせ
pub trait InputQuery {
    /// 押されているかどうか
    fn is_key_down(&self, key: LogicalKey) -> bool;

    /// 押されたことがあるかを読み出してクリア
    fn was_key_down(&mut self, key: LogicalKey) -> bool;

    /// 押下エッジがあったかどうか（読んでもクリアされない）
    fn was_key_pressed(&self, key: LogicalKey) -> bool;

    /// 解放エッジがあったかどうか（読んでもクリアされない）
    fn was_key_released(&self, key: LogicalKey) -> bool;

    /// キャンセル（esc）が押されたかどうか
    fn cancel_pressed(&self) -> bool;

    /// 移動速度（0.0 または 1.0）
    fn movement_speed(&self) -> f32;

    /// 移動方向（ラジアン）
    fn movement_direction(&self) -> f32;

    /// マウス位置
    fn mouse_pos(&self) -> (i32, i32);

    /// 直近のマウス移動量
    fn mouse_speed(&self) -> (i32, i32);

    /// 全キーの押下エッジをクリア
    fn clear_was_key_pressed(&mut self);

    /// 全キーの解放エッジをクリア
    fn clear_was_key_released(&mut self);

    /// 全キーの状態をクリア
    fn clear_input(&mut self);
}

struct Directional {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
}

impl Directional {
    fn read(keys: &KeyStateTable) -> Self {
        Self {
            forward: keys.is_down(LogicalKey::Forward),
            backward: keys.is_down(LogicalKey::Backward),
            left: keys.is_down(LogicalKey::Left),
            right: keys.is_down(LogicalKey::Right),
        }
    }

    fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// 移動キーから移動速度を求める
///
/// 向かい合うキーだけが押されて打ち消し合う場合は 0.0 です。
pub fn movement_speed(keys: &KeyStateTable) -> f32 {
    let d = Directional::read(keys);
    let cancelled = (d.forward && d.backward && !d.left && !d.right)
        || (!d.forward && !d.backward && d.left && d.right)
        || (d.forward && d.backward && d.left && d.right);

    if d.any() && !cancelled {
        1.0
    } else {
        0.0
    }
}

/// 移動キーから移動方向を求める
///
/// 移動キーが一つも押されていなければ `fallback` を返します。
pub fn movement_direction(keys: &KeyStateTable, fallback: f32) -> f32 {
    let d = Directional::read(keys);
    if !d.any() {
        return fallback;
    }

    let x = f32::from(i8::from(d.right) - i8::from(d.left));
    let z = f32::from(i8::from(d.forward) - i8::from(d.backward));
    x.atan2(z)
}

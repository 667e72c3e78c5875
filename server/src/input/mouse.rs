//! マウス状態の追跡
//!
//! 絶対位置と直近の移動量を保持します。
//! 位置のクランプはイベント注入中だけ行い、ポーリング中は範囲外も許します。

/// ビューポートの大きさ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// 幅
    pub width: u32,
    /// 高さ
    pub height: u32,
}

impl Viewport {
    /// 新しいビューポートを作成
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 中心座標（整数除算）
    pub fn center(&self) -> (i32, i32) {
        (to_coord(self.width / 2), to_coord(self.height / 2))
    }

    /// 座標を `[0, width-1] × [0, height-1]` に収める
    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (
            x.clamp(0, max_coord(self.width)),
            y.clamp(0, max_coord(self.height)),
        )
    }
}

fn to_coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn max_coord(extent: u32) -> i32 {
    to_coord(extent.saturating_sub(1))
}

/// マウス状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseState {
    /// X 座標
    pub x: i32,
    /// Y 座標
    pub y: i32,
    /// 直近の移動量 X
    pub speed_x: i32,
    /// 直近の移動量 Y
    pub speed_y: i32,
}

/// マウス状態トラッカー
#[derive(Debug, Default)]
pub struct MouseTracker {
    state: MouseState,
}

impl MouseTracker {
    /// 原点にあるトラッカーを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在位置
    pub fn position(&self) -> (i32, i32) {
        (self.state.x, self.state.y)
    }

    /// 直近の移動量
    pub fn speed(&self) -> (i32, i32) {
        (self.state.speed_x, self.state.speed_y)
    }

    /// 位置を直接設定
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.state.x = x;
        self.state.y = y;
    }

    /// 移動量を適用
    ///
    /// `clamp_to` が指定された場合は移動後の位置をその範囲に収めます。
    pub fn apply_delta(&mut self, dx: i32, dy: i32, clamp_to: Option<Viewport>) {
        self.state.speed_x = dx;
        self.state.speed_y = dy;

        let mut x = self.state.x.saturating_add(dx);
        let mut y = self.state.y.saturating_add(dy);
        if let Some(viewport) = clamp_to {
            (x, y) = viewport.clamp(x, y);
        }
        self.set_position(x, y);
    }

    /// ビューポート中心に戻し、移動量を 0 にする
    pub fn recenter(&mut self, viewport: Viewport) {
        let (x, y) = viewport.center();
        self.state = MouseState {
            x,
            y,
            speed_x: 0,
            speed_y: 0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclamped_delta_accumulates() {
        let mut mouse = MouseTracker::new();
        mouse.apply_delta(-5, 3, None);
        mouse.apply_delta(-5, 3, None);
        assert_eq!(mouse.position(), (-10, 6));
        assert_eq!(mouse.speed(), (-5, 3));
    }

    #[test]
    fn test_clamp_pins_at_boundary() {
        let viewport = Viewport::new(800, 600);
        let mut mouse = MouseTracker::new();
        mouse.set_position(790, 5);
        mouse.apply_delta(100, -100, Some(viewport));
        assert_eq!(mouse.position(), (799, 0));
        // 速度は入力された移動量のまま
        assert_eq!(mouse.speed(), (100, -100));
    }

    #[test]
    fn test_recenter_uses_integer_division() {
        let mut mouse = MouseTracker::new();
        mouse.apply_delta(3, 3, None);
        mouse.recenter(Viewport::new(801, 599));
        assert_eq!(mouse.position(), (400, 299));
        assert_eq!(mouse.speed(), (0, 0));
    }

    #[test]
    fn test_degenerate_viewport_does_not_panic() {
        let mut mouse = MouseTracker::new();
        mouse.apply_delta(10, 10, Some(Viewport::new(0, 0)));
        assert_eq!(mouse.position(), (0, 0));
    }

    #[test]
    fn test_saturating_position() {
        let mut mouse = MouseTracker::new();
        mouse.set_position(i32::MAX - 1, i32::MIN + 1);
        mouse.apply_delta(10, -10, None);
        assert_eq!(mouse.position(), (i32::MAX, i32::MIN));
    }
}

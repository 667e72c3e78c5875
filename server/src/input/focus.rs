//! フォーカスモード
//!
//! モーダルなオーバーレイが入力を持っているかどうかを表す二値の状態です。
//! ステップごとに一度だけラッチされます。

use std::fmt;

/// フォーカスモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    /// ゲームループが状態をポーリングする
    #[default]
    Polling,
    /// オーバーレイにイベントを注入する
    Injecting,
}

impl FocusMode {
    /// オーバーレイの状態からモードを決定
    pub fn from_overlay(overlay_active: bool) -> Self {
        if overlay_active {
            FocusMode::Injecting
        } else {
            FocusMode::Polling
        }
    }

    /// イベント注入中かどうか
    pub fn is_injecting(self) -> bool {
        self == FocusMode::Injecting
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusMode::Polling => f.write_str("polling"),
            FocusMode::Injecting => f.write_str("injecting"),
        }
    }
}

/// ラッチ結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusLatch {
    /// このステップのモード
    pub mode: FocusMode,
    /// 前回からモードが変わったか
    pub transitioned: bool,
}

/// フォーカスモード切り替え
#[derive(Debug, Default)]
pub struct FocusSwitch {
    mode: FocusMode,
}

impl FocusSwitch {
    /// ポーリングモードで開始
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在のモード
    pub fn mode(&self) -> FocusMode {
        self.mode
    }

    /// オーバーレイの状態を評価してモードを確定
    pub fn latch(&mut self, overlay_active: bool) -> FocusLatch {
        let mode = FocusMode::from_overlay(overlay_active);
        let transitioned = mode != self.mode;
        if transitioned {
            log::debug!("フォーカスモード遷移: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        FocusLatch { mode, transitioned }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_detects_both_directions() {
        let mut switch = FocusSwitch::new();
        assert_eq!(switch.mode(), FocusMode::Polling);

        assert!(!switch.latch(false).transitioned);
        let latch = switch.latch(true);
        assert!(latch.transitioned);
        assert_eq!(latch.mode, FocusMode::Injecting);
        assert!(!switch.latch(true).transitioned);
        assert!(switch.latch(false).transitioned);
        assert_eq!(switch.mode(), FocusMode::Polling);
    }
}

use core_events::{ModMask, WheelDelta};

use crate::CellSize;
use crate::mouse::mod_prefix;

/// Whole-cell scroll steps produced by one wheel event. Positive `vertical`
/// scrolls up, positive `horizontal` scrolls left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelSteps {
    pub vertical: i32,
    pub horizontal: i32,
    pub accel: i32,
}

impl WheelSteps {
    pub fn is_empty(&self) -> bool {
        self.vertical == 0 && self.horizontal == 0
    }
}

/// Sub-cell pixel remainder of trackpad scrolling ("scroll dust").
///
/// A step fires once the dust held *before* the current delta reaches one
/// cell; the dust then resets. Reversing to negative motion discards any
/// positive dust so direction changes respond immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollDust {
    x: i32,
    y: i32,
    last_steps_y: i32,
}

impl ScrollDust {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn accumulate(&mut self, delta: WheelDelta, cell: CellSize) -> WheelSteps {
        match delta {
            // One notch is one row or column, whatever angle the device reports.
            WheelDelta::Angle { x, y } => WheelSteps {
                vertical: y.signum(),
                horizontal: x.signum(),
                accel: 1,
            },
            WheelDelta::Pixels { x, y } => self.accumulate_pixels(x, y, cell),
        }
    }

    fn accumulate_pixels(&mut self, h: i32, v: i32, cell: CellSize) -> WheelSteps {
        if h < 0 && self.x > 0 {
            self.x = 0;
        }
        if v < 0 && self.y > 0 {
            self.y = 0;
        }
        let held_x = f64::from(self.x.abs());
        let held_y = f64::from(self.y.abs());
        self.x += h;
        self.y += v;

        let mut steps = WheelSteps::default();
        if cell.width > 0.0 && held_x >= cell.width {
            steps.horizontal = (f64::from(self.x) / cell.width).trunc() as i32;
            self.x = 0;
        }
        if cell.height > 0.0 && held_y >= cell.height {
            steps.vertical = (f64::from(self.y) / cell.height).trunc() as i32;
            self.y = 0;
        }

        self.last_steps_y = (steps.vertical.abs() - self.last_steps_y).max(0);
        steps.accel = if self.last_steps_y <= 2 {
            1
        } else {
            (self.last_steps_y / 4).max(1)
        };
        steps
    }
}

/// Notation for a wheel step: vertical steps carry no position, horizontal
/// ones carry the pointer cell.
pub fn wheel_notation(steps: &WheelSteps, mods: ModMask, col: i64, row: i64) -> Vec<String> {
    let prefix = mod_prefix(mods);
    let mut out = Vec::with_capacity(2);
    if steps.vertical != 0 {
        let key = if steps.vertical > 0 { "Up" } else { "Down" };
        out.push(format!("<{prefix}ScrollWheel{key}>"));
    }
    if steps.horizontal != 0 {
        let key = if steps.horizontal > 0 { "Left" } else { "Right" };
        out.push(format!("<{prefix}ScrollWheel{key}><{col},{row}>"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellSize = CellSize {
        width: 8.0,
        height: 16.0,
    };

    #[test]
    fn angle_delta_steps_immediately() {
        let mut dust = ScrollDust::new();
        let steps = dust.accumulate(WheelDelta::Angle { x: 0, y: -120 }, CELL);
        assert_eq!(
            steps,
            WheelSteps {
                vertical: -1,
                horizontal: 0,
                accel: 1
            }
        );
        assert_eq!(wheel_notation(&steps, ModMask::empty(), 3, 4), vec!["<ScrollWheelDown>"]);
    }

    #[test]
    fn angle_delta_is_one_step_per_axis() {
        let mut dust = ScrollDust::new();
        let steps = dust.accumulate(WheelDelta::Angle { x: 240, y: 120 }, CELL);
        assert_eq!((steps.vertical, steps.horizontal, steps.accel), (1, 1, 1));
        assert!(dust.accumulate(WheelDelta::Angle { x: 0, y: 0 }, CELL).is_empty());
    }

    #[test]
    fn pixel_dust_fires_after_a_full_cell_is_held() {
        let mut dust = ScrollDust::new();
        // Nothing held yet: the first delta only accumulates.
        assert!(dust.accumulate(WheelDelta::Pixels { x: 0, y: 10 }, CELL).is_empty());
        assert!(dust.accumulate(WheelDelta::Pixels { x: 0, y: 10 }, CELL).is_empty());
        // 20px held >= 16px cell: fires with the accumulated 30px.
        let steps = dust.accumulate(WheelDelta::Pixels { x: 0, y: 10 }, CELL);
        assert_eq!(steps.vertical, 1);
        assert_eq!(steps.accel, 1);
        // Dust was reset.
        assert!(dust.accumulate(WheelDelta::Pixels { x: 0, y: 10 }, CELL).is_empty());
    }

    #[test]
    fn reversal_discards_positive_dust() {
        let mut dust = ScrollDust::new();
        dust.accumulate(WheelDelta::Pixels { x: 0, y: 15 }, CELL);
        let steps = dust.accumulate(WheelDelta::Pixels { x: 0, y: -4 }, CELL);
        assert!(steps.is_empty(), "held dust was cleared before the check");
        let steps = dust.accumulate(WheelDelta::Pixels { x: 0, y: -20 }, CELL);
        assert!(steps.is_empty(), "only 4px held");
        let steps = dust.accumulate(WheelDelta::Pixels { x: 0, y: -1 }, CELL);
        assert_eq!(steps.vertical, -1);
    }

    #[test]
    fn horizontal_notation_carries_position() {
        let steps = WheelSteps {
            vertical: 0,
            horizontal: -1,
            accel: 1,
        };
        assert_eq!(
            wheel_notation(&steps, ModMask::CTRL, 7, 2),
            vec!["<C-ScrollWheelRight><7,2>"]
        );
        let both = WheelSteps {
            vertical: 2,
            horizontal: 1,
            accel: 1,
        };
        assert_eq!(
            wheel_notation(&both, ModMask::empty(), 0, 0),
            vec!["<ScrollWheelUp>", "<ScrollWheelLeft><0,0>"]
        );
    }

    #[test]
    fn large_bursts_accelerate() {
        let mut dust = ScrollDust::new();
        dust.accumulate(WheelDelta::Pixels { x: 0, y: 16 }, CELL);
        let steps = dust.accumulate(WheelDelta::Pixels { x: 0, y: 200 }, CELL);
        assert_eq!(steps.vertical, 13);
        assert_eq!(steps.accel, 3);
    }
}

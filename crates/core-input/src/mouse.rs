use core_events::{HeldButtons, ModMask, MouseButton, PointerEvent, PointerKind};
use tracing::trace;

use crate::CellSize;

/// Modifier prefix in notation order: shift, control, alt, super.
pub fn mod_prefix(mods: ModMask) -> String {
    let mut out = String::new();
    for (flag, prefix) in [
        (ModMask::SHIFT, "S-"),
        (ModMask::CTRL, "C-"),
        (ModMask::ALT, "A-"),
        (ModMask::SUPER, "D-"),
    ] {
        if mods.contains(flag) {
            out.push_str(prefix);
        }
    }
    out
}

/// Global cell `(col, row)` under a pixel position.
pub fn cell_at(x: f64, y: f64, cell: CellSize) -> (i64, i64) {
    if cell.width <= 0.0 || cell.height <= 0.0 {
        return (0, 0);
    }
    ((x / cell.width).floor() as i64, (y / cell.height).floor() as i64)
}

fn button_name(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "Left",
        MouseButton::Right => "Right",
        MouseButton::Middle => "Middle",
    }
}

/// `<{mod}{Button}{Mouse|Release|Drag}><{col},{row}>`, or `None` for events the
/// editor has no notation for (moves with no button held, buttonless press).
pub fn mouse_notation(ev: &PointerEvent, cell: CellSize) -> Option<String> {
    let button = match ev.kind {
        PointerKind::Move => {
            if ev.held.contains(HeldButtons::LEFT) {
                MouseButton::Left
            } else if ev.held.contains(HeldButtons::RIGHT) {
                MouseButton::Right
            } else if ev.held.contains(HeldButtons::MIDDLE) {
                MouseButton::Middle
            } else {
                return None;
            }
        }
        _ => ev.button?,
    };
    let action = match ev.kind {
        PointerKind::Press | PointerKind::DoubleClick => "Mouse",
        PointerKind::Release => "Release",
        PointerKind::Move => "Drag",
    };
    let (col, row) = cell_at(ev.x, ev.y, cell);
    trace!(target: "input.mouse", col, row, action, "mouse_notation");
    Some(format!(
        "<{}{}{}><{},{}>",
        mod_prefix(ev.mods),
        button_name(button),
        action,
        col,
        row
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellSize = CellSize {
        width: 8.0,
        height: 16.0,
    };

    fn ev(kind: PointerKind, button: Option<MouseButton>, held: HeldButtons) -> PointerEvent {
        PointerEvent {
            kind,
            button,
            held,
            x: 100.0,
            y: 70.0,
            mods: ModMask::empty(),
        }
    }

    #[test]
    fn press_release_and_drag() {
        let press = ev(PointerKind::Press, Some(MouseButton::Left), HeldButtons::LEFT);
        assert_eq!(mouse_notation(&press, CELL).unwrap(), "<LeftMouse><12,4>");
        let release = ev(PointerKind::Release, Some(MouseButton::Right), HeldButtons::empty());
        assert_eq!(mouse_notation(&release, CELL).unwrap(), "<RightRelease><12,4>");
        let drag = ev(PointerKind::Move, None, HeldButtons::MIDDLE);
        assert_eq!(mouse_notation(&drag, CELL).unwrap(), "<MiddleDrag><12,4>");
        let dbl = ev(PointerKind::DoubleClick, Some(MouseButton::Left), HeldButtons::LEFT);
        assert_eq!(mouse_notation(&dbl, CELL).unwrap(), "<LeftMouse><12,4>");
    }

    #[test]
    fn move_without_button_is_untranslated() {
        let hover = ev(PointerKind::Move, None, HeldButtons::empty());
        assert!(mouse_notation(&hover, CELL).is_none());
        let odd = ev(PointerKind::Press, None, HeldButtons::empty());
        assert!(mouse_notation(&odd, CELL).is_none());
    }

    #[test]
    fn drag_prefers_left_then_right() {
        let drag = ev(PointerKind::Move, None, HeldButtons::RIGHT | HeldButtons::LEFT);
        assert_eq!(mouse_notation(&drag, CELL).unwrap(), "<LeftDrag><12,4>");
    }

    #[test]
    fn modifiers_prefix_in_order() {
        assert_eq!(mod_prefix(ModMask::CTRL | ModMask::SHIFT), "S-C-");
        assert_eq!(mod_prefix(ModMask::all()), "S-C-A-D-");
        let mut e = ev(PointerKind::Press, Some(MouseButton::Left), HeldButtons::LEFT);
        e.mods = ModMask::ALT;
        assert_eq!(mouse_notation(&e, CELL).unwrap(), "<A-LeftMouse><12,4>");
    }

    #[test]
    fn degenerate_cell_size_maps_to_origin() {
        assert_eq!(cell_at(50.0, 50.0, CellSize::new(0.0, 16.0)), (0, 0));
    }
}

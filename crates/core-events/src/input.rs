//! Toolkit-neutral pointer and wheel events delivered to a screen surface.

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ModMask: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const SUPER = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Name used by the backend's `input_mouse` request.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Press,
    Release,
    Drag,
}

impl MouseAction {
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Release => "release",
            Self::Drag => "drag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Press,
    DoubleClick,
    Release,
    Move,
}

/// Pointer event in surface pixel coordinates.
///
/// `button` is the button that changed state for press/release. For moves,
/// `held` lists the buttons currently down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub button: Option<MouseButton>,
    pub held: HeldButtons,
    pub x: f64,
    pub y: f64,
    pub mods: ModMask,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct HeldButtons: u8 {
        const LEFT   = 0b001;
        const RIGHT  = 0b010;
        const MIDDLE = 0b100;
    }
}

/// Source of a wheel delta. Trackpads report pixels, mouse wheels report
/// angle steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Pixels { x: i32, y: i32 },
    Angle { x: i32, y: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub delta: WheelDelta,
    pub x: f64,
    pub y: f64,
    pub mods: ModMask,
}

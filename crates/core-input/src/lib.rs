//! Pointer and wheel translation into editor key notation.
//!
//! Surfaces deliver [`PointerEvent`]/[`WheelEvent`]s in pixels; the editor
//! expects notation strings such as `<LeftMouse><12,4>` or `<ScrollWheelUp>`.
//! Cell coordinates are always derived from the global cell size, since window
//! positions are expressed in global font units.
//!
//! [`PointerEvent`]: core_events::PointerEvent
//! [`WheelEvent`]: core_events::WheelEvent

mod mouse;
mod wheel;

pub use mouse::{cell_at, mod_prefix, mouse_notation};
pub use wheel::{ScrollDust, WheelSteps, wheel_notation};

/// Pixel size of one global cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f64,
    pub height: f64,
}

impl CellSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use core_events::{HeldButtons, ModMask, MouseButton, PointerEvent, PointerKind};

    use super::*;

    /// Cell position of every `input.mouse` event, as logged.
    #[derive(Clone, Default)]
    struct MouseCells(Arc<Mutex<Vec<(String, String)>>>);

    #[derive(Default)]
    struct CellFields {
        col: String,
        row: String,
    }

    impl Visit for CellFields {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            match field.name() {
                "col" => self.col = format!("{value:?}"),
                "row" => self.row = format!("{value:?}"),
                _ => {}
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for MouseCells {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() != "input.mouse" {
                return;
            }
            let mut cell = CellFields::default();
            event.record(&mut cell);
            self.0.lock().unwrap().push((cell.col, cell.row));
        }
    }

    #[test]
    fn translation_logs_cell_position() {
        let cells = MouseCells::default();
        let subscriber = tracing_subscriber::registry().with(cells.clone());

        let out = tracing::subscriber::with_default(subscriber, || {
            mouse_notation(
                &PointerEvent {
                    kind: PointerKind::Press,
                    button: Some(MouseButton::Left),
                    held: HeldButtons::LEFT,
                    x: 25.0,
                    y: 41.0,
                    mods: ModMask::empty(),
                },
                CellSize::new(10.0, 20.0),
            )
        });
        assert_eq!(out.as_deref(), Some("<LeftMouse><2,2>"));
        assert_eq!(*cells.0.lock().unwrap(), vec![("2".to_string(), "2".to_string())]);
    }
}

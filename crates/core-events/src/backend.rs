//! Upstream requests from the compositor to the editor backend.

use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::input::{MouseAction, MouseButton};
use crate::redraw::GridId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend disconnected")]
    Disconnected,
    #[error("backend rejected request: {0}")]
    Rejected(String),
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
}

/// Mouse input addressed to a specific grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseInput {
    pub button: MouseButton,
    pub action: MouseAction,
    pub modifier: String,
    pub grid: GridId,
    pub row: i64,
    pub col: i64,
}

/// The backend collaborator as seen from the compositor.
///
/// Implementations may block inside `try_resize_ui` (the backend can stall
/// while waiting for input at startup); callers that must not block wrap the
/// call with a timeout.
pub trait UiBackend: Send + Sync {
    fn input(&self, keys: &str) -> Result<(), BackendError>;
    fn input_mouse(&self, input: MouseInput) -> Result<(), BackendError>;
    fn try_resize_ui(&self, cols: usize, rows: usize) -> Result<(), BackendError>;
    fn try_resize_grid(&self, grid: GridId, cols: usize, rows: usize) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiRequest {
    Input(String),
    Mouse(MouseInput),
    ResizeUi { cols: usize, rows: usize },
    ResizeGrid { grid: GridId, cols: usize, rows: usize },
}

/// Backend that accepts every request and keeps it for inspection.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    requests: Mutex<Vec<UiRequest>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<UiRequest> {
        self.requests.lock().clone()
    }

    pub fn take(&self) -> Vec<UiRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    /// Key-notation inputs only, in send order.
    pub fn inputs(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| match r {
                UiRequest::Input(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, req: UiRequest) {
        self.requests.lock().push(req);
    }
}

impl UiBackend for RecordingBackend {
    fn input(&self, keys: &str) -> Result<(), BackendError> {
        self.push(UiRequest::Input(keys.to_owned()));
        Ok(())
    }

    fn input_mouse(&self, input: MouseInput) -> Result<(), BackendError> {
        self.push(UiRequest::Mouse(input));
        Ok(())
    }

    fn try_resize_ui(&self, cols: usize, rows: usize) -> Result<(), BackendError> {
        self.push(UiRequest::ResizeUi { cols, rows });
        Ok(())
    }

    fn try_resize_grid(&self, grid: GridId, cols: usize, rows: usize) -> Result<(), BackendError> {
        self.push(UiRequest::ResizeGrid { grid, cols, rows });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_backend_keeps_order() {
        let b = RecordingBackend::new();
        b.input("<Esc>").unwrap();
        b.try_resize_grid(3, 40, 10).unwrap();
        b.input("<ScrollWheelUp>").unwrap();
        assert_eq!(b.inputs(), vec!["<Esc>", "<ScrollWheelUp>"]);
        let all = b.take();
        assert_eq!(all.len(), 3);
        assert_eq!(
            all[1],
            UiRequest::ResizeGrid {
                grid: 3,
                cols: 40,
                rows: 10
            }
        );
        assert!(b.requests().is_empty());
    }

    #[test]
    fn backend_error_messages() {
        assert_eq!(BackendError::Disconnected.to_string(), "backend disconnected");
        assert!(
            BackendError::Timeout(Duration::from_millis(10))
                .to_string()
                .contains("10ms")
        );
    }
}

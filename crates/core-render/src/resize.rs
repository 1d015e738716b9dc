//! UI resize round-trip with escalating timeouts.
//!
//! The backend may stall inside a resize while it waits for input (an error
//! prompt at startup). Each attempt runs on a helper thread; when it does not
//! answer in time a neutral key is injected and the request is issued again.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core_events::{BackendError, UiBackend};
use crossbeam_channel::{RecvTimeoutError, bounded};
use tracing::{debug, warn};

/// Key sent to unstick a backend blocked on a prompt.
pub const UNSTICK_INPUT: &str = "<Enter>";
pub const MAX_ATTEMPTS: u32 = 8;

/// Backoff state for one resize request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeRetry {
    attempts: u32,
}

impl ResizeRetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 10ms, then 100ms, then 1000ms for every later attempt.
    pub fn wait_time(&mut self) -> Duration {
        let ms = match self.attempts {
            0 => 10,
            1 => 100,
            _ => 1000,
        };
        self.attempts += 1;
        Duration::from_millis(ms)
    }
}

/// Ask the backend for a `cols x rows` UI and wait for its answer, retrying
/// after each timeout. The first answer from any attempt ends the loop.
pub fn try_resize_with_retry(
    backend: &Arc<dyn UiBackend>,
    cols: usize,
    rows: usize,
) -> Result<(), BackendError> {
    let mut retry = ResizeRetry::new();
    let (tx, rx) = bounded(MAX_ATTEMPTS as usize);
    let mut waited = Duration::ZERO;
    while retry.attempts() < MAX_ATTEMPTS {
        let tx = tx.clone();
        let worker = Arc::clone(backend);
        thread::Builder::new()
            .name("ui-resize".into())
            .spawn(move || {
                let _ = tx.send(worker.try_resize_ui(cols, rows));
            })
            .map_err(|e| BackendError::Rejected(e.to_string()))?;

        let wait = retry.wait_time();
        match rx.recv_timeout(wait) {
            Ok(result) => {
                debug!(target: "render.resize", cols, rows, attempts = retry.attempts(), ok = result.is_ok(), "ui_resized");
                return result;
            }
            Err(RecvTimeoutError::Timeout) => {
                waited += wait;
                warn!(target: "render.resize", cols, rows, attempt = retry.attempts(), wait_ms = wait.as_millis() as u64, "resize_timeout");
                backend.input(UNSTICK_INPUT)?;
            }
            Err(RecvTimeoutError::Disconnected) => return Err(BackendError::Disconnected),
        }
    }
    Err(BackendError::Timeout(waited))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{GridId, MouseInput, RecordingBackend, UiRequest};
    use parking_lot::Mutex;

    #[test]
    fn backoff_escalates_and_stays() {
        let mut r = ResizeRetry::new();
        let waits: Vec<_> = (0..4).map(|_| r.wait_time().as_millis()).collect();
        assert_eq!(waits, vec![10, 100, 1000, 1000]);
    }

    #[test]
    fn prompt_backend_answers_first_attempt() {
        let rec = Arc::new(RecordingBackend::new());
        let backend: Arc<dyn UiBackend> = rec.clone();
        try_resize_with_retry(&backend, 100, 30).unwrap();
        assert_eq!(rec.requests(), vec![UiRequest::ResizeUi { cols: 100, rows: 30 }]);
    }

    /// Blocks resizes until an `<Enter>` arrives.
    #[derive(Default)]
    struct PromptBackend {
        unstuck: Mutex<bool>,
        inputs: Mutex<Vec<String>>,
    }

    impl UiBackend for PromptBackend {
        fn input(&self, keys: &str) -> Result<(), BackendError> {
            self.inputs.lock().push(keys.to_owned());
            *self.unstuck.lock() = true;
            Ok(())
        }

        fn input_mouse(&self, _input: MouseInput) -> Result<(), BackendError> {
            Ok(())
        }

        fn try_resize_ui(&self, _cols: usize, _rows: usize) -> Result<(), BackendError> {
            if *self.unstuck.lock() {
                Ok(())
            } else {
                thread::sleep(Duration::from_secs(5));
                Err(BackendError::Rejected("stalled".into()))
            }
        }

        fn try_resize_grid(&self, _grid: GridId, _cols: usize, _rows: usize) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn stalled_backend_is_unstuck_and_retried() {
        let prompt = Arc::new(PromptBackend::default());
        let backend: Arc<dyn UiBackend> = prompt.clone();
        try_resize_with_retry(&backend, 80, 24).unwrap();
        assert_eq!(*prompt.inputs.lock(), vec![UNSTICK_INPUT.to_owned()]);
    }
}

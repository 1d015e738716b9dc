//! Replay of recorded backend traffic.
//!
//! A replay file holds one JSON value per line. Arrays are redraw batches in
//! the backend's wire shape; objects are surface events:
//! `{"resize":{"width":800,"height":600}}`,
//! `{"press":{"x":10.0,"y":20.0}}`, `{"wheel":{"x":0.0,"y":0.0,"dx":0,"dy":120}}`.
//! Blank lines and lines starting with `#` are ignored.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use core_events::{
    AsyncEventSource, CHANNEL_SEND_FAILURES, Event, HeldButtons, ModMask, MouseButton,
    PointerEvent, PointerKind, REDRAW_BATCHES, WheelDelta, WheelEvent, decode_batch,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SurfaceLine {
    Resize { width: u32, height: u32 },
    Press { x: f64, y: f64 },
    Release { x: f64, y: f64 },
    Wheel { x: f64, y: f64, dx: i32, dy: i32 },
}

impl From<SurfaceLine> for Event {
    fn from(line: SurfaceLine) -> Self {
        let pointer = |kind, x, y| PointerEvent {
            kind,
            button: Some(MouseButton::Left),
            held: HeldButtons::empty(),
            x,
            y,
            mods: ModMask::empty(),
        };
        match line {
            SurfaceLine::Resize { width, height } => Event::Resize { width, height },
            SurfaceLine::Press { x, y } => Event::Pointer(pointer(PointerKind::Press, x, y)),
            SurfaceLine::Release { x, y } => Event::Pointer(pointer(PointerKind::Release, x, y)),
            SurfaceLine::Wheel { x, y, dx, dy } => Event::Wheel(WheelEvent {
                delta: WheelDelta::Angle { x: dx, y: dy },
                x,
                y,
                mods: ModMask::empty(),
            }),
        }
    }
}

/// Parse one replay line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(line).context("replay line is not JSON")?;
    if value.is_array() {
        return Ok(Some(Event::Redraw(decode_batch(&value)?)));
    }
    let surface: SurfaceLine = serde_json::from_value(value).context("unknown surface event")?;
    Ok(Some(surface.into()))
}

/// Streams a replay file into the loop, then sends `Shutdown`.
pub struct ReplayEventSource {
    path: PathBuf,
}

impl ReplayEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AsyncEventSource for ReplayEventSource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let file = match tokio::fs::File::open(&self.path).await {
                Ok(f) => f,
                Err(e) => {
                    warn!(target: "runtime.replay", path = %self.path.display(), error = %e, "replay_open_failed");
                    let _ = tx.send(Event::Shutdown).await;
                    return;
                }
            };
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0usize;
            let mut sent = 0usize;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(target: "runtime.replay", line = line_no, error = %e, "replay_read_failed");
                        break;
                    }
                };
                line_no += 1;
                match parse_line(&line) {
                    Ok(Some(event)) => {
                        let redraw = matches!(event, Event::Redraw(_));
                        if tx.send(event).await.is_err() {
                            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                            debug!(target: "runtime.replay", line = line_no, "replay_consumer_gone");
                            return;
                        }
                        if redraw {
                            REDRAW_BATCHES.fetch_add(1, Ordering::Relaxed);
                        }
                        sent += 1;
                    }
                    Ok(None) => {}
                    Err(e) => warn!(target: "runtime.replay", line = line_no, error = %format!("{e:#}"), "replay_line_skipped"),
                }
            }
            info!(target: "runtime.replay", lines = line_no, events = sent, "replay_complete");
            let _ = tx.send(Event::Shutdown).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{EventSourceRegistry, RedrawEvent};
    use std::io::Write;
    use tokio::sync::mpsc;

    #[test]
    fn surface_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("  # comment").unwrap().is_none());
        assert!(matches!(
            parse_line(r#"{"resize":{"width":640,"height":480}}"#).unwrap(),
            Some(Event::Resize { width: 640, height: 480 })
        ));
        match parse_line(r#"{"wheel":{"x":4.0,"y":8.0,"dx":0,"dy":-120}}"#).unwrap() {
            Some(Event::Wheel(w)) => assert_eq!(w.delta, WheelDelta::Angle { x: 0, y: -120 }),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_line(r#"{"teleport":{}}"#).is_err());
        assert!(parse_line("[1,").is_err());
    }

    #[test]
    fn array_lines_are_redraw_batches() {
        match parse_line(r#"[["grid_resize",[1,80,24]],["flush"]]"#).unwrap() {
            Some(Event::Redraw(batch)) => {
                assert_eq!(batch.len(), 2);
                assert_eq!(batch[1], RedrawEvent::Flush);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn source_streams_file_then_shuts_down() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"[["grid_resize",[1,10,2]]]"#).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, r#"{{"resize":{{"width":80,"height":32}}}}"#).unwrap();
        file.flush().unwrap();

        let batches_before = REDRAW_BATCHES.load(Ordering::Relaxed);
        let (tx, mut rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        reg.register(ReplayEventSource::new(file.path()));
        let handles = reg.spawn_all(&tx);
        drop(tx);

        let mut kinds = Vec::new();
        while let Some(ev) = rx.recv().await {
            kinds.push(match ev {
                Event::Redraw(_) => "redraw",
                Event::Resize { .. } => "resize",
                Event::Shutdown => "shutdown",
                _ => "other",
            });
        }
        assert_eq!(kinds, vec!["redraw", "resize", "shutdown"]);
        for h in handles {
            h.await.unwrap();
        }
        assert!(REDRAW_BATCHES.load(Ordering::Relaxed) > batches_before);
    }

    #[tokio::test]
    async fn closed_consumer_counts_a_send_failure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"[["flush"]]"#).unwrap();
        file.flush().unwrap();

        let failures_before = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed);
        let (tx, rx) = mpsc::channel::<Event>(1);
        drop(rx);
        Box::new(ReplayEventSource::new(file.path())).spawn(tx).await.unwrap();
        assert!(CHANNEL_SEND_FAILURES.load(Ordering::Relaxed) > failures_before);
    }

    #[tokio::test]
    async fn missing_file_still_shuts_down() {
        let (tx, mut rx) = mpsc::channel::<Event>(2);
        let handle = Box::new(ReplayEventSource::new("/nonexistent/replay.jsonl")).spawn(tx);
        assert!(matches!(rx.recv().await, Some(Event::Shutdown)));
        handle.await.unwrap();
    }
}

//! Event model shared by the compositor and its hosts.
//!
//! Three groups live here:
//! * [`redraw`]: the grid-oriented redraw events the backend emits, plus the
//!   lenient batch [`decode`]r.
//! * [`input`]: pointer and wheel events a surface receives from the toolkit.
//! * [`backend`]: the upstream `UiBackend` seam (input, resize requests).
//!
//! The application loop consumes [`Event`]s from a bounded tokio channel fed
//! by registered [`AsyncEventSource`]s.

pub mod backend;
pub mod decode;
pub mod input;
pub mod redraw;

use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub use backend::{BackendError, MouseInput, RecordingBackend, UiBackend, UiRequest};
pub use decode::{DecodeError, decode_batch, decode_event};
pub use input::{
    HeldButtons, ModMask, MouseAction, MouseButton, PointerEvent, PointerKind, WheelDelta,
    WheelEvent,
};
pub use redraw::{
    FloatAnchor, GridCell, GridId, HlAttrDefine, HlAttrs, HlInfo, PRIMARY_GRID, RedrawEvent,
};

/// Bounded capacity of the loop channel. Producers use `send().await`, so a
/// slow consumer applies backpressure instead of dropping redraw batches.
pub const EVENT_CHANNEL_CAP: usize = 1024;

// Relaxed atomic counters; inspected by tests and logged at shutdown.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static REDRAW_BATCHES: AtomicU64 = AtomicU64::new(0);
pub static DECODE_ERRORS: AtomicU64 = AtomicU64::new(0);

/// Top-level event consumed by the application loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// One decoded redraw batch, in backend order.
    Redraw(Vec<RedrawEvent>),
    /// Surface resized to the given pixel size.
    Resize { width: u32, height: u32 },
    Pointer(PointerEvent),
    Wheel(WheelEvent),
    Shutdown,
}

/// Trait implemented by any async event producer. Implementors hold their
/// configuration and spawn one background task that pushes `Event`s into the
/// shared channel, stopping when a send fails (consumer dropped).
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together at startup.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, returning their JoinHandles. Each source
    /// receives its own `Sender` clone; the caller drops its last clone during
    /// shutdown so the sources observe the closed channel and exit.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

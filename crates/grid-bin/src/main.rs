//! gridcomp entrypoint: replays recorded redraw traffic through a headless
//! compositor screen and reports what was painted.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::{RenderContext, load_from};
use core_events::{
    CHANNEL_SEND_FAILURES, DECODE_ERRORS, EVENT_CHANNEL_CAP, Event, EventSourceRegistry,
    REDRAW_BATCHES, RecordingBackend, UiBackend,
};
use core_render::{CountingRasterizer, Font, MonospaceLoader, RecordingPainter, Screen};
use core_terminal::{Canvas, PreviewTerminal};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod replay;
use replay::ReplayEventSource;

const LOG_FILE: &str = "gridcomp.log";
const LOG_ENV: &str = "GRIDCOMP_LOG";

#[derive(Parser, Debug)]
#[command(name = "gridcomp", about = "Replay redraw events through the grid compositor")]
struct Args {
    /// Replay file: one redraw batch or surface event per line.
    pub path: PathBuf,
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Initial surface width in pixels.
    #[arg(long, default_value_t = 800)]
    pub width: u32,
    #[arg(long, default_value_t = 600)]
    pub height: u32,
    /// Print the text of every shown grid after the replay.
    #[arg(long)]
    pub dump: bool,
    /// Show the composited screen in the terminal until a key is pressed.
    #[arg(long)]
    pub preview: bool,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env(LOG_ENV))
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; the guard drops and the writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Break,
}

/// Screen plus the headless paint targets a flush paints into.
struct Compositor {
    screen: Screen,
    backend: Arc<RecordingBackend>,
    painter: RecordingPainter,
    raster: CountingRasterizer,
    flushes: u64,
}

impl Compositor {
    fn new(ctx: Arc<RenderContext>) -> Self {
        let backend = Arc::new(RecordingBackend::new());
        let font = Font::monospace(ctx.font.family.clone(), ctx.font.size, ctx.font.line_space);
        let loader = MonospaceLoader {
            line_space: ctx.font.line_space,
        };
        let ui: Arc<dyn UiBackend> = backend.clone();
        let screen = Screen::new("main", ctx, font, ui, Arc::new(loader));
        Self {
            screen,
            backend,
            painter: RecordingPainter::new(),
            raster: CountingRasterizer::new(),
            flushes: 0,
        }
    }

    fn handle(&mut self, event: Event) -> LoopControl {
        match event {
            Event::Redraw(batch) => {
                for ev in batch {
                    let flush = matches!(ev, core_events::RedrawEvent::Flush);
                    self.screen.handle(ev);
                    if flush {
                        self.repaint();
                    }
                }
            }
            Event::Resize { width, height } => self.screen.update_size(i64::from(width), i64::from(height)),
            Event::Pointer(ev) => {
                self.screen.mouse_event(&ev);
            }
            Event::Wheel(ev) => {
                self.screen.wheel_event(&ev);
            }
            Event::Shutdown => return LoopControl::Break,
        }
        LoopControl::Continue
    }

    fn repaint(&mut self) {
        self.flushes += 1;
        let requests = self.screen.update();
        for req in &requests {
            if let Some(stats) = self.screen.paint(req.grid, req.rect, &mut self.painter, &mut self.raster) {
                trace!(target: "render.paint", grid = req.grid, rows = stats.rows, fills = stats.fills, text_runs = stats.text_runs, "repainted");
            }
        }
        let commands = self.painter.take().len();
        debug!(target: "runtime", flush = self.flushes, requests = requests.len(), commands, "flush_painted");
    }

    fn dump(&self) -> String {
        let mut out = String::new();
        for win in self.screen.shown_windows() {
            let (col, row) = win.pos();
            out.push_str(&format!("grid {} {}x{} at {},{}\n", win.grid(), win.cols(), win.rows(), col, row));
            for r in 0..win.rows() {
                out.push_str(win.row_text(r).trim_end());
                out.push('\n');
            }
        }
        out
    }

    fn finish(&mut self) {
        self.screen.release_all(&mut self.raster);
        let m = self.screen.metrics().snapshot();
        info!(
            target: "runtime",
            flushes = self.flushes,
            paints = m.paints,
            rows_painted = m.rows_painted,
            fills = m.fills,
            text_runs = m.text_runs,
            glyph_hits = m.glyph_hits,
            glyph_misses = m.glyph_misses,
            glyph_evictions = m.glyph_evictions,
            repaint_requests = m.repaint_requests,
            live_images = self.raster.live(),
            backend_requests = self.backend.requests().len(),
            "replay_metrics"
        );
        info!(
            target: "runtime.shutdown",
            redraw_batches = REDRAW_BATCHES.load(Ordering::Relaxed),
            decode_errors = DECODE_ERRORS.load(Ordering::Relaxed),
            send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
            "channel_counters"
        );
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_from(args.config.clone()).context("loading config")?;
    let ctx = Arc::new(config.render_context());
    info!(target: "runtime.startup", path = %args.path.display(), config = ?config.source, "bootstrap_complete");

    let mut comp = Compositor::new(ctx);
    comp.screen.attach_ui();
    comp.screen.update_size(i64::from(args.width), i64::from(args.height));

    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    registry.register(ReplayEventSource::new(&args.path));
    let handles = registry.spawn_all(&tx);
    drop(tx);

    while let Some(event) = rx.recv().await {
        if comp.handle(event) == LoopControl::Break {
            break;
        }
    }
    rx.close();
    for handle in handles {
        if tokio::time::timeout(Duration::from_millis(200), handle).await.is_err() {
            warn!(target: "runtime.shutdown", "event_source_task_timeout");
        }
    }

    if args.dump {
        print!("{}", comp.dump());
    }
    if args.preview {
        let (cols, rows) = comp.screen.ui_size();
        let canvas = Canvas::compose(&comp.screen, cols, rows);
        let mut terminal = PreviewTerminal::new();
        let mut guard = terminal.enter_guard("gridcomp")?;
        guard.draw(&canvas)?;
        guard.wait_key()?;
    }
    comp.finish();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");
    let args = Args::parse();
    run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{GridCell, RedrawEvent, UiRequest};
    use pretty_assertions::assert_eq;

    fn line(grid: u64, row: i64, text: &str) -> RedrawEvent {
        RedrawEvent::GridLine {
            grid,
            row,
            col_start: 0,
            cells: text.chars().map(|c| GridCell::new(c.to_string())).collect(),
        }
    }

    #[test]
    fn flush_paints_and_dump_lists_shown_grids() {
        let mut comp = Compositor::new(Arc::new(RenderContext::default()));
        let control = comp.handle(Event::Redraw(vec![
            RedrawEvent::GridResize { grid: 1, cols: 6, rows: 2 },
            line(1, 0, "hello"),
            RedrawEvent::Flush,
        ]));
        assert_eq!(control, LoopControl::Continue);
        assert_eq!(comp.flushes, 1);
        let m = comp.screen.metrics().snapshot();
        assert_eq!(m.paints, 1);
        assert!(m.text_runs >= 1);
        assert_eq!(comp.dump(), "grid 1 6x2 at 0,0\nhello\n\n");

        comp.finish();
        assert_eq!(comp.raster.live(), 0);
        assert_eq!(comp.handle(Event::Shutdown), LoopControl::Break);
    }

    #[test]
    fn resize_on_attached_ui_reaches_backend() {
        let mut comp = Compositor::new(Arc::new(RenderContext::default()));
        comp.screen.attach_ui();
        let (cw, lh) = {
            let f = comp.screen.global_font();
            (f.char_width(), f.line_height())
        };
        comp.handle(Event::Resize {
            width: (cw * 40.0) as u32,
            height: (lh * 12.0) as u32,
        });
        assert!(comp.backend.requests().contains(&UiRequest::ResizeUi { cols: 40, rows: 12 }));
    }
}

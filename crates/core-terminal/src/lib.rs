//! Terminal preview of a compositor screen.
//!
//! `Canvas` flattens the shown windows into cells; `PreviewTerminal` prints a
//! canvas with truecolor attributes inside the alternate screen.

use std::io::{Write, stdout};

use anyhow::Result;
use core_model::Rgba;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode},
};
use tracing::debug;

pub mod canvas;
pub use canvas::{Canvas, CanvasCell};

fn color(c: Rgba) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

#[derive(Debug, Default)]
pub struct PreviewTerminal {
    entered: bool,
}

/// Leaves the alternate screen on drop, including on early return or panic.
pub struct PreviewGuard<'a> {
    terminal: &'a mut PreviewTerminal,
}

impl PreviewTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_guard(&mut self, title: &str) -> Result<PreviewGuard<'_>> {
        self.enter()?;
        execute!(stdout(), SetTitle(title))?;
        Ok(PreviewGuard { terminal: self })
    }

    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), ResetColor, LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }
}

impl PreviewGuard<'_> {
    /// Print `canvas`, changing colors only between differing cells.
    pub fn draw(&mut self, canvas: &Canvas) -> Result<()> {
        let mut out = stdout().lock();
        let mut last: Option<(Rgba, Rgba)> = None;
        for row in 0..canvas.rows() {
            queue!(out, MoveTo(0, row as u16))?;
            for col in 0..canvas.cols() {
                let Some(cell) = canvas.get(row, col) else {
                    continue;
                };
                if last != Some((cell.fg, cell.bg)) {
                    queue!(out, SetForegroundColor(color(cell.fg)), SetBackgroundColor(color(cell.bg)))?;
                    last = Some((cell.fg, cell.bg));
                }
                queue!(out, Print(&cell.text))?;
            }
        }
        queue!(out, ResetColor)?;
        out.flush()?;
        debug!(target: "render.paint", cols = canvas.cols(), rows = canvas.rows(), "preview_drawn");
        Ok(())
    }

    /// Block until a key is pressed.
    pub fn wait_key(&mut self) -> Result<()> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}

impl Drop for PreviewTerminal {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for PreviewGuard<'_> {
    fn drop(&mut self) {
        let _ = self.terminal.leave();
    }
}

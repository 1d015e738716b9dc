//! Configuration loading and the injected [`RenderContext`].
//!
//! `gridcomp.toml` is parsed into a [`ConfigFile`] (every field optional,
//! unknown fields ignored). [`Config::render_context`] validates and clamps
//! the raw values into an immutable [`RenderContext`] that the compositor
//! receives at construction and on every paint. Theme reload means building a
//! new context and handing it to the screen; nothing reads configuration
//! through globals.
//!
//! Resilience: a missing file or a parse error yields defaults (the latter
//! with a warning). Only an unreadable existing file is an error.

use std::io::ErrorKind;
use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use core_events::{GridId, PRIMARY_GRID};
use core_model::{DefaultColors, Rgba};
use serde::Deserialize;
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "gridcomp.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub foreground: Rgba,
    pub background: Rgba,
    pub indent_guide: Rgba,
    pub window_separator: Rgba,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        let colors = DefaultColors::default();
        Self {
            foreground: colors.foreground,
            background: colors.background,
            indent_guide: Rgba::from_u24(0x3a3f44),
            window_separator: Rgba::from_u24(0x2b2f33),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EditorConfig {
    #[serde(default)]
    pub draw_border: bool,
    #[serde(default)]
    pub indent_guide: bool,
    #[serde(default = "EditorConfig::default_cached_drawing")]
    pub cached_drawing: bool,
    #[serde(default = "EditorConfig::default_transparent")]
    pub transparent: f64,
    #[serde(default = "EditorConfig::default_pattern")]
    pub diff_add_pattern: u8,
    #[serde(default = "EditorConfig::default_pattern")]
    pub diff_change_pattern: u8,
    #[serde(default = "EditorConfig::default_pattern")]
    pub diff_delete_pattern: u8,
    #[serde(default = "EditorConfig::default_ext_multigrid")]
    pub ext_multigrid: bool,
    #[serde(default)]
    pub skip_global_id: bool,
    #[serde(default = "EditorConfig::default_tabstop")]
    pub tabstop: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            draw_border: false,
            indent_guide: false,
            cached_drawing: Self::default_cached_drawing(),
            transparent: Self::default_transparent(),
            diff_add_pattern: Self::default_pattern(),
            diff_change_pattern: Self::default_pattern(),
            diff_delete_pattern: Self::default_pattern(),
            ext_multigrid: Self::default_ext_multigrid(),
            skip_global_id: false,
            tabstop: Self::default_tabstop(),
        }
    }
}

impl EditorConfig {
    const fn default_cached_drawing() -> bool {
        true
    }
    const fn default_transparent() -> f64 {
        1.0
    }
    const fn default_pattern() -> u8 {
        1
    }
    const fn default_ext_multigrid() -> bool {
        true
    }
    const fn default_tabstop() -> usize {
        8
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    pub family: String,
    pub size: u32,
    pub line_space: u32,
    /// Single device-pixel scale factor applied when rasterizing.
    pub scale: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Monospace".to_string(),
            size: 14,
            line_space: 6,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_glyph_capacity")]
    pub glyph_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            glyph_capacity: Self::default_glyph_capacity(),
        }
    }
}

impl CacheConfig {
    const fn default_glyph_capacity() -> usize {
        256
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub font: FontConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    /// File the values were read from; `None` when defaults are in use.
    pub source: Option<PathBuf>,
}

/// Background fill pattern, numbered 1..=14 as in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillPattern {
    #[default]
    Solid,
    Dense(u8),
    Horizontal,
    Vertical,
    Cross,
    BackwardDiagonal,
    ForwardDiagonal,
    DiagonalCross,
}

impl FillPattern {
    pub fn from_code(code: u8) -> Self {
        match code {
            2..=8 => Self::Dense(code - 1),
            9 => Self::Horizontal,
            10 => Self::Vertical,
            11 => Self::Cross,
            12 => Self::BackwardDiagonal,
            13 => Self::ForwardDiagonal,
            14 => Self::DiagonalCross,
            _ => Self::Solid,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Solid => 1,
            Self::Dense(n) => n + 1,
            Self::Horizontal => 9,
            Self::Vertical => 10,
            Self::Cross => 11,
            Self::BackwardDiagonal => 12,
            Self::ForwardDiagonal => 13,
            Self::DiagonalCross => 14,
        }
    }

    /// Sparse patterns (codes 7..=14) get a more saturated color so the
    /// pattern stays visible.
    pub fn is_sparse(self) -> bool {
        (7..=14).contains(&self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub foreground: Rgba,
    pub background: Rgba,
    pub indent_guide: Rgba,
    pub window_separator: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    pub draw_border: bool,
    pub indent_guide: bool,
    pub cached_drawing: bool,
    pub ext_multigrid: bool,
    pub skip_global_id: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffPatterns {
    pub add: FillPattern,
    pub change: FillPattern,
    pub delete: FillPattern,
}

impl DiffPatterns {
    /// Pattern for a diff highlight group name, if it is one and configured
    /// to something other than solid.
    pub fn for_group(&self, hl_name: &str) -> Option<FillPattern> {
        let p = match hl_name {
            "DiffAdd" => self.add,
            "DiffChange" => self.change,
            "DiffDelete" => self.delete,
            _ => return None,
        };
        (p != FillPattern::Solid).then_some(p)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSettings {
    pub family: String,
    pub size: u32,
    pub line_space: u32,
    pub scale: f64,
}

/// Immutable rendering context shared (behind an `Arc`) by a screen and its
/// paint calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub theme: Theme,
    pub flags: FeatureFlags,
    pub diff: DiffPatterns,
    /// Background opacity in `0.0..=1.0`.
    pub transparent: f64,
    pub tabstop: usize,
    pub font: FontSettings,
    pub glyph_capacity: usize,
}

impl Default for RenderContext {
    fn default() -> Self {
        Config::default().render_context()
    }
}

impl RenderContext {
    pub fn default_colors(&self) -> DefaultColors {
        DefaultColors {
            foreground: self.theme.foreground,
            background: self.theme.background,
        }
    }

    pub fn background_alpha(&self) -> u8 {
        (self.transparent * 255.0).trunc() as u8
    }

    /// Grid ids suppressed by the legacy single-grid compatibility mode.
    pub fn is_skip_grid(&self, grid: GridId) -> bool {
        self.flags.ext_multigrid && self.flags.skip_global_id && grid == PRIMARY_GRID
    }
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("gridcomp").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("reading config {}", path.display()));
        }
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                file,
                source: Some(path),
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Validate raw values into a [`RenderContext`], logging every clamp.
    pub fn render_context(&self) -> RenderContext {
        let editor = &self.file.editor;
        let transparent = editor.transparent.clamp(0.0, 1.0);
        if transparent != editor.transparent {
            info!(target: "config", raw = editor.transparent, clamped = transparent, "transparent_clamped");
        }
        let pattern = |name: &'static str, code: u8| {
            if !(1..=14).contains(&code) {
                info!(target: "config", field = name, raw = code, "fill_pattern_out_of_range_using_solid");
            }
            FillPattern::from_code(code)
        };
        let capacity = self.file.cache.glyph_capacity.max(1);
        if capacity != self.file.cache.glyph_capacity {
            info!(target: "config", raw = self.file.cache.glyph_capacity, clamped = capacity, "glyph_capacity_clamped");
        }
        let scale = if self.file.font.scale > 0.0 {
            self.file.font.scale
        } else {
            info!(target: "config", raw = self.file.font.scale, "font_scale_invalid_using_1");
            1.0
        };

        let theme = &self.file.theme;
        RenderContext {
            theme: Theme {
                foreground: theme.foreground,
                background: theme.background,
                indent_guide: theme.indent_guide,
                window_separator: theme.window_separator,
            },
            flags: FeatureFlags {
                draw_border: editor.draw_border,
                indent_guide: editor.indent_guide,
                cached_drawing: editor.cached_drawing,
                ext_multigrid: editor.ext_multigrid,
                skip_global_id: editor.skip_global_id,
            },
            diff: DiffPatterns {
                add: pattern("diff_add_pattern", editor.diff_add_pattern),
                change: pattern("diff_change_pattern", editor.diff_change_pattern),
                delete: pattern("diff_delete_pattern", editor.diff_delete_pattern),
            },
            transparent,
            tabstop: editor.tabstop,
            font: FontSettings {
                family: self.file.font.family.clone(),
                size: self.file.font.size.max(1),
                line_space: self.file.font.line_space,
                scale,
            },
            glyph_capacity: capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn load_str(content: &str) -> Config {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), content).unwrap();
        load_from(Some(tmp.path().to_path_buf())).unwrap()
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.source.is_none());
        let ctx = cfg.render_context();
        assert_eq!(ctx.glyph_capacity, 256);
        assert!(ctx.flags.cached_drawing);
        assert!(!ctx.flags.draw_border);
        assert_eq!(ctx.tabstop, 8);
        assert_eq!(ctx.background_alpha(), 255);
    }

    #[test]
    fn parses_theme_and_editor_sections() {
        let cfg = load_str(
            "[theme]\nforeground = \"#ffffff\"\nbackground = \"#000000\"\n\
             [editor]\ndraw_border = true\nindent_guide = true\ntabstop = 4\ndiff_add_pattern = 12\n\
             [font]\nfamily = \"Iosevka\"\nsize = 16\n\
             [cache]\nglyph_capacity = 64\n",
        );
        assert!(cfg.source.is_some());
        let ctx = cfg.render_context();
        assert_eq!(ctx.theme.foreground, Rgba::WHITE);
        assert_eq!(ctx.default_colors().background, Rgba::BLACK);
        assert!(ctx.flags.draw_border && ctx.flags.indent_guide);
        assert_eq!(ctx.tabstop, 4);
        assert_eq!(ctx.diff.add, FillPattern::BackwardDiagonal);
        assert_eq!(ctx.diff.for_group("DiffAdd"), Some(FillPattern::BackwardDiagonal));
        assert_eq!(ctx.diff.for_group("DiffChange"), None);
        assert_eq!(ctx.font.family, "Iosevka");
        assert_eq!(ctx.font.line_space, 6, "unspecified font fields keep defaults");
        assert_eq!(ctx.glyph_capacity, 64);
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let cfg = load_str("[theme]\nforeground = \"not-a-color\"\n");
        assert!(cfg.source.is_none());
        assert_eq!(cfg.file, ConfigFile::default());
    }

    #[test]
    fn skip_grid_requires_both_flags() {
        let mut ctx = RenderContext::default();
        assert!(!ctx.is_skip_grid(1));
        ctx.flags.skip_global_id = true;
        assert!(ctx.is_skip_grid(1));
        assert!(!ctx.is_skip_grid(2));
        ctx.flags.ext_multigrid = false;
        assert!(!ctx.is_skip_grid(1));
    }

    #[test]
    fn fill_pattern_codes_round_trip() {
        for code in 1..=14u8 {
            assert_eq!(FillPattern::from_code(code).code(), code);
        }
        assert_eq!(FillPattern::from_code(0), FillPattern::Solid);
        assert!(FillPattern::from_code(7).is_sparse());
        assert!(!FillPattern::from_code(6).is_sparse());
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let cfg = load_str("[editor]\ntransparent = 1.7\n[cache]\nglyph_capacity = 0\n");
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let ctx = with_default(subscriber, || cfg.render_context());

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("transparent_clamped"));
        assert!(log_output.contains("glyph_capacity_clamped"));
        assert_eq!(ctx.transparent, 1.0);
        assert_eq!(ctx.glyph_capacity, 1);
    }
}

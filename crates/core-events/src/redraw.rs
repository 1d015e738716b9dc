//! Grid-oriented redraw events emitted by the editor backend.
//!
//! Every variant mirrors one tuple of the backend's `redraw` notification. The
//! decoder in [`crate::decode`] produces these from raw batches; the compositor
//! consumes them in order. Values are kept close to the wire: rows and columns
//! are signed because the backend is allowed to send out-of-range indices,
//! which the consumer drops rather than rejects.

use std::fmt;
use std::str::FromStr;

/// Identifier of one addressable grid surface.
pub type GridId = u64;

/// The always-present global grid.
pub const PRIMARY_GRID: GridId = 1;

/// One run-length-encoded group of a `grid_line` update.
///
/// `hl_id == None` means "reuse the highlight of the previous cell";
/// `repeat == None` means one column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridCell {
    pub text: String,
    pub hl_id: Option<u64>,
    pub repeat: Option<usize>,
}

impl GridCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hl_id: None,
            repeat: None,
        }
    }

    pub fn with_hl(mut self, id: u64) -> Self {
        self.hl_id = Some(id);
        self
    }

    pub fn repeated(mut self, n: usize) -> Self {
        self.repeat = Some(n);
        self
    }

    /// Number of columns covered by this group.
    pub fn span(&self) -> usize {
        self.repeat.unwrap_or(1)
    }
}

/// RGB attribute map of `hl_attr_define`. Colors are 24-bit `0xRRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HlAttrs {
    pub foreground: Option<u32>,
    pub background: Option<u32>,
    pub special: Option<u32>,
    pub reverse: bool,
    pub italic: bool,
    pub bold: bool,
    pub underline: bool,
    pub undercurl: bool,
    pub strikethrough: bool,
}

/// One entry of the `info` array attached to a highlight definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HlInfo {
    pub kind: Option<String>,
    pub id: Option<u64>,
    pub ui_name: Option<String>,
    pub hi_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HlAttrDefine {
    pub id: u64,
    pub rgb_attrs: HlAttrs,
    pub info: Vec<HlInfo>,
}

/// Corner of a floating window that is pinned to the anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatAnchor {
    #[default]
    NW,
    NE,
    SW,
    SE,
}

impl FromStr for FloatAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NW" => Ok(Self::NW),
            "NE" => Ok(Self::NE),
            "SW" => Ok(Self::SW),
            "SE" => Ok(Self::SE),
            other => Err(format!("unknown float anchor {other:?}")),
        }
    }
}

impl fmt::Display for FloatAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NW => "NW",
            Self::NE => "NE",
            Self::SW => "SW",
            Self::SE => "SE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedrawEvent {
    GridResize {
        grid: GridId,
        cols: usize,
        rows: usize,
    },
    GridClear {
        grid: GridId,
    },
    GridDestroy {
        grid: GridId,
    },
    GridLine {
        grid: GridId,
        row: i64,
        col_start: i64,
        cells: Vec<GridCell>,
    },
    /// `bot` and `right` are exclusive as sent by the backend.
    GridScroll {
        grid: GridId,
        top: i64,
        bot: i64,
        left: i64,
        right: i64,
        rows: i64,
    },
    GridCursorGoto {
        grid: GridId,
        row: i64,
        col: i64,
    },
    HlAttrDefine(HlAttrDefine),
    HlGroupSet {
        name: String,
        id: u64,
    },
    WinPos {
        grid: GridId,
        win: i64,
        row: i64,
        col: i64,
    },
    WinFloatPos {
        grid: GridId,
        win: i64,
        anchor: FloatAnchor,
        anchor_grid: GridId,
        anchor_row: f64,
        anchor_col: f64,
        focusable: bool,
    },
    WinHide {
        grid: GridId,
    },
    MsgSetPos {
        grid: GridId,
        row: i64,
    },
    /// Per-window font override for the grid under the cursor (`"Family:h14"`).
    GridFont {
        spec: String,
    },
    /// Editor mode switch; `mode` is the backend's mode name.
    ModeChange {
        mode: String,
        index: i64,
    },
    Flush,
}

impl RedrawEvent {
    /// Wire name of the event, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GridResize { .. } => "grid_resize",
            Self::GridClear { .. } => "grid_clear",
            Self::GridDestroy { .. } => "grid_destroy",
            Self::GridLine { .. } => "grid_line",
            Self::GridScroll { .. } => "grid_scroll",
            Self::GridCursorGoto { .. } => "grid_cursor_goto",
            Self::HlAttrDefine(_) => "hl_attr_define",
            Self::HlGroupSet { .. } => "hl_group_set",
            Self::WinPos { .. } => "win_pos",
            Self::WinFloatPos { .. } => "win_float_pos",
            Self::WinHide { .. } => "win_hide",
            Self::MsgSetPos { .. } => "msg_set_pos",
            Self::GridFont { .. } => "grid_font",
            Self::ModeChange { .. } => "mode_change",
            Self::Flush => "flush",
        }
    }

    /// Grid targeted by the event, if any.
    pub fn grid(&self) -> Option<GridId> {
        match self {
            Self::GridResize { grid, .. }
            | Self::GridClear { grid }
            | Self::GridDestroy { grid }
            | Self::GridLine { grid, .. }
            | Self::GridScroll { grid, .. }
            | Self::GridCursorGoto { grid, .. }
            | Self::WinPos { grid, .. }
            | Self::WinFloatPos { grid, .. }
            | Self::WinHide { grid }
            | Self::MsgSetPos { grid, .. } => Some(*grid),
            Self::HlAttrDefine(_)
            | Self::HlGroupSet { .. }
            | Self::GridFont { .. }
            | Self::ModeChange { .. }
            | Self::Flush => None,
        }
    }
}

//! Highlight attributes and the id → highlight table.

use std::sync::Arc;

use ahash::AHashMap;
use core_events::{HlAttrDefine, HlAttrs};
use tracing::trace;

use crate::color::Rgba;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct HlFlags: u8 {
        const REVERSE       = 0b0000_0001;
        const ITALIC        = 0b0000_0010;
        const BOLD          = 0b0000_0100;
        const UNDERLINE     = 0b0000_1000;
        const UNDERCURL     = 0b0001_0000;
        const STRIKETHROUGH = 0b0010_0000;
    }
}

impl From<&HlAttrs> for HlFlags {
    fn from(a: &HlAttrs) -> Self {
        let mut f = HlFlags::empty();
        f.set(HlFlags::REVERSE, a.reverse);
        f.set(HlFlags::ITALIC, a.italic);
        f.set(HlFlags::BOLD, a.bold);
        f.set(HlFlags::UNDERLINE, a.underline);
        f.set(HlFlags::UNDERCURL, a.undercurl);
        f.set(HlFlags::STRIKETHROUGH, a.strikethrough);
        f
    }
}

/// Theme fallback colors used when a highlight leaves fg/bg unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultColors {
    pub foreground: Rgba,
    pub background: Rgba,
}

impl Default for DefaultColors {
    fn default() -> Self {
        Self {
            foreground: Rgba::from_u24(0xb2b2b2),
            background: Rgba::from_u24(0x0e1013),
        }
    }
}

/// Resolved style attributes for one highlight id.
///
/// `id` is the backend attribute id (the table key); `group_id`, `ui_name`
/// and `hl_name` come from the first `info` entry of the definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Highlight {
    pub id: u64,
    pub group_id: Option<u64>,
    pub ui_name: String,
    pub hl_name: String,
    pub foreground: Option<Rgba>,
    pub background: Option<Rgba>,
    pub special: Option<Rgba>,
    pub flags: HlFlags,
}

impl Highlight {
    /// The id-0 highlight. Colors stay unset so they follow the live theme.
    pub fn theme_default() -> Self {
        Self::default()
    }

    pub fn from_define(def: &HlAttrDefine) -> Self {
        let a = &def.rgb_attrs;
        let info = def.info.first();
        Self {
            id: def.id,
            group_id: info.and_then(|i| i.id),
            ui_name: info.and_then(|i| i.ui_name.clone()).unwrap_or_default(),
            hl_name: info.and_then(|i| i.hi_name.clone()).unwrap_or_default(),
            foreground: a.foreground.map(Rgba::from_u24),
            background: a.background.map(Rgba::from_u24),
            special: a.special.map(Rgba::from_u24),
            flags: HlFlags::from(a),
        }
    }

    /// Effective foreground: background when reversed, theme default if unset.
    pub fn fg(&self, d: &DefaultColors) -> Rgba {
        if self.flags.contains(HlFlags::REVERSE) {
            self.background.unwrap_or(d.background)
        } else {
            self.foreground.unwrap_or(d.foreground)
        }
    }

    /// Effective background: foreground when reversed, theme default if unset.
    pub fn bg(&self, d: &DefaultColors) -> Rgba {
        if self.flags.contains(HlFlags::REVERSE) {
            self.foreground.unwrap_or(d.foreground)
        } else {
            self.background.unwrap_or(d.background)
        }
    }

    /// Decoration color; falls back to the effective foreground.
    pub fn special(&self, d: &DefaultColors) -> Rgba {
        self.special.unwrap_or_else(|| self.fg(d))
    }

    pub fn bold(&self) -> bool {
        self.flags.contains(HlFlags::BOLD)
    }

    pub fn italic(&self) -> bool {
        self.flags.contains(HlFlags::ITALIC)
    }

    pub fn has_decoration(&self) -> bool {
        self.flags
            .intersects(HlFlags::UNDERLINE | HlFlags::UNDERCURL | HlFlags::STRIKETHROUGH)
    }
}

/// Screen-scoped highlight table plus the group name → id side table.
#[derive(Debug, Clone)]
pub struct HighlightTable {
    defs: AHashMap<u64, Arc<Highlight>>,
    groups: AHashMap<String, u64>,
    defaults: DefaultColors,
}

impl HighlightTable {
    pub fn new(defaults: DefaultColors) -> Self {
        let mut defs = AHashMap::new();
        defs.insert(0, Arc::new(Highlight::theme_default()));
        Self {
            defs,
            groups: AHashMap::new(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &DefaultColors {
        &self.defaults
    }

    /// Theme reload. Cells holding the id-0 highlight pick up the new colors
    /// on their next paint; other definitions stay.
    pub fn set_defaults(&mut self, defaults: DefaultColors) {
        self.defaults = defaults;
    }

    /// Install or replace one definition. Id 0 always stays the theme default.
    pub fn define(&mut self, def: &HlAttrDefine) {
        if def.id == 0 {
            self.defs.insert(0, Arc::new(Highlight::theme_default()));
            return;
        }
        let hl = Highlight::from_define(def);
        trace!(target: "screen.event", id = def.id, name = %hl.hl_name, "hl_attr_define");
        self.defs.insert(def.id, Arc::new(hl));
    }

    pub fn set_group(&mut self, name: &str, id: u64) {
        self.groups.insert(name.to_owned(), id);
    }

    /// Highlight for `id`, or the id-0 default when unknown.
    pub fn get(&self, id: u64) -> Arc<Highlight> {
        match self.defs.get(&id) {
            Some(h) => Arc::clone(h),
            None => self.default_highlight(),
        }
    }

    pub fn lookup(&self, id: u64) -> Option<&Arc<Highlight>> {
        self.defs.get(&id)
    }

    pub fn default_highlight(&self) -> Arc<Highlight> {
        match self.defs.get(&0) {
            Some(h) => Arc::clone(h),
            None => Arc::new(Highlight::theme_default()),
        }
    }

    /// Highlight registered under a semantic group name (e.g. `MsgSeparator`).
    pub fn group(&self, name: &str) -> Option<Arc<Highlight>> {
        let id = self.groups.get(name)?;
        self.defs.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl Default for HighlightTable {
    fn default() -> Self {
        Self::new(DefaultColors::default())
    }
}

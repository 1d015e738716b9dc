//! Decoding of backend redraw batches into [`RedrawEvent`]s.
//!
//! A batch is a JSON array of entries `["event_name", [args...], [args...], ...]`;
//! each argument tuple after the name is one event. Decoding is lenient: a
//! malformed tuple is logged and skipped, the rest of the batch survives. Only
//! a batch that is not an array at all is an error.

use std::sync::atomic::Ordering;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{trace, warn};

use crate::DECODE_ERRORS;
use crate::redraw::{
    FloatAnchor, GridCell, GridId, HlAttrDefine, HlAttrs, HlInfo, RedrawEvent,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("redraw batch must be an array")]
    NotABatch,
    #[error("batch entry must be an array starting with an event name")]
    MalformedEntry,
    #[error("{event}: expected at least {expected} arguments, got {got}")]
    Arity {
        event: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{event}: argument {index} has an unexpected type")]
    ArgType { event: &'static str, index: usize },
}

/// Decode one redraw batch. Unknown event names are skipped silently.
pub fn decode_batch(batch: &Value) -> Result<Vec<RedrawEvent>, DecodeError> {
    let entries = batch.as_array().ok_or(DecodeError::NotABatch)?;
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some((name, tuples)) = split_entry(entry) else {
            DECODE_ERRORS.fetch_add(1, Ordering::Relaxed);
            warn!(target: "events.decode", error = %DecodeError::MalformedEntry, "skip_entry");
            continue;
        };
        if tuples.is_empty() && name == "flush" {
            out.push(RedrawEvent::Flush);
            continue;
        }
        for tuple in tuples {
            let args: &[Value] = match tuple.as_array() {
                Some(a) => a,
                None => {
                    DECODE_ERRORS.fetch_add(1, Ordering::Relaxed);
                    warn!(target: "events.decode", event = name, "tuple_not_array");
                    continue;
                }
            };
            match decode_event(name, args) {
                Ok(Some(ev)) => out.push(ev),
                Ok(None) => {
                    trace!(target: "events.decode", event = name, "unhandled_event");
                    break;
                }
                Err(e) => {
                    DECODE_ERRORS.fetch_add(1, Ordering::Relaxed);
                    warn!(target: "events.decode", error = %e, "skip_event");
                }
            }
        }
    }
    Ok(out)
}

fn split_entry(entry: &Value) -> Option<(&str, &[Value])> {
    let items = entry.as_array()?;
    let (head, rest) = items.split_first()?;
    Some((head.as_str()?, rest))
}

/// Decode a single event tuple. `Ok(None)` means the name is not one the
/// compositor consumes.
pub fn decode_event(name: &str, args: &[Value]) -> Result<Option<RedrawEvent>, DecodeError> {
    let ev = match name {
        "grid_resize" => {
            let a = Args::new("grid_resize", args, 3)?;
            RedrawEvent::GridResize {
                grid: a.uint(0)?,
                cols: a.usize(1)?,
                rows: a.usize(2)?,
            }
        }
        "grid_clear" => RedrawEvent::GridClear {
            grid: Args::new("grid_clear", args, 1)?.uint(0)?,
        },
        "grid_destroy" => RedrawEvent::GridDestroy {
            grid: Args::new("grid_destroy", args, 1)?.uint(0)?,
        },
        "grid_line" => {
            let a = Args::new("grid_line", args, 4)?;
            RedrawEvent::GridLine {
                grid: a.uint(0)?,
                row: a.int(1)?,
                col_start: a.int(2)?,
                cells: a.cells(3)?,
            }
        }
        "grid_scroll" => {
            let a = Args::new("grid_scroll", args, 6)?;
            RedrawEvent::GridScroll {
                grid: a.uint(0)?,
                top: a.int(1)?,
                bot: a.int(2)?,
                left: a.int(3)?,
                right: a.int(4)?,
                rows: a.int(5)?,
            }
        }
        "grid_cursor_goto" => {
            let a = Args::new("grid_cursor_goto", args, 3)?;
            RedrawEvent::GridCursorGoto {
                grid: a.uint(0)?,
                row: a.int(1)?,
                col: a.int(2)?,
            }
        }
        "hl_attr_define" => {
            let a = Args::new("hl_attr_define", args, 2)?;
            let info = match args.get(3) {
                Some(v) => a.info(v, 3)?,
                None => Vec::new(),
            };
            RedrawEvent::HlAttrDefine(HlAttrDefine {
                id: a.uint(0)?,
                rgb_attrs: a.attrs(1)?,
                info,
            })
        }
        "hl_group_set" => {
            let a = Args::new("hl_group_set", args, 2)?;
            RedrawEvent::HlGroupSet {
                name: a.string(0)?,
                id: a.uint(1)?,
            }
        }
        "win_pos" => {
            let a = Args::new("win_pos", args, 4)?;
            RedrawEvent::WinPos {
                grid: a.uint(0)?,
                win: a.int(1)?,
                row: a.int(2)?,
                col: a.int(3)?,
            }
        }
        "win_float_pos" => {
            let a = Args::new("win_float_pos", args, 6)?;
            let anchor: FloatAnchor = a
                .string(2)?
                .parse()
                .map_err(|_| a.type_error(2))?;
            RedrawEvent::WinFloatPos {
                grid: a.uint(0)?,
                win: a.int(1)?,
                anchor,
                anchor_grid: a.uint(3)?,
                anchor_row: a.float(4)?,
                anchor_col: a.float(5)?,
                focusable: match args.get(6) {
                    Some(v) => as_bool(v).ok_or(a.type_error(6))?,
                    None => true,
                },
            }
        }
        "win_hide" => RedrawEvent::WinHide {
            grid: Args::new("win_hide", args, 1)?.uint(0)?,
        },
        "msg_set_pos" => {
            let a = Args::new("msg_set_pos", args, 2)?;
            RedrawEvent::MsgSetPos {
                grid: a.uint(0)?,
                row: a.int(1)?,
            }
        }
        "grid_font" => RedrawEvent::GridFont {
            spec: Args::new("grid_font", args, 1)?.string(0)?,
        },
        "mode_change" => {
            let a = Args::new("mode_change", args, 2)?;
            RedrawEvent::ModeChange {
                mode: a.string(0)?,
                index: a.int(1)?,
            }
        }
        "flush" => RedrawEvent::Flush,
        _ => return Ok(None),
    };
    Ok(Some(ev))
}

/// Positional argument accessor carrying the event name for error reporting.
struct Args<'a> {
    event: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(event: &'static str, values: &'a [Value], expected: usize) -> Result<Self, DecodeError> {
        if values.len() < expected {
            return Err(DecodeError::Arity {
                event,
                expected,
                got: values.len(),
            });
        }
        Ok(Self { event, values })
    }

    fn type_error(&self, index: usize) -> DecodeError {
        DecodeError::ArgType {
            event: self.event,
            index,
        }
    }

    fn int(&self, i: usize) -> Result<i64, DecodeError> {
        as_int(&self.values[i]).ok_or(self.type_error(i))
    }

    fn uint(&self, i: usize) -> Result<u64, DecodeError> {
        let v = self.int(i)?;
        u64::try_from(v).map_err(|_| self.type_error(i))
    }

    fn usize(&self, i: usize) -> Result<usize, DecodeError> {
        let v = self.int(i)?;
        usize::try_from(v).map_err(|_| self.type_error(i))
    }

    fn float(&self, i: usize) -> Result<f64, DecodeError> {
        self.values[i].as_f64().ok_or(self.type_error(i))
    }

    fn string(&self, i: usize) -> Result<String, DecodeError> {
        self.values[i]
            .as_str()
            .map(str::to_owned)
            .ok_or(self.type_error(i))
    }

    fn cells(&self, i: usize) -> Result<Vec<GridCell>, DecodeError> {
        let raw = self.values[i].as_array().ok_or(self.type_error(i))?;
        let mut cells = Vec::with_capacity(raw.len());
        for cell in raw {
            let parts = cell.as_array().ok_or(self.type_error(i))?;
            let text = parts
                .first()
                .and_then(Value::as_str)
                .ok_or(self.type_error(i))?;
            let hl_id = match parts.get(1) {
                Some(v) => Some(as_int(v).and_then(|n| u64::try_from(n).ok()).ok_or(self.type_error(i))?),
                None => None,
            };
            let repeat = match parts.get(2) {
                Some(v) => Some(as_int(v).and_then(|n| usize::try_from(n).ok()).ok_or(self.type_error(i))?),
                None => None,
            };
            cells.push(GridCell {
                text: text.to_owned(),
                hl_id,
                repeat,
            });
        }
        Ok(cells)
    }

    fn attrs(&self, i: usize) -> Result<HlAttrs, DecodeError> {
        let map = self.values[i].as_object().ok_or(self.type_error(i))?;
        Ok(HlAttrs {
            foreground: color(map, "foreground"),
            background: color(map, "background"),
            special: color(map, "special"),
            reverse: flag(map, "reverse"),
            italic: flag(map, "italic"),
            bold: flag(map, "bold"),
            underline: flag(map, "underline"),
            undercurl: flag(map, "undercurl"),
            strikethrough: flag(map, "strikethrough"),
        })
    }

    fn info(&self, value: &Value, i: usize) -> Result<Vec<HlInfo>, DecodeError> {
        let list = value.as_array().ok_or(self.type_error(i))?;
        Ok(list
            .iter()
            .filter_map(Value::as_object)
            .map(|m| HlInfo {
                kind: text(m, "kind"),
                id: m.get("id").and_then(as_int).and_then(|n| u64::try_from(n).ok()),
                ui_name: text(m, "ui_name"),
                hi_name: text(m, "hi_name"),
            })
            .collect())
    }
}

fn as_int(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_u64().and_then(|u| i64::try_from(u).ok()))
        .or_else(|| v.as_f64().map(|f| f as i64))
}

fn as_bool(v: &Value) -> Option<bool> {
    v.as_bool().or_else(|| as_int(v).map(|n| n != 0))
}

fn color(map: &Map<String, Value>, key: &str) -> Option<u32> {
    map.get(key)
        .and_then(as_int)
        .and_then(|n| u32::try_from(n & 0xff_ffff).ok())
}

// Presence of the key turns the attribute on; an explicit `false`/`null` does not.
fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(_) => true,
    }
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_owned)
}

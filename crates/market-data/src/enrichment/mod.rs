//! Monotonic enrichment merge.
//!
//! [`Backfill`] fills only the blank parts of a destination from a source.
//! A populated field is never overwritten, so whichever source is consulted
//! first wins every contested field.
//!
//! Blankness by shape:
//!
//! | Shape | Blank when |
//! |-------|------------|
//! | `f64` / integers | zero (or NaN) |
//! | `String` | empty after trimming |
//! | `Option<T>` | `None`, or the inner value is blank |
//! | `Vec<T>` | empty; lists are copied wholesale, never element-wise |
//! | `BTreeMap<String, V>` | every value blank; merged key by key |
//! | `serde_json::Value` | null, 0, "", [] or {}; objects merged key by key |
//! | section structs | every field blank; merged field by field |

mod sections;
mod store;

pub use store::FundamentalsStore;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Fill-only merge.
pub trait Backfill {
    /// True when the value carries no information.
    fn is_blank(&self) -> bool;

    /// Fill every blank part of `self` from `source`.
    fn backfill_from(&mut self, source: &Self);
}

macro_rules! impl_leaf_backfill {
    ($($ty:ty => |$value:ident| $blank:expr;)+) => {
        $(
            impl Backfill for $ty {
                fn is_blank(&self) -> bool {
                    let $value = self;
                    $blank
                }

                fn backfill_from(&mut self, source: &Self) {
                    if self.is_blank() && !source.is_blank() {
                        *self = source.clone();
                    }
                }
            }
        )+
    };
}

impl_leaf_backfill! {
    f64 => |v| *v == 0.0 || v.is_nan();
    u64 => |v| *v == 0;
    i64 => |v| *v == 0;
    bool => |_v| false;
    String => |v| v.trim().is_empty();
    DateTime<Utc> => |_v| false;
}

impl<T: Backfill + Clone> Backfill for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Backfill::is_blank)
    }

    fn backfill_from(&mut self, source: &Self) {
        match (self.as_mut(), source) {
            (Some(dest), Some(src)) => dest.backfill_from(src),
            (None, Some(src)) if !src.is_blank() => *self = Some(src.clone()),
            _ => {}
        }
    }
}

impl<T: Clone> Backfill for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }

    fn backfill_from(&mut self, source: &Self) {
        if self.is_empty() && !source.is_empty() {
            self.clone_from(source);
        }
    }
}

impl<V: Backfill + Clone> Backfill for BTreeMap<String, V> {
    fn is_blank(&self) -> bool {
        self.values().all(Backfill::is_blank)
    }

    fn backfill_from(&mut self, source: &Self) {
        for (key, src) in source {
            match self.get_mut(key) {
                Some(dest) => dest.backfill_from(src),
                None if !src.is_blank() => {
                    self.insert(key.clone(), src.clone());
                }
                None => {}
            }
        }
    }
}

impl Backfill for Value {
    fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(_) => false,
            Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
        }
    }

    fn backfill_from(&mut self, source: &Self) {
        if let (Value::Object(dest), Value::Object(src)) = (&mut *self, source) {
            for (key, src_value) in src {
                match dest.get_mut(key) {
                    Some(dest_value) => dest_value.backfill_from(src_value),
                    None if !src_value.is_blank() => {
                        dest.insert(key.clone(), src_value.clone());
                    }
                    None => {}
                }
            }
            return;
        }
        if self.is_blank() && !source.is_blank() {
            *self = source.clone();
        }
    }
}

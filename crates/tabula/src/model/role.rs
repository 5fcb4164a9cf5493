//! Roles and cell values.
//!
//! A cell can answer several questions: what to display, what to put in an
//! editor, what to sort by. The [`ItemRole`] picks the question and the
//! answer comes back as an [`ItemData`].

use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

/// Which facet of a cell is being read or written.
///
/// Proxies take a role for filtering and another for sorting, both
/// `Display` unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    /// Text shown in the cell.
    Display,
    /// Value handed to an editor.
    Edit,
    ToolTip,
    /// Value to order by when it differs from the display text.
    Sort,
    /// Text matched by free-text search.
    Search,
    /// Application-defined roles.
    User(u32),
}

/// Answer of [`ItemModel::data_matches`](super::ItemModel::data_matches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    False,
    True,
    /// The model has no opinion; callers fall back to comparing text.
    #[default]
    Unknown,
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { TriState::True } else { TriState::False }
    }
}

/// A cell value.
///
/// Plain values cover what views and proxies need to render, match and
/// order. Anything else travels as shared, type-erased `Custom` data.
///
/// ```
/// use tabula::model::ItemData;
///
/// assert_eq!(ItemData::from("pear").to_text().as_deref(), Some("pear"));
/// assert_eq!(ItemData::new(7u8).downcast::<u8>(), Some(&7));
/// ```
#[derive(Debug, Clone, Default)]
pub enum ItemData {
    #[default]
    None,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Custom(Arc<dyn Any + Send + Sync>),
}

/// Custom values are equal only when they share one allocation.
impl PartialEq for ItemData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ItemData::None, ItemData::None) => true,
            (ItemData::String(a), ItemData::String(b)) => a == b,
            (ItemData::Int(a), ItemData::Int(b)) => a == b,
            (ItemData::Float(a), ItemData::Float(b)) => a == b,
            (ItemData::Bool(a), ItemData::Bool(b)) => a == b,
            (ItemData::Custom(a), ItemData::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl ItemData {
    /// Wraps an arbitrary value as `Custom` data.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        ItemData::Custom(Arc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ItemData::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ItemData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            ItemData::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text form of plain values; `None` and custom data have none.
    pub fn to_text(&self) -> Option<String> {
        match self {
            ItemData::String(s) => Some(s.clone()),
            ItemData::Int(n) => Some(n.to_string()),
            ItemData::Float(n) => Some(n.to_string()),
            ItemData::Bool(b) => Some(b.to_string()),
            ItemData::None | ItemData::Custom(_) => None,
        }
    }

    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            ItemData::Custom(data) => data.downcast_ref(),
            _ => None,
        }
    }

    /// Ordering used when sorting rows by value.
    ///
    /// A total order: kinds rank `None < Bool < number < String < Custom`,
    /// then values compare within their kind. Strings compare
    /// case-insensitively. Integers and floats mix freely and compare by
    /// exact value, with floats following [`f64::total_cmp`] (so a plain NaN
    /// sorts after every number). Custom values are all equal to one
    /// another.
    pub fn sort_cmp(&self, other: &ItemData) -> Ordering {
        use ItemData::*;

        self.kind_rank().cmp(&other.kind_rank()).then_with(|| match (self, other) {
            (String(a), String(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => int_float_cmp(*a, *b),
            (Float(a), Int(b)) => int_float_cmp(*b, *a).reverse(),
            _ => Ordering::Equal,
        })
    }

    fn kind_rank(&self) -> u8 {
        match self {
            ItemData::None => 0,
            ItemData::Bool(_) => 1,
            ItemData::Int(_) | ItemData::Float(_) => 2,
            ItemData::String(_) => 3,
            ItemData::Custom(_) => 4,
        }
    }
}

/// Exact comparison of an integer with a float, consistent with
/// `f64::total_cmp` between floats.
fn int_float_cmp(int: i64, float: f64) -> Ordering {
    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    // Rounding to f64 is monotone, so a strict answer here is exact.
    match (int as f64).total_cmp(&float) {
        Ordering::Equal if float >= i64::MAX as f64 => Ordering::Less,
        Ordering::Equal => int.cmp(&(float as i64)),
        ordering => ordering,
    }
}

impl From<String> for ItemData {
    fn from(s: String) -> Self {
        ItemData::String(s)
    }
}

impl From<&str> for ItemData {
    fn from(s: &str) -> Self {
        ItemData::String(s.to_owned())
    }
}

impl From<i64> for ItemData {
    fn from(n: i64) -> Self {
        ItemData::Int(n)
    }
}

impl From<i32> for ItemData {
    fn from(n: i32) -> Self {
        ItemData::Int(n.into())
    }
}

impl From<f64> for ItemData {
    fn from(n: f64) -> Self {
        ItemData::Float(n)
    }
}

impl From<bool> for ItemData {
    fn from(b: bool) -> Self {
        ItemData::Bool(b)
    }
}

impl<T: Into<ItemData>> From<Option<T>> for ItemData {
    fn from(value: Option<T>) -> Self {
        value.map_or(ItemData::None, Into::into)
    }
}

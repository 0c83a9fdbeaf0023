use std::fmt;
use std::rc::Rc;

/// Stable identity of a data item, independent of its current index.
///
/// Keys survive insertions and removals, which is what lets the engine keep
/// measured sizes and container bindings attached to the right content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Num(u64),
    Str(Rc<str>),
}

impl ItemKey {
    pub fn as_num(&self) -> Option<u64> {
        match self {
            ItemKey::Num(value) => Some(*value),
            ItemKey::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ItemKey::Num(_) => None,
            ItemKey::Str(value) => Some(value),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Num(value) => write!(f, "{value}"),
            ItemKey::Str(value) => f.write_str(value),
        }
    }
}

impl From<u64> for ItemKey {
    fn from(value: u64) -> Self {
        ItemKey::Num(value)
    }
}

impl From<usize> for ItemKey {
    fn from(value: usize) -> Self {
        ItemKey::Num(value as u64)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        ItemKey::Str(Rc::from(value))
    }
}

impl From<String> for ItemKey {
    fn from(value: String) -> Self {
        ItemKey::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for ItemKey {
    fn from(value: Rc<str>) -> Self {
        ItemKey::Str(value)
    }
}

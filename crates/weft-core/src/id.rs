use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for entity IDs — fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for store entities (pages, components,
/// APIs, queries, datasources).
/// Internally a `Spur` index — 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Spur);

impl EntityId {
    /// Intern a new string as an EntityId, or return existing if already interned.
    pub fn intern(s: &str) -> Self {
        EntityId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EntityId::intern(&s))
    }
}

/// Generator for fresh `{prefix}-{n}` entity IDs.
///
/// Each add operation draws the next counter value, so IDs are unique within
/// a session. After rehydrating a persisted snapshot, call [`IdGen::observe`]
/// on every loaded ID so the counter skips past numbers already in use.
#[derive(Debug)]
pub struct IdGen {
    counter: AtomicU64,
}

impl IdGen {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate a unique ID with a type prefix (e.g. `button-1`, `page-2`).
    pub fn next(&self, prefix: &str) -> EntityId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        EntityId::intern(&format!("{prefix}-{n}"))
    }

    /// Bump the counter past an existing ID's numeric suffix, if it has one.
    pub fn observe(&self, id: &str) {
        if let Some((_, suffix)) = id.rsplit_once('-')
            && let Ok(n) = suffix.parse::<u64>()
        {
            self.counter.fetch_max(n + 1, Ordering::Relaxed);
        }
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

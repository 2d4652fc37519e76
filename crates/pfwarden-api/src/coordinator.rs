// Concurrency coordinator
//
// The console addresses records for edit/delete by their offset in an
// ordered list, and offsets shift whenever anything earlier in the list is
// removed. Mutations are therefore serialized: per category always, and
// across all categories when `serialize_all_writes` is set.

use std::fmt;

use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

const CATEGORY_COUNT: usize = 5;

/// A group of resources guarded by one lock.
///
/// IP and port aliases share [`Aliases`](Self::Aliases) because they live in
/// the same list on the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockCategory {
    Aliases,
    DhcpStaticMappings,
    DnsDomainOverrides,
    DnsHostOverrides,
    ScriptExecution,
}

impl LockCategory {
    pub const ALL: [Self; CATEGORY_COUNT] = [
        Self::Aliases,
        Self::DhcpStaticMappings,
        Self::DnsDomainOverrides,
        Self::DnsHostOverrides,
        Self::ScriptExecution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aliases => "aliases",
            Self::DhcpStaticMappings => "dhcp_static_mappings",
            Self::DnsDomainOverrides => "dns_domain_overrides",
            Self::DnsHostOverrides => "dns_host_overrides",
            Self::ScriptExecution => "script_execution",
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Aliases => 0,
            Self::DhcpStaticMappings => 1,
            Self::DnsDomainOverrides => 2,
            Self::DnsHostOverrides => 3,
            Self::ScriptExecution => 4,
        }
    }
}

impl fmt::Display for LockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared hold on one category. Released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    _category: RwLockReadGuard<'a, ()>,
}

/// Exclusive hold on one or more categories, plus the global write lock when
/// serialization is on. Released on drop: categories first, then global.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    // Field order is drop order.
    _categories: Vec<RwLockWriteGuard<'a, ()>>,
    _global: Option<MutexGuard<'a, ()>>,
}

/// The lock matrix owned by one client instance.
#[derive(Debug)]
pub struct Coordinator {
    serialize_all_writes: bool,
    global: Mutex<()>,
    categories: [RwLock<()>; CATEGORY_COUNT],
}

impl Coordinator {
    pub fn new(serialize_all_writes: bool) -> Self {
        Self {
            serialize_all_writes,
            global: Mutex::new(()),
            categories: std::array::from_fn(|_| RwLock::new(())),
        }
    }

    pub fn serializes_all_writes(&self) -> bool {
        self.serialize_all_writes
    }

    /// Shared lock on `category`. Readers never block each other.
    pub async fn acquire_read(&self, category: LockCategory) -> ReadGuard<'_> {
        let guard = self.lock(category).read().await;
        trace!(%category, "read lock acquired");
        ReadGuard { _category: guard }
    }

    /// Exclusive lock on `category`.
    pub async fn acquire_write(&self, category: LockCategory) -> WriteGuard<'_> {
        self.acquire_write_many(&[category]).await
    }

    /// Exclusive lock on several categories at once.
    ///
    /// The global lock (if any) is taken first, then the categories in a
    /// fixed order, so overlapping callers cannot deadlock.
    pub async fn acquire_write_many(&self, categories: &[LockCategory]) -> WriteGuard<'_> {
        let global = if self.serialize_all_writes {
            let guard = self.global.lock().await;
            trace!("global write lock acquired");
            Some(guard)
        } else {
            None
        };

        let mut ordered = categories.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut held = Vec::with_capacity(ordered.len());
        for category in ordered {
            held.push(self.lock(category).write().await);
            trace!(%category, "write lock acquired");
        }

        WriteGuard {
            _categories: held,
            _global: global,
        }
    }

    fn lock(&self, category: LockCategory) -> &RwLock<()> {
        &self.categories[category.slot()]
    }
}

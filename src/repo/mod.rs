//! Entity repositories.
//!
//! Each repository borrows the shared [`Backend`] and converts identifiers at the store
//! boundary: local numeric ids go out as remote ids resolved through the registry, and
//! every record that comes back is interned so later lookups can resolve it.

mod activity;
mod assignment;
mod category;
mod team;
mod user;

pub use activity::ActivityRepo;
pub use assignment::{validate_grade, AssignmentRepo};
pub use category::CategoryRepo;
pub use team::TeamRepo;
pub use user::UserRepo;

use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::error::{CoreError, CoreResult};
use crate::registry::{IdRegistry, Registries};
use crate::store::{extract_remote_id, Record, RecordStore};
use tracing::debug;

/// The store client, id registries and clock one workspace runs against.
pub struct Backend {
    pub store: Box<dyn RecordStore>,
    pub ids: Registries,
    pub clock: Box<dyn Clock>,
}

impl Backend {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self::with_clock(store, Box::new(SystemClock))
    }

    pub fn with_clock(store: Box<dyn RecordStore>, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            ids: Registries::new(),
            clock,
        }
    }

    pub fn categories(&self) -> CategoryRepo<'_> {
        CategoryRepo::new(self)
    }

    pub fn teams(&self) -> TeamRepo<'_> {
        TeamRepo::new(self)
    }

    pub fn assignments(&self) -> AssignmentRepo<'_> {
        AssignmentRepo::new(self)
    }

    pub fn activities(&self) -> ActivityRepo<'_> {
        ActivityRepo::new(self)
    }

    pub fn users(&self) -> UserRepo<'_> {
        UserRepo::new(self)
    }
}

/// Create a record and return its remote id.
fn create_record(store: &dyn RecordStore, collection: &str, record: Record) -> CoreResult<String> {
    let resp = store.create(collection, record)?;
    extract_remote_id(&resp).ok_or_else(|| CoreError::Creation {
        collection: collection.to_string(),
    })
}

/// Create a record and register the local id derived from its remote id.
fn create_mapped(
    store: &dyn RecordStore,
    ids: &IdRegistry,
    collection: &str,
    record: Record,
) -> CoreResult<i64> {
    let remote = create_record(store, collection, record)?;
    let local = codec::local_id(&remote);
    ids.register(&remote, local);
    debug!(collection, local_id = local, remote_id = %remote, "created record");
    Ok(local)
}

/// Remote id for a mutating operation. Never guesses.
fn require_remote(ids: &IdRegistry, local_id: i64) -> CoreResult<String> {
    ids.resolve_remote(local_id)
        .ok_or(CoreError::Resolution {
            kind: ids.kind(),
            local_id,
        })
}

/// Remote id for a read. An unmapped id triggers one full listing (which interns every
/// record of the kind) and is retried against that index.
fn resolve_for_read<F>(ids: &IdRegistry, local_id: i64, build_index: F) -> CoreResult<Option<String>>
where
    F: FnOnce() -> CoreResult<()>,
{
    if let Some(remote) = ids.resolve_remote(local_id) {
        return Ok(Some(remote));
    }
    if ids.is_indexed() {
        return Ok(None);
    }
    debug!(kind = %ids.kind(), local_id, "unmapped id; building index from full listing");
    build_index()?;
    Ok(ids.resolve_remote(local_id))
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Backend;
    use crate::clock::ManualClock;
    use crate::store::MemoryRecordStore;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
            .single()
            .expect("fixed date")
    }

    /// Backend over an in-memory store the test keeps a handle to.
    pub struct Harness {
        pub store: Arc<MemoryRecordStore>,
        pub clock: Arc<ManualClock>,
        pub backend: Backend,
    }

    pub fn harness() -> Harness {
        harness_with(MemoryRecordStore::new())
    }

    pub fn harness_with(store: MemoryRecordStore) -> Harness {
        let store = Arc::new(store);
        let clock = Arc::new(ManualClock::at(t0()));
        let backend = Backend::with_clock(Box::new(store.clone()), Box::new(clock.clone()));
        Harness {
            store,
            clock,
            backend,
        }
    }
}

use crate::codec;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    Team,
    Activity,
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Team => "team",
            EntityKind::Activity => "activity",
            EntityKind::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" | "categories" => Some(EntityKind::Category),
            "team" | "teams" => Some(EntityKind::Team),
            "activity" | "activities" => Some(EntityKind::Activity),
            "user" | "users" => Some(EntityKind::User),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct Maps {
    local_to_remote: HashMap<i64, String>,
    remote_to_local: HashMap<String, i64>,
    // Set once a full listing has registered every record of this kind.
    indexed: bool,
}

/// Bidirectional map between local numeric ids and remote record ids for one entity kind.
///
/// Every mutation keeps the two directions consistent: re-registering either side evicts
/// the stale counterpart, so the map stays a bijection.
#[derive(Debug)]
pub struct IdRegistry {
    kind: EntityKind,
    maps: Mutex<Maps>,
}

impl IdRegistry {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            maps: Mutex::new(Maps::default()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn lock(&self) -> MutexGuard<'_, Maps> {
        // A panic while holding the lock cannot leave the maps half-updated, so recover.
        self.maps.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Map `remote_id` to `local_id`, replacing whatever either side was mapped to.
    pub fn register(&self, remote_id: &str, local_id: i64) {
        let mut maps = self.lock();
        Self::insert_locked(self.kind, &mut maps, remote_id, local_id);
    }

    /// Derive the local id for `remote_id` and register it in one step.
    pub fn intern(&self, remote_id: &str) -> i64 {
        let mut maps = self.lock();
        if let Some(local) = maps.remote_to_local.get(remote_id) {
            return *local;
        }
        let local = codec::local_id(remote_id);
        Self::insert_locked(self.kind, &mut maps, remote_id, local);
        local
    }

    fn insert_locked(kind: EntityKind, maps: &mut Maps, remote_id: &str, local_id: i64) {
        if let Some(prev_remote) = maps.local_to_remote.get(&local_id) {
            if prev_remote == remote_id {
                return;
            }
            warn!(
                kind = %kind,
                local_id,
                previous = %prev_remote,
                remote_id,
                "local id collision; remapping"
            );
            let prev_remote = prev_remote.clone();
            maps.remote_to_local.remove(&prev_remote);
        }
        if let Some(prev_local) = maps.remote_to_local.get(remote_id).copied() {
            maps.local_to_remote.remove(&prev_local);
        }
        maps.local_to_remote.insert(local_id, remote_id.to_string());
        maps.remote_to_local.insert(remote_id.to_string(), local_id);
        debug!(kind = %kind, local_id, remote_id, "registered id mapping");
    }

    pub fn resolve_remote(&self, local_id: i64) -> Option<String> {
        self.lock().local_to_remote.get(&local_id).cloned()
    }

    pub fn resolve_local(&self, remote_id: &str) -> Option<i64> {
        self.lock().remote_to_local.get(remote_id).copied()
    }

    pub fn unregister(&self, local_id: i64) -> Option<String> {
        let mut maps = self.lock();
        let remote = maps.local_to_remote.remove(&local_id)?;
        maps.remote_to_local.remove(&remote);
        debug!(kind = %self.kind, local_id, remote_id = %remote, "unregistered id mapping");
        Some(remote)
    }

    /// Number of local ids currently mapped.
    pub fn mapped(&self) -> usize {
        self.lock().local_to_remote.len()
    }

    pub fn is_indexed(&self) -> bool {
        self.lock().indexed
    }

    pub fn mark_indexed(&self) {
        self.lock().indexed = true;
    }

    /// Forget that a full listing happened, so the next unmapped lookup rebuilds the index.
    pub fn invalidate_index(&self) {
        self.lock().indexed = false;
    }
}

/// One registry per numerically-mapped entity kind. Assignments are keyed by remote id only.
#[derive(Debug)]
pub struct Registries {
    pub categories: IdRegistry,
    pub teams: IdRegistry,
    pub activities: IdRegistry,
    pub users: IdRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self {
            categories: IdRegistry::new(EntityKind::Category),
            teams: IdRegistry::new(EntityKind::Team),
            activities: IdRegistry::new(EntityKind::Activity),
            users: IdRegistry::new(EntityKind::User),
        }
    }

    pub fn for_kind(&self, kind: EntityKind) -> &IdRegistry {
        match kind {
            EntityKind::Category => &self.categories,
            EntityKind::Team => &self.teams,
            EntityKind::Activity => &self.activities,
            EntityKind::User => &self.users,
        }
    }

    pub fn invalidate_indexes(&self) {
        self.categories.invalidate_index();
        self.teams.invalidate_index();
        self.activities.invalidate_index();
        self.users.invalidate_index();
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_resolve_both_ways() {
        let reg = IdRegistry::new(EntityKind::Team);
        reg.register("rec-abc", 42);
        assert_eq!(reg.resolve_remote(42).as_deref(), Some("rec-abc"));
        assert_eq!(reg.resolve_local("rec-abc"), Some(42));
    }

    #[test]
    fn re_registration_is_idempotent() {
        let reg = IdRegistry::new(EntityKind::Team);
        reg.register("rec-abc", 42);
        reg.register("rec-abc", 42);
        assert_eq!(reg.mapped(), 1);
    }

    #[test]
    fn overwrite_keeps_bijection() {
        let reg = IdRegistry::new(EntityKind::Category);
        reg.register("r1", 1);
        reg.register("r2", 1);
        assert_eq!(reg.resolve_remote(1).as_deref(), Some("r2"));
        assert_eq!(reg.resolve_local("r1"), None);

        reg.register("r2", 7);
        assert_eq!(reg.resolve_remote(1), None);
        assert_eq!(reg.resolve_remote(7).as_deref(), Some("r2"));
        assert_eq!(reg.mapped(), 1);
    }

    #[test]
    fn intern_uses_codec_and_is_stable() {
        let reg = IdRegistry::new(EntityKind::User);
        let a = reg.intern("user-1");
        assert_eq!(a, codec::local_id("user-1"));
        assert_eq!(reg.intern("user-1"), a);
        assert_eq!(reg.resolve_remote(a).as_deref(), Some("user-1"));
    }

    #[test]
    fn unregister_removes_both_directions() {
        let reg = IdRegistry::new(EntityKind::Activity);
        reg.register("r1", 5);
        assert_eq!(reg.unregister(5).as_deref(), Some("r1"));
        assert_eq!(reg.resolve_local("r1"), None);
        assert_eq!(reg.unregister(5), None);
        assert_eq!(reg.mapped(), 0);
    }

    #[test]
    fn unmapped_lookup_is_none() {
        let regs = Registries::new();
        assert_eq!(regs.teams.resolve_remote(999), None);
        assert_eq!(regs.for_kind(EntityKind::Team).kind(), EntityKind::Team);
    }

    #[test]
    fn kind_parse_accepts_plural() {
        assert_eq!(EntityKind::parse("Teams"), Some(EntityKind::Team));
        assert_eq!(EntityKind::parse("assignment"), None);
    }
}

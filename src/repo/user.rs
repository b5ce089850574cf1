use super::{contains_ci, create_mapped, require_remote, resolve_for_read, Backend};
use crate::clock::Clock;
use crate::codec;
use crate::dto::{self, str_field};
use crate::error::{CoreError, CoreResult};
use crate::model::{normalize_email, Role, User};
use crate::registry::IdRegistry;
use crate::store::{Record, RecordStore, USERS};
use serde_json::json;

const ROLE: &[&str] = &["role", "rol"];

pub struct UserRepo<'a> {
    store: &'a dyn RecordStore,
    ids: &'a IdRegistry,
    clock: &'a dyn Clock,
}

impl<'a> UserRepo<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self {
            store: backend.store.as_ref(),
            ids: &backend.ids.users,
            clock: backend.clock.as_ref(),
        }
    }

    fn from_record(&self, r: &Record) -> Option<User> {
        let email = normalize_email(&str_field(r, &["email", "correo"]).unwrap_or_default());
        let remote_id = dto::remote_id(r).unwrap_or_default();
        let id = if !remote_id.is_empty() {
            self.ids.intern(&remote_id)
        } else if !email.is_empty() {
            // No remote identity to register; derive from the email only.
            codec::local_id(&email)
        } else {
            return None;
        };
        Some(User {
            id,
            remote_id,
            name: str_field(r, &["name", "nombre"]).unwrap_or_default(),
            email,
            role: str_field(r, ROLE)
                .and_then(|s| Role::parse(&s))
                .unwrap_or_default(),
        })
    }

    fn to_record(u: &User) -> Record {
        let mut r = Record::new();
        r.insert("name".into(), json!(u.name.trim()));
        r.insert("email".into(), json!(normalize_email(&u.email)));
        r.insert("role".into(), json!(u.role.as_str()));
        r
    }

    fn translate(&self, rows: Vec<Record>) -> Vec<User> {
        rows.iter().filter_map(|r| self.from_record(r)).collect()
    }

    pub fn create(&self, u: &User) -> CoreResult<i64> {
        if u.name.trim().is_empty() {
            return Err(CoreError::validation("user name must not be empty"));
        }
        let email = normalize_email(&u.email);
        let well_formed = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !well_formed {
            return Err(CoreError::validation(format!("invalid email: {}", u.email.trim())));
        }
        if self.find_by_email(&email)?.is_some() {
            return Err(CoreError::validation(format!("email {email} is already registered")));
        }
        create_mapped(self.store, self.ids, USERS, Self::to_record(u))
    }

    pub fn list(&self, role: Option<Role>) -> CoreResult<Vec<User>> {
        // Roles are stored in more than one spelling; filter after mapping.
        let rows = self.store.read(USERS, &[])?;
        let out = self.translate(rows);
        self.ids.mark_indexed();
        Ok(match role {
            Some(r) => out.into_iter().filter(|u| u.role == r).collect(),
            None => out,
        })
    }

    pub fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }
        let rows = self.store.get_where(USERS, "email", &json!(email))?;
        if let Some(u) = self.translate(rows).into_iter().next() {
            return Ok(Some(u));
        }
        // Older records may hold the address unnormalized.
        Ok(self.list(None)?.into_iter().find(|u| u.email == email))
    }

    /// Case-insensitive match on name or email.
    pub fn search(&self, query: &str) -> CoreResult<Vec<User>> {
        let q = query.trim().to_lowercase();
        Ok(self
            .list(None)?
            .into_iter()
            .filter(|u| q.is_empty() || contains_ci(&u.name, &q) || u.email.contains(&q))
            .collect())
    }

    pub fn get_by_id(&self, id: i64) -> CoreResult<Option<User>> {
        let Some(remote) = resolve_for_read(self.ids, id, || self.list(None).map(|_| ()))? else {
            return Ok(None);
        };
        match self.store.get_by_id(USERS, &remote)? {
            Some(r) => Ok(self.from_record(&r)),
            None => {
                self.ids.unregister(id);
                Ok(None)
            }
        }
    }

    pub fn update(&self, u: &User) -> CoreResult<()> {
        let remote = require_remote(self.ids, u.id)?;
        if u.name.trim().is_empty() {
            return Err(CoreError::validation("user name must not be empty"));
        }
        self.store.update(USERS, &remote, Self::to_record(u))?;
        Ok(())
    }

    pub fn delete(&self, id: i64) -> CoreResult<()> {
        let remote = require_remote(self.ids, id)?;
        self.store.delete(USERS, &remote)?;
        self.ids.unregister(id);
        Ok(())
    }

    /// Local id for a user that has no remote record yet, derived from the email or,
    /// failing that, from the current time.
    pub fn provisional_id(&self, email: &str) -> i64 {
        codec::local_id_or(&normalize_email(email), self.clock.now().timestamp_millis())
    }
}

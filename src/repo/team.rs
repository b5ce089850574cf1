use super::{contains_ci, create_mapped, require_remote, resolve_for_read, Backend, CategoryRepo};
use crate::dto::{self, i64_field, str_field};
use crate::error::{CoreError, CoreResult};
use crate::model::Team;
use crate::registry::IdRegistry;
use crate::store::{Filter, Record, RecordStore, TEAMS};
use serde_json::{json, Value};

const CATEGORY_ID: &[&str] = &["category_id", "categoryId", "categoria_id"];
const MEMBER_IDS: &[&str] = &["member_ids", "memberIds", "members", "student_ids"];

pub struct TeamRepo<'a> {
    backend: &'a Backend,
    store: &'a dyn RecordStore,
    ids: &'a IdRegistry,
}

impl<'a> TeamRepo<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self {
            backend,
            store: backend.store.as_ref(),
            ids: &backend.ids.teams,
        }
    }

    fn categories(&self) -> CategoryRepo<'a> {
        CategoryRepo::new(self.backend)
    }

    fn from_record(&self, r: &Record) -> Option<Team> {
        let remote_id = dto::remote_id(r)?;
        Some(Team {
            id: self.ids.intern(&remote_id),
            remote_id,
            category_id: i64_field(r, CATEGORY_ID).unwrap_or_default(),
            name: str_field(r, &["name"]).unwrap_or_default(),
            member_ids: dto::field(r, MEMBER_IDS)
                .map(dto::coerce_id_list)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            description: str_field(r, &["description"]).filter(|s| !s.trim().is_empty()),
            color: str_field(r, &["color"]).filter(|s| !s.trim().is_empty()),
        })
    }

    fn to_record(t: &Team) -> Record {
        let mut r = Record::new();
        r.insert("category_id".into(), json!(t.category_id));
        r.insert("name".into(), json!(t.name.trim()));
        r.insert("member_ids".into(), json!(t.member_ids));
        r.insert(
            "description".into(),
            t.description.clone().map(Value::String).unwrap_or(Value::Null),
        );
        r.insert(
            "color".into(),
            t.color.clone().map(Value::String).unwrap_or(Value::Null),
        );
        r
    }

    fn translate(&self, rows: Vec<Record>) -> Vec<Team> {
        rows.iter().filter_map(|r| self.from_record(r)).collect()
    }

    fn validate(&self, t: &Team) -> CoreResult<()> {
        if t.name.trim().is_empty() {
            return Err(CoreError::validation("team name must not be empty"));
        }
        let taken = self
            .list_by_category(t.category_id)?
            .into_iter()
            .any(|other| other.id != t.id && other.name.trim().eq_ignore_ascii_case(t.name.trim()));
        if taken {
            return Err(CoreError::validation(format!(
                "a team named '{}' already exists in this category",
                t.name.trim()
            )));
        }
        Ok(())
    }

    pub fn create(&self, t: &Team) -> CoreResult<i64> {
        let fresh = Team { id: 0, ..t.clone() };
        if !self.categories().exists(fresh.category_id)? {
            return Err(CoreError::validation(format!(
                "category {} does not exist",
                fresh.category_id
            )));
        }
        self.validate(&fresh)?;
        create_mapped(self.store, self.ids, TEAMS, Self::to_record(&fresh))
    }

    pub fn list_all(&self) -> CoreResult<Vec<Team>> {
        let rows = self.store.read(TEAMS, &[])?;
        let out = self.translate(rows);
        self.ids.mark_indexed();
        Ok(out)
    }

    pub fn list_by_category(&self, category_id: i64) -> CoreResult<Vec<Team>> {
        let rows = self
            .store
            .read(TEAMS, &[Filter::any_of(CATEGORY_ID, category_id)])?;
        Ok(self.translate(rows))
    }

    /// Teams the user belongs to, optionally limited to one category.
    pub fn list_for_member(&self, user_id: i64, category_id: Option<i64>) -> CoreResult<Vec<Team>> {
        let teams = match category_id {
            Some(c) => self.list_by_category(c)?,
            None => self.list_all()?,
        };
        Ok(teams
            .into_iter()
            .filter(|t| t.member_ids.contains(&user_id))
            .collect())
    }

    /// Case-insensitive match on name or description.
    pub fn search(&self, category_id: i64, query: &str) -> CoreResult<Vec<Team>> {
        let q = query.trim().to_lowercase();
        let teams = self.list_by_category(category_id)?;
        if q.is_empty() {
            return Ok(teams);
        }
        Ok(teams
            .into_iter()
            .filter(|t| {
                contains_ci(&t.name, &q)
                    || t.description.as_deref().map(|d| contains_ci(d, &q)).unwrap_or(false)
            })
            .collect())
    }

    pub fn get_by_id(&self, id: i64) -> CoreResult<Option<Team>> {
        let Some(remote) = resolve_for_read(self.ids, id, || self.list_all().map(|_| ()))? else {
            return Ok(None);
        };
        match self.store.get_by_id(TEAMS, &remote)? {
            Some(r) => Ok(self.from_record(&r)),
            None => {
                self.ids.unregister(id);
                Ok(None)
            }
        }
    }

    pub fn update(&self, t: &Team) -> CoreResult<()> {
        let remote = require_remote(self.ids, t.id)?;
        self.validate(t)?;
        self.store.update(TEAMS, &remote, Self::to_record(t))?;
        Ok(())
    }

    /// Delete the team record only. Use the cascade to remove its assignments first.
    pub fn delete_record(&self, id: i64) -> CoreResult<()> {
        let remote = require_remote(self.ids, id)?;
        self.store.delete(TEAMS, &remote)?;
        self.ids.unregister(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CoreError;
    use crate::model::{Category, Team};
    use crate::repo::testing::{harness, Harness};
    use crate::store::{Record, TEAMS};
    use serde_json::json;

    fn with_category(h: &Harness, name: &str) -> i64 {
        h.backend
            .categories()
            .create(&Category {
                name: name.to_string(),
                course_id: 1,
                max_members: 3,
                ..Category::default()
            })
            .expect("category")
    }

    fn team(category_id: i64, name: &str, members: &[i64]) -> Team {
        Team {
            category_id,
            name: name.to_string(),
            member_ids: members.iter().copied().collect(),
            ..Team::default()
        }
    }

    #[test]
    fn create_then_resolve_round_trips_through_registry() {
        let h = harness();
        let mut r = Record::new();
        r.insert("name".into(), json!("Course 42 groups"));
        h.store.seed(crate::store::CATEGORIES, "cat-42", r);
        h.backend.ids.categories.register("cat-42", 42);

        let repo = h.backend.teams();
        let id = repo.create(&team(42, "Alpha", &[])).expect("create");
        let remote = h.backend.ids.teams.resolve_remote(id).expect("mapped");
        assert!(!remote.is_empty());

        let got = repo.get_by_id(id).expect("get").expect("some");
        assert_eq!(got.name, "Alpha");
        assert_eq!(got.category_id, 42);
        assert_eq!(got.remote_id, remote);
    }

    #[test]
    fn create_requires_existing_category() {
        let h = harness();
        let err = h.backend.teams().create(&team(77, "Ghost", &[])).expect_err("no category");
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(h.store.count(TEAMS), 0);
    }

    #[test]
    fn duplicate_team_names_are_rejected_per_category() {
        let h = harness();
        let cat = with_category(&h, "Labs");
        let repo = h.backend.teams();
        repo.create(&team(cat, "Alpha", &[])).expect("create");
        let err = repo.create(&team(cat, "ALPHA", &[])).expect_err("duplicate");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn member_and_search_queries_filter_client_side() {
        let h = harness();
        let cat = with_category(&h, "Labs");
        let repo = h.backend.teams();
        let mut a = team(cat, "Alpha", &[1, 2]);
        a.description = Some("Robotics crew".into());
        repo.create(&a).expect("a");
        repo.create(&team(cat, "Beta", &[2, 3])).expect("b");

        let for_one: Vec<_> = repo
            .list_for_member(1, Some(cat))
            .expect("member")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(for_one, vec!["Alpha".to_string()]);
        assert_eq!(repo.list_for_member(2, None).expect("member").len(), 2);

        let hits = repo.search(cat, "robot").expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Alpha");
        assert_eq!(repo.search(cat, "  ").expect("search").len(), 2);
    }

    #[test]
    fn update_persists_members() {
        let h = harness();
        let cat = with_category(&h, "Labs");
        let repo = h.backend.teams();
        let id = repo.create(&team(cat, "Alpha", &[1])).expect("create");
        let mut t = repo.get_by_id(id).expect("get").expect("some");
        t.member_ids.insert(9);
        repo.update(&t).expect("update");
        let got = repo.get_by_id(id).expect("get").expect("some");
        assert!(got.member_ids.contains(&9));
    }

    #[test]
    fn unmapped_lookup_returns_none() {
        let h = harness();
        assert!(h.backend.teams().get_by_id(999).expect("get").is_none());
    }
}

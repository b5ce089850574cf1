//! Listing controller: the read-through cache in front of category and team listings.
//!
//! Read failures degrade to an empty list (and are not cached) so listing screens stay
//! usable. Callers that mutate categories or teams must call [`Listings::invalidate_all`].

use crate::cache::{ReadThroughCache, TtlPolicy};
use crate::model::{Category, Team};
use crate::repo::Backend;
use chrono::Duration;
use tracing::{debug, warn};

pub struct Listings {
    categories: ReadThroughCache<i64, Vec<Category>>,
    teams: ReadThroughCache<i64, Vec<Team>>,
}

impl Listings {
    pub fn new(ttl: Duration, policy: TtlPolicy) -> Self {
        Self {
            categories: ReadThroughCache::new(ttl, policy),
            teams: ReadThroughCache::new(ttl, policy),
        }
    }

    pub fn categories_for_course(&mut self, backend: &Backend, course_id: i64) -> Vec<Category> {
        let now = backend.clock.now();
        self.categories
            .get_or_load(course_id, now, || {
                debug!(course_id, "loading categories");
                backend.categories().list_by_course(course_id)
            })
            .unwrap_or_else(|e| {
                warn!(course_id, error = %e, "category listing failed");
                Vec::new()
            })
    }

    pub fn teams_for_category(&mut self, backend: &Backend, category_id: i64) -> Vec<Team> {
        let now = backend.clock.now();
        self.teams
            .get_or_load(category_id, now, || {
                debug!(category_id, "loading teams");
                backend.teams().list_by_category(category_id)
            })
            .unwrap_or_else(|e| {
                warn!(category_id, error = %e, "team listing failed");
                Vec::new()
            })
    }

    pub fn invalidate_all(&mut self) {
        self.categories.invalidate_all();
        self.teams.invalidate_all();
    }
}

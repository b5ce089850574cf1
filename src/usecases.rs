use crate::cascade::{Cascade, CascadeReport};
use crate::error::{CoreError, CoreResult};
use crate::model::{Assignment, AssignmentMode, AssignmentStatus, Team};
use crate::repo::{validate_grade, Backend};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashSet};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct AssignOutcome {
    pub created: Vec<String>,
    pub skipped_team_ids: Vec<i64>,
}

/// Operations that span several repositories.
pub struct Courses<'a> {
    backend: &'a Backend,
}

impl<'a> Courses<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    pub fn delete_category(&self, category_id: i64) -> CoreResult<CascadeReport> {
        Cascade::new(self.backend).delete_category(category_id)
    }

    pub fn delete_team(&self, team_id: i64) -> CoreResult<CascadeReport> {
        Cascade::new(self.backend).delete_team(team_id)
    }

    pub fn delete_activity(&self, activity_id: i64) -> CoreResult<CascadeReport> {
        Cascade::new(self.backend).delete_activity(activity_id)
    }

    /// Split `student_ids` into teams of at most `max_members` for the category.
    ///
    /// `random` categories get shuffled students dealt round-robin, so team sizes differ
    /// by at most one. `manual` categories get the same number of empty teams.
    pub fn generate_teams<R: Rng + ?Sized>(
        &self,
        category_id: i64,
        student_ids: &[i64],
        rng: &mut R,
    ) -> CoreResult<Vec<i64>> {
        let categories = self.backend.categories();
        let teams = self.backend.teams();
        let category = categories
            .get_by_id(category_id)?
            .ok_or_else(|| CoreError::not_found(format!("category {category_id}")))?;
        if category.teams_generated {
            return Err(CoreError::validation("teams were already generated for this category"));
        }

        let mut seen = HashSet::new();
        let mut students: Vec<i64> = student_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if students.is_empty() {
            return Err(CoreError::validation("no students to place in teams"));
        }
        let max = category.max_members.max(1) as usize;
        let team_count = students.len().div_ceil(max);

        let mut members: Vec<BTreeSet<i64>> = vec![BTreeSet::new(); team_count];
        if category.mode == AssignmentMode::Random {
            students.shuffle(rng);
            for (i, s) in students.into_iter().enumerate() {
                members[i % team_count].insert(s);
            }
        }

        let taken: HashSet<String> = teams
            .list_by_category(category_id)?
            .into_iter()
            .map(|t| t.name.trim().to_lowercase())
            .collect();
        let mut number = 0;
        let mut created = Vec::with_capacity(team_count);
        for member_ids in members {
            let name = loop {
                number += 1;
                let candidate = format!("Team {number}");
                if !taken.contains(&candidate.to_lowercase()) {
                    break candidate;
                }
            };
            let id = teams.create(&Team {
                category_id,
                name,
                member_ids,
                ..Team::default()
            })?;
            created.push(id);
        }

        let mut all_ids = category.generated_team_ids.clone();
        all_ids.extend(&created);
        categories.mark_teams_generated(category_id, &all_ids)?;
        info!(category_id, teams = created.len(), mode = category.mode.as_str(), "generated teams");
        Ok(created)
    }

    /// Add a user to a team, respecting the category's size limit and
    /// one-team-per-category membership.
    pub fn add_member(&self, team_id: i64, user_id: i64) -> CoreResult<Team> {
        let teams = self.backend.teams();
        let mut team = teams
            .get_by_id(team_id)?
            .ok_or_else(|| CoreError::not_found(format!("team {team_id}")))?;
        if team.member_ids.contains(&user_id) {
            return Ok(team);
        }
        let category = self
            .backend
            .categories()
            .get_by_id(team.category_id)?
            .ok_or_else(|| CoreError::not_found(format!("category {}", team.category_id)))?;
        if team.member_ids.len() as i64 >= category.max_members {
            return Err(CoreError::validation(format!(
                "team is full ({} members max)",
                category.max_members
            )));
        }
        let elsewhere = teams
            .list_for_member(user_id, Some(team.category_id))?
            .into_iter()
            .any(|t| t.id != team_id);
        if elsewhere {
            return Err(CoreError::validation(
                "user already belongs to another team in this category",
            ));
        }
        team.member_ids.insert(user_id);
        teams.update(&team)?;
        Ok(team)
    }

    pub fn remove_member(&self, team_id: i64, user_id: i64) -> CoreResult<Team> {
        let teams = self.backend.teams();
        let mut team = teams
            .get_by_id(team_id)?
            .ok_or_else(|| CoreError::not_found(format!("team {team_id}")))?;
        if team.member_ids.remove(&user_id) {
            teams.update(&team)?;
        }
        Ok(team)
    }

    /// Create a pending assignment of the activity for every team in its category that
    /// does not have one yet.
    pub fn assign_to_category_teams(&self, activity_id: i64) -> CoreResult<AssignOutcome> {
        let activity = self
            .backend
            .activities()
            .get_by_id(activity_id)?
            .ok_or_else(|| CoreError::not_found(format!("activity {activity_id}")))?;
        if activity.deleted {
            return Err(CoreError::validation("activity is archived"));
        }
        let assignments = self.backend.assignments();
        let already: HashSet<i64> = assignments
            .list_by_activity(activity_id)?
            .into_iter()
            .map(|a| a.team_id)
            .collect();

        let now = self.backend.clock.now();
        let mut out = AssignOutcome::default();
        for team in self.backend.teams().list_by_category(activity.category_id)? {
            if already.contains(&team.id) {
                out.skipped_team_ids.push(team.id);
                continue;
            }
            let remote = assignments.create(&Assignment {
                team_id: team.id,
                activity_id,
                status: AssignmentStatus::Pending,
                due_date: activity.due_date,
                assigned_at: Some(now),
                ..Assignment::default()
            })?;
            out.created.push(remote);
        }
        info!(
            activity_id,
            created = out.created.len(),
            skipped = out.skipped_team_ids.len(),
            "assigned activity to category teams"
        );
        Ok(out)
    }

    pub fn grade(
        &self,
        assignment_id: &str,
        grade: f64,
        comment: Option<String>,
    ) -> CoreResult<Assignment> {
        validate_grade(grade)?;
        let assignments = self.backend.assignments();
        let mut a = assignments
            .get(assignment_id)?
            .ok_or_else(|| CoreError::not_found(format!("assignment {assignment_id}")))?;
        a.grade = Some(grade);
        if comment.is_some() {
            a.professor_comment = comment;
        }
        a.status = AssignmentStatus::Completed;
        assignments.update(&a)?;
        Ok(a)
    }

    pub fn set_status(&self, assignment_id: &str, status: AssignmentStatus) -> CoreResult<Assignment> {
        let assignments = self.backend.assignments();
        let mut a = assignments
            .get(assignment_id)?
            .ok_or_else(|| CoreError::not_found(format!("assignment {assignment_id}")))?;
        if a.status != status {
            a.status = status;
            assignments.update(&a)?;
        }
        Ok(a)
    }

    /// Mark open assignments whose due date has passed as overdue. Returns their ids.
    pub fn refresh_overdue(&self) -> CoreResult<Vec<String>> {
        let now = self.backend.clock.now();
        let assignments = self.backend.assignments();
        let mut updated = Vec::new();
        for mut a in assignments.list_all()? {
            if a.status.is_open() && a.is_past_due(now) {
                a.status = AssignmentStatus::Overdue;
                assignments.update(&a)?;
                updated.push(a.remote_id);
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activity, Category};
    use crate::repo::testing::{harness, t0, Harness};
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn category(h: &Harness, mode: AssignmentMode, max: i64) -> i64 {
        h.backend
            .categories()
            .create(&Category {
                name: format!("{mode:?} groups"),
                course_id: 1,
                mode,
                max_members: max,
                ..Category::default()
            })
            .expect("category")
    }

    #[test]
    fn random_generation_balances_teams_and_records_them() {
        let h = harness();
        let cat = category(&h, AssignmentMode::Random, 4);
        let students: Vec<i64> = (1..=10).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let ids = Courses::new(&h.backend)
            .generate_teams(cat, &students, &mut rng)
            .expect("generate");
        assert_eq!(ids.len(), 3);

        let teams = h.backend.teams().list_by_category(cat).expect("teams");
        let mut sizes: Vec<usize> = teams.iter().map(|t| t.member_ids.len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![3, 3, 4]);
        let placed: BTreeSet<i64> = teams.iter().flat_map(|t| t.member_ids.iter().copied()).collect();
        assert_eq!(placed.len(), 10);

        let c = h.backend.categories().get_by_id(cat).expect("get").expect("some");
        assert!(c.teams_generated);
        assert_eq!(c.generated_team_ids, ids);

        let again = Courses::new(&h.backend).generate_teams(cat, &students, &mut rng);
        assert!(matches!(again, Err(CoreError::Validation(_))));
    }

    #[test]
    fn manual_generation_creates_empty_teams() {
        let h = harness();
        let cat = category(&h, AssignmentMode::Manual, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let ids = Courses::new(&h.backend)
            .generate_teams(cat, &[1, 2, 3, 4, 2], &mut rng)
            .expect("generate");
        assert_eq!(ids.len(), 2);
        let teams = h.backend.teams().list_by_category(cat).expect("teams");
        assert!(teams.iter().all(|t| t.member_ids.is_empty()));
    }

    #[test]
    fn membership_respects_capacity_and_exclusivity() {
        let h = harness();
        let cat = category(&h, AssignmentMode::Manual, 2);
        let mut rng = StdRng::seed_from_u64(1);
        let ids = Courses::new(&h.backend)
            .generate_teams(cat, &[1, 2, 3], &mut rng)
            .expect("generate");
        let courses = Courses::new(&h.backend);
        courses.add_member(ids[0], 10).expect("add");
        courses.add_member(ids[0], 11).expect("add");
        assert!(matches!(courses.add_member(ids[0], 12), Err(CoreError::Validation(_))));
        assert!(matches!(courses.add_member(ids[1], 10), Err(CoreError::Validation(_))));

        let t = courses.remove_member(ids[0], 10).expect("remove");
        assert!(!t.member_ids.contains(&10));
        courses.add_member(ids[1], 10).expect("moved");
    }

    #[test]
    fn assignment_orchestration_and_grading() {
        let h = harness();
        let cat = category(&h, AssignmentMode::Manual, 2);
        let mut rng = StdRng::seed_from_u64(1);
        Courses::new(&h.backend)
            .generate_teams(cat, &[1, 2, 3, 4], &mut rng)
            .expect("generate");
        let activity = h
            .backend
            .activities()
            .create(&Activity {
                category_id: cat,
                name: "Essay".into(),
                due_date: Some(t0() + Duration::days(2)),
                ..Activity::default()
            })
            .expect("activity");

        let courses = Courses::new(&h.backend);
        let first = courses.assign_to_category_teams(activity).expect("assign");
        assert_eq!(first.created.len(), 2);
        let second = courses.assign_to_category_teams(activity).expect("assign again");
        assert!(second.created.is_empty());
        assert_eq!(second.skipped_team_ids.len(), 2);

        let graded = courses
            .grade(&first.created[0], 4.5, Some("Solid work".into()))
            .expect("grade");
        assert_eq!(graded.status, AssignmentStatus::Completed);
        assert!(matches!(
            courses.grade(&first.created[0], 9.0, None),
            Err(CoreError::Validation(_))
        ));

        h.clock.advance(Duration::days(3));
        let overdue = courses.refresh_overdue().expect("refresh");
        assert_eq!(overdue, vec![first.created[1].clone()]);
        let a = h.backend.assignments().get(&first.created[1]).expect("get").expect("some");
        assert_eq!(a.status, AssignmentStatus::Overdue);
    }
}

mod test_support;

use serde_json::json;
use test_support::{as_array, as_i64, spawn_sidecar, Sidecar};

fn create_user(sidecar: &mut Sidecar, name: &str, email: &str, role: &str) -> i64 {
    let created = sidecar.request_ok(
        "users.create",
        json!({ "name": name, "email": email, "role": role }),
    );
    as_i64(&created, "userId")
}

fn in_memory() -> Sidecar {
    let mut sidecar = spawn_sidecar();
    let _ = sidecar.request_ok("workspace.select", json!({ "inMemory": true }));
    sidecar
}

#[test]
fn generated_teams_place_every_student_once() {
    let mut sidecar = in_memory();
    let students: Vec<i64> = [("Ana", "ana@uni.edu"), ("Luis", "luis@uni.edu"), ("Eva", "eva@uni.edu")]
        .iter()
        .map(|(n, e)| create_user(&mut sidecar, n, e, "student"))
        .collect();

    let created = sidecar.request_ok(
        "categories.create",
        json!({ "courseId": 5, "name": "Random pairs", "mode": "random", "maxMembers": 2 }),
    );
    let category_id = as_i64(&created, "categoryId");

    let generated = sidecar.request_ok(
        "categories.generateTeams",
        json!({ "categoryId": category_id, "studentIds": students, "seed": 7 }),
    );
    assert_eq!(as_array(&generated, "teamIds").len(), 2);

    let teams = sidecar.request_ok("teams.list", json!({ "categoryId": category_id }));
    let mut placed: Vec<i64> = as_array(&teams, "teams")
        .iter()
        .flat_map(|t| as_array(t, "memberIds").iter().filter_map(|v| v.as_i64()).collect::<Vec<_>>())
        .collect();
    placed.sort_unstable();
    let mut expected = students.clone();
    expected.sort_unstable();
    assert_eq!(placed, expected);

    let mine = sidecar.request_ok("teams.forMember", json!({ "userId": students[0] }));
    assert_eq!(as_array(&mine, "teams").len(), 1);

    let category = sidecar.request_ok("categories.get", json!({ "categoryId": category_id }));
    assert_eq!(
        category.pointer("/category/teamsGenerated").and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(
        sidecar.request_err(
            "categories.generateTeams",
            json!({ "categoryId": category_id, "studentIds": students }),
        ),
        "validation_failed"
    );
}

#[test]
fn membership_respects_team_capacity() {
    let mut sidecar = in_memory();
    let ana = create_user(&mut sidecar, "Ana", "ana@uni.edu", "student");
    let luis = create_user(&mut sidecar, "Luis", "luis@uni.edu", "student");

    let created = sidecar.request_ok(
        "categories.create",
        json!({ "courseId": 5, "name": "Solo work", "maxMembers": 1 }),
    );
    let category_id = as_i64(&created, "categoryId");
    let team = sidecar.request_ok(
        "teams.create",
        json!({ "categoryId": category_id, "name": "Solo" }),
    );
    let team_id = as_i64(&team, "teamId");

    let joined = sidecar.request_ok("teams.addMember", json!({ "teamId": team_id, "userId": ana }));
    assert_eq!(joined.pointer("/team/memberIds"), Some(&json!([ana])));
    assert_eq!(
        sidecar.request_err("teams.addMember", json!({ "teamId": team_id, "userId": luis })),
        "validation_failed"
    );
    assert_eq!(
        sidecar.request_err("teams.create", json!({ "categoryId": category_id, "name": "solo" })),
        "validation_failed"
    );

    let left = sidecar.request_ok("teams.removeMember", json!({ "teamId": team_id, "userId": ana }));
    assert_eq!(left.pointer("/team/memberIds"), Some(&json!([])));
}

#[test]
fn assignments_are_graded_and_activities_archived() {
    let mut sidecar = in_memory();
    let created = sidecar.request_ok(
        "categories.create",
        json!({ "courseId": 9, "name": "Projects", "maxMembers": 4 }),
    );
    let category_id = as_i64(&created, "categoryId");
    for name in ["Red", "Blue"] {
        let _ = sidecar.request_ok(
            "teams.create",
            json!({ "categoryId": category_id, "name": name }),
        );
    }
    let activity = sidecar.request_ok(
        "activities.create",
        json!({
            "categoryId": category_id,
            "name": "Sprint review",
            "startDate": "2026-01-10",
            "dueDate": "2099-01-31T23:59:00Z",
        }),
    );
    let activity_id = as_i64(&activity, "activityId");

    let assigned = sidecar.request_ok(
        "assignments.assignToCategoryTeams",
        json!({ "activityId": activity_id }),
    );
    let ids: Vec<String> = as_array(&assigned, "created")
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    assert_eq!(ids.len(), 2);
    let again = sidecar.request_ok(
        "assignments.assignToCategoryTeams",
        json!({ "activityId": activity_id }),
    );
    assert!(as_array(&again, "created").is_empty());
    assert_eq!(as_array(&again, "skippedTeamIds").len(), 2);

    assert_eq!(
        sidecar.request_err("assignments.grade", json!({ "assignmentId": ids[0], "grade": 7 })),
        "validation_failed"
    );
    let graded = sidecar.request_ok(
        "assignments.grade",
        json!({ "assignmentId": ids[0], "grade": 4.5, "comment": "Solid work" }),
    );
    assert_eq!(
        graded.pointer("/assignment/status").and_then(|v| v.as_str()),
        Some("completed")
    );
    assert_eq!(
        graded.pointer("/assignment/grade").and_then(|v| v.as_f64()),
        Some(4.5)
    );

    let moved = sidecar.request_ok(
        "assignments.setStatus",
        json!({ "assignmentId": ids[1], "status": "in_progress" }),
    );
    assert_eq!(
        moved.pointer("/assignment/status").and_then(|v| v.as_str()),
        Some("in_progress")
    );
    let overdue = sidecar.request_ok("assignments.refreshOverdue", json!({}));
    assert!(as_array(&overdue, "overdue").is_empty());

    let found = sidecar.request_ok(
        "activities.search",
        json!({ "categoryId": category_id, "query": "REVIEW" }),
    );
    assert_eq!(as_array(&found, "activities").len(), 1);

    let _ = sidecar.request_ok("activities.archive", json!({ "activityId": activity_id }));
    let visible = sidecar.request_ok("activities.list", json!({ "categoryId": category_id }));
    assert!(as_array(&visible, "activities").is_empty());
    let all = sidecar.request_ok(
        "activities.list",
        json!({ "categoryId": category_id, "includeDeleted": true }),
    );
    assert_eq!(as_array(&all, "activities").len(), 1);
    assert_eq!(
        sidecar.request_err("assignments.assignToCategoryTeams", json!({ "activityId": activity_id })),
        "validation_failed"
    );
}

#[test]
fn users_are_found_by_normalized_email() {
    let mut sidecar = in_memory();
    let prof = create_user(&mut sidecar, "Marta Ruiz", "Marta.Ruiz@Uni.edu", "professor");
    let _ = create_user(&mut sidecar, "Ana", "ana@uni.edu", "student");

    let found = sidecar.request_ok("users.findByEmail", json!({ "email": "  marta.ruiz@uni.EDU " }));
    assert_eq!(found.pointer("/user/id").and_then(|v| v.as_i64()), Some(prof));
    assert!(found.get("provisionalId").map(|v| v.is_null()).unwrap_or(false));

    let unknown = sidecar.request_ok("users.findByEmail", json!({ "email": "new@uni.edu" }));
    assert!(unknown.get("user").map(|v| v.is_null()).unwrap_or(false));
    let provisional = as_i64(&unknown, "provisionalId");
    assert!(provisional >= 1);
    let again = sidecar.request_ok("users.findByEmail", json!({ "email": "NEW@uni.edu" }));
    assert_eq!(as_i64(&again, "provisionalId"), provisional);

    assert_eq!(
        sidecar.request_err(
            "users.create",
            json!({ "name": "Dup", "email": "marta.ruiz@uni.edu" }),
        ),
        "validation_failed"
    );

    let students = sidecar.request_ok("users.list", json!({ "role": "student" }));
    assert_eq!(as_array(&students, "users").len(), 1);
    let hits = sidecar.request_ok("users.search", json!({ "query": "ruiz" }));
    assert_eq!(as_array(&hits, "users").len(), 1);
}

#[test]
fn create_without_an_identifier_fails_cleanly() {
    let mut sidecar = spawn_sidecar();
    let _ = sidecar.request_ok(
        "workspace.select",
        json!({ "inMemory": true, "createShape": "empty" }),
    );
    assert_eq!(
        sidecar.request_err(
            "categories.create",
            json!({ "courseId": 1, "name": "Ghost", "maxMembers": 2 }),
        ),
        "creation_failed"
    );
    let listed = sidecar.request_ok("ids.resolve", json!({ "kind": "category", "localId": 1 }));
    assert_eq!(listed.get("mapped").and_then(|v| v.as_i64()), Some(0));
}

mod support;

use crud_core::db::open_db_in_memory;
use crud_core::{
    serialize, EntityRepository, EntitySchema, FieldAccess, FieldValue, ForeignObject, Marshall,
    Marshalled, RepoError, RepoResult, SerializeOptions, SoftDeleteRepository,
    SqliteEntityRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use support::{create_user, Attachment, Project, ProjectStatus, Task};

struct Fixture {
    conn: Connection,
}

impl Fixture {
    fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        SqliteEntityRepository::<Project>::try_new(&conn).unwrap();
        SqliteEntityRepository::<Task>::try_new(&conn).unwrap();
        SqliteEntityRepository::<Attachment>::try_new(&conn).unwrap();
        Self { conn }
    }

    fn projects(&self) -> SqliteEntityRepository<'_, Project> {
        SqliteEntityRepository::new(&self.conn)
    }

    fn tasks(&self) -> SqliteEntityRepository<'_, Task> {
        SqliteEntityRepository::new(&self.conn)
    }

    fn project(&self, title: &str) -> Project {
        let mut project = Project::new(title);
        project.status = ProjectStatus::ACTIVE;
        self.projects().create(&mut project, None).unwrap();
        project
    }

    fn task(&self, title: &str, project: Option<&Project>) -> Task {
        let mut task = Task::new(title, project);
        self.tasks().create(&mut task, None).unwrap();
        task
    }
}

fn keys(map: &serde_json::Map<String, Value>) -> BTreeSet<&str> {
    map.keys().map(String::as_str).collect()
}

#[test]
fn default_options_return_exactly_the_list_tier() {
    let fixture = Fixture::new();
    let mut attachment = Attachment::new("report.pdf");
    SqliteEntityRepository::<Attachment>::new(&fixture.conn)
        .create(&mut attachment, None)
        .unwrap();

    let out = serialize(&attachment, &fixture.conn, &SerializeOptions::default()).unwrap();
    assert_eq!(
        Value::Object(out),
        json!({"uuid": attachment.audit.uuid().to_string()})
    );

    let project = fixture.project("listing");
    let out = serialize(&project, &fixture.conn, &SerializeOptions::new()).unwrap();
    assert_eq!(keys(&out), BTreeSet::from(["uuid", "title", "status"]));
    assert_eq!(out["title"], "listing");
    assert_eq!(out["status"], 1);
}

#[test]
fn details_expose_iso_timestamps_and_transient_flag() {
    let fixture = Fixture::new();
    let mut attachment = Attachment::new("a");
    SqliteEntityRepository::<Attachment>::new(&fixture.conn)
        .create(&mut attachment, None)
        .unwrap();

    let out = serialize(
        &attachment,
        &fixture.conn,
        &SerializeOptions::new().details(true),
    )
    .unwrap();

    assert_eq!(
        keys(&out),
        BTreeSet::from(["uuid", "created_at", "modified_at", "is_transient"])
    );
    assert_eq!(out["is_transient"], false);
    let created_at = out["created_at"].as_str().unwrap();
    assert!(created_at.ends_with("+00:00"), "unexpected timestamp {created_at}");
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
}

#[test]
fn negative_property_budget_overrides_detail_flag() {
    let fixture = Fixture::new();
    let project = fixture.project("budgeted");

    let options = SerializeOptions::new()
        .details(true)
        .privates(true)
        .secrets(true)
        .recurse_properties(-1);
    let out = serialize(&project, &fixture.conn, &options).unwrap();
    assert_eq!(keys(&out), BTreeSet::from(["uuid", "title", "status"]));
}

#[test]
fn zero_property_budget_still_includes_tiers() {
    let fixture = Fixture::new();
    let mut project = fixture.project("secretive");
    project.api_key = Some("k-123".to_string());

    let options = SerializeOptions::new().details(true).secrets(true);
    let out = serialize(&project, &fixture.conn, &options).unwrap();
    assert_eq!(out["api_key"], "k-123");
    assert!(out.contains_key("settings"));
    assert!(!out.contains_key("owner"));
}

#[test]
fn recurse_zero_omits_to_one_relation() {
    let fixture = Fixture::new();
    let project = fixture.project("parent");
    let task = fixture.task("child", Some(&project));

    let out = serialize(&task, &fixture.conn, &SerializeOptions::new()).unwrap();
    assert!(!out.contains_key("project"));
    assert_eq!(keys(&out), BTreeSet::from(["uuid", "title"]));
}

#[test]
fn null_to_one_relation_is_emitted_as_null() {
    let fixture = Fixture::new();
    let task = fixture.task("orphan", None);

    let out = serialize(&task, &fixture.conn, &SerializeOptions::new()).unwrap();
    assert_eq!(out["project"], Value::Null);
}

#[test]
fn recurse_one_nests_to_one_with_decremented_budgets() {
    let fixture = Fixture::new();
    let project = fixture.project("parent");
    let task = fixture.task("child", Some(&project));

    let options = SerializeOptions::new().details(true).recurse(1);
    let out = serialize(&task, &fixture.conn, &options).unwrap();
    assert!(out.contains_key("created_at"));

    let nested = out["project"].as_object().unwrap();
    assert_eq!(nested["uuid"], project.audit.uuid().to_string());
    assert_eq!(nested["title"], "parent");
    // Nested property budget is -1: detail tier closed.
    assert!(!nested.contains_key("created_at"));
    assert!(!nested.contains_key("tasks"));
}

#[test]
fn property_budget_keeps_nested_details_open() {
    let fixture = Fixture::new();
    let project = fixture.project("parent");
    let task = fixture.task("child", Some(&project));

    let options = SerializeOptions::new()
        .details(true)
        .recurse(1)
        .recurse_properties(1);
    let out = serialize(&task, &fixture.conn, &options).unwrap();

    let nested = out["project"].as_object().unwrap();
    assert!(nested.contains_key("created_at"));
    assert_eq!(nested["settings"], json!({}));
    // Nested recurse budget is 0: the non-empty to-many relation is omitted.
    assert!(!nested.contains_key("tasks"));
}

#[test]
fn to_many_relation_lists_active_children_when_budget_allows() {
    let fixture = Fixture::new();
    let project = fixture.project("parent");
    let first = fixture.task("first", Some(&project));
    let mut second = fixture.task("second", Some(&project));
    fixture.tasks().delete(&mut second, None, None).unwrap();

    let options = SerializeOptions::new().details(true).recurse(1);
    let out = serialize(&project, &fixture.conn, &options).unwrap();
    let tasks = out["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["uuid"], first.audit.uuid().to_string());
    assert_eq!(tasks[0]["title"], "first");
    // Children are serialized with recurse 0: their back reference is omitted.
    assert!(tasks[0].get("project").is_none());

    let shallow = serialize(&project, &fixture.conn, &SerializeOptions::new().details(true))
        .unwrap();
    assert!(!shallow.contains_key("tasks"));
}

#[test]
fn empty_to_many_relation_follows_the_recursion_budget() {
    let fixture = Fixture::new();
    let project = fixture.project("childless");

    let shallow = SerializeOptions::new().details(true);
    let out = serialize(&project, &fixture.conn, &shallow).unwrap();
    assert!(!out.contains_key("tasks"));

    let deep = SerializeOptions::new().details(true).recurse(1);
    let out = serialize(&project, &fixture.conn, &deep).unwrap();
    assert_eq!(out["tasks"], json!([]));
}

#[test]
fn transient_owner_yields_empty_relation() {
    let fixture = Fixture::new();
    let project = Project::new("unsaved");

    let out = serialize(&project, &fixture.conn, &SerializeOptions::new().details(true)).unwrap();
    assert_eq!(out["tasks"], json!([]));
    assert_eq!(out["is_transient"], true);
    assert_eq!(out["created_at"], Value::Null);
}

#[test]
fn dangling_reference_serializes_as_null() {
    let fixture = Fixture::new();
    let project = fixture.project("doomed");
    let task = fixture.task("survivor", Some(&project));

    fixture
        .conn
        .execute_batch("PRAGMA foreign_keys = OFF;")
        .unwrap();
    fixture.projects().hard_delete(project.audit.uuid()).unwrap();

    let out = serialize(&task, &fixture.conn, &SerializeOptions::new().recurse(1)).unwrap();
    assert_eq!(out["project"], Value::Null);
}

#[test]
fn nested_entity_is_found_even_when_soft_deleted() {
    let fixture = Fixture::new();
    let mut project = fixture.project("tombstoned");
    let task = fixture.task("child", Some(&project));
    fixture.projects().delete(&mut project, None, None).unwrap();

    let out = serialize(&task, &fixture.conn, &SerializeOptions::new().recurse(1)).unwrap();
    assert_eq!(out["project"]["title"], "tombstoned");
}

#[test]
fn actors_use_the_user_projection() {
    let fixture = Fixture::new();
    let ada = create_user(&fixture.conn, "ada", "Ada", "Lovelace");
    let mut project = Project::new("owned");
    project.owner = Some(ada.id);
    fixture.projects().create(&mut project, Some(&ada)).unwrap();

    let options = SerializeOptions::new().privates(true).recurse(1);
    let out = serialize(&project, &fixture.conn, &options).unwrap();
    let expected = json!({
        "username": "ada",
        "full_name": "Ada Lovelace",
        "first_name": "Ada",
        "last_name": "Lovelace",
    });
    assert_eq!(out["owner"], expected);
    assert_eq!(out["created_by"], expected);
    assert_eq!(out["deleted_by"], Value::Null);
    assert_eq!(out["is_deleted"], false);

    let shallow = serialize(&project, &fixture.conn, &SerializeOptions::new().privates(true))
        .unwrap();
    assert!(!shallow.contains_key("owner"));
    assert!(!shallow.contains_key("created_by"));
    assert_eq!(shallow["deleted_by"], Value::Null);
}

#[test]
fn missing_actor_serializes_as_null() {
    let fixture = Fixture::new();
    let mut project = Project::new("ghost-owned");
    project.owner = Some(crud_core::UserId(999));
    fixture
        .conn
        .execute_batch("PRAGMA foreign_keys = OFF;")
        .unwrap();
    fixture.projects().create(&mut project, None).unwrap();

    let options = SerializeOptions::new().privates(true).recurse(1);
    let out = serialize(&project, &fixture.conn, &options).unwrap();
    assert_eq!(out["owner"], Value::Null);
}

#[test]
fn mappings_and_sequences_pass_through() {
    let fixture = Fixture::new();
    let mut project = Project::new("configured");
    project
        .settings
        .insert("theme".to_string(), json!({"dark": true}));
    project.labels = vec!["infra".to_string(), "q3".to_string()];
    fixture.projects().create(&mut project, None).unwrap();

    let out = serialize(&project, &fixture.conn, &SerializeOptions::new().details(true)).unwrap();
    assert_eq!(out["settings"], json!({"theme": {"dark": true}}));
    assert_eq!(out["labels"], json!(["infra", "q3"]));

    let stored = fixture
        .projects()
        .get_active(project.audit.uuid())
        .unwrap()
        .unwrap();
    assert_eq!(stored.settings, project.settings);
    assert_eq!(stored.labels, project.labels);
}

#[test]
fn sequences_are_omitted_below_zero_depth() {
    let fixture = Fixture::new();
    let mut project = Project::new("deep");
    project.labels = vec!["x".to_string()];
    fixture.projects().create(&mut project, None).unwrap();

    let options = SerializeOptions::new().details(true).recurse(-1);
    let out = serialize(&project, &fixture.conn, &options).unwrap();
    assert!(!out.contains_key("labels"));
    assert!(out.contains_key("settings"));
}

struct Misdeclared;

static MISDECLARED_SCHEMA: once_cell::sync::Lazy<EntitySchema> = once_cell::sync::Lazy::new(|| {
    EntitySchema::audited("misdeclared", "misdeclared").marshall(Marshall::new(["nickname"]))
});

impl Marshalled for Misdeclared {
    fn schema(&self) -> &EntitySchema {
        &MISDECLARED_SCHEMA
    }

    fn field(&self, _name: &str, _conn: &Connection) -> RepoResult<FieldAccess> {
        Ok(FieldAccess::Unknown)
    }
}

#[test]
fn unknown_fields_are_not_suppressed() {
    let conn = open_db_in_memory().unwrap();
    let err = serialize(&Misdeclared, &conn, &SerializeOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        RepoError::UnknownField { entity: "misdeclared", ref field } if field == "nickname"
    ));
}

struct Badge;

static BADGE_SCHEMA: once_cell::sync::Lazy<EntitySchema> = once_cell::sync::Lazy::new(|| {
    EntitySchema::audited("badge", "badges").marshall(Marshall::new(["issuer"]))
});

impl Marshalled for Badge {
    fn schema(&self) -> &EntitySchema {
        &BADGE_SCHEMA
    }

    fn field(&self, name: &str, _conn: &Connection) -> RepoResult<FieldAccess> {
        match name {
            "issuer" => Ok(FieldAccess::Found(FieldValue::Foreign(
                ForeignObject::display_only("Registry #7"),
            ))),
            _ => Ok(FieldAccess::Unknown),
        }
    }
}

#[test]
fn foreign_object_without_projection_renders_its_display_string() {
    let conn = open_db_in_memory().unwrap();

    let out = serialize(&Badge, &conn, &SerializeOptions::new().recurse(1)).unwrap();
    assert_eq!(Value::Object(out), json!({"issuer": "Registry #7"}));

    let out = serialize(&Badge, &conn, &SerializeOptions::new()).unwrap();
    assert!(out.is_empty());
}

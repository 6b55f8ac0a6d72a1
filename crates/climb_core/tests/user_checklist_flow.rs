use climb_core::db::open_db_in_memory;
use climb_core::{
    is_malformed, ChecklistDefinition, ItemDefinition, ItemDefinitionFields,
    SqliteTemplateRepository, SqliteUserChecklistRepository, TemplateRepository, TemplateWithItems,
    UserChecklistRepoError, UserChecklistRepository, UserId,
};
use rusqlite::Connection;

const USER: UserId = 7;
const OTHER_USER: UserId = 8;

fn seed(conn: &Connection, name: &str, items: &[&str]) -> TemplateWithItems {
    let repo = SqliteTemplateRepository::try_new(conn).unwrap();
    let definition = ChecklistDefinition {
        name: name.to_string(),
        version: "2024-01-01".to_string(),
        items: items
            .iter()
            .map(|display_text| {
                ItemDefinition::Full(ItemDefinitionFields {
                    display_text: display_text.to_string(),
                    detail_text: String::new(),
                    is_required: true,
                    link_text: String::new(),
                    link_uri: String::new(),
                })
            })
            .collect(),
        is_premium: false,
        pretty_route: None,
    };
    repo.upsert_definition(&definition).unwrap()
}

#[test]
fn clone_preserves_template_item_order() {
    let conn = open_db_in_memory().unwrap();
    let template = seed(
        &conn,
        "Job Search",
        &["Write resume", "Apply to 10 jobs", "Practice interviews"],
    );
    let repo = SqliteUserChecklistRepository::try_new(&conn).unwrap();

    let cloned = repo.clone_template(&template, USER).unwrap();

    assert!(!is_malformed(&cloned, &template));
    let in_memory_order: Vec<&str> = cloned
        .items
        .iter()
        .map(|view| view.template_item.display_text.as_str())
        .collect();
    assert_eq!(
        in_memory_order,
        vec!["Write resume", "Apply to 10 jobs", "Practice interviews"]
    );

    // Re-fetching reproduces the same order from persisted rows.
    let fetched = repo.get_with_items(cloned.checklist.id).unwrap().unwrap();
    let fetched_order: Vec<&str> = fetched
        .items
        .iter()
        .map(|view| view.template_item.display_text.as_str())
        .collect();
    assert_eq!(fetched_order, in_memory_order);
    let indices: Vec<i64> = fetched
        .items
        .iter()
        .map(|view| view.template_item.display_index)
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn duplicate_clone_for_same_template_violates_uniqueness() {
    let conn = open_db_in_memory().unwrap();
    let template = seed(&conn, "Job Search", &["Write resume"]);
    let repo = SqliteUserChecklistRepository::try_new(&conn).unwrap();

    repo.clone_template(&template, USER).unwrap();
    let err = repo.clone_template(&template, USER).unwrap_err();
    assert!(matches!(err, UserChecklistRepoError::Db(_)));

    // The other user is unaffected by the constraint.
    repo.clone_template(&template, OTHER_USER).unwrap();
}

#[test]
fn find_newest_for_template_name_ignores_other_names() {
    let conn = open_db_in_memory().unwrap();
    let job_search = seed(&conn, "Job Search", &["Write resume"]);
    let networking = seed(&conn, "Networking", &["Attend one meetup"]);
    let repo = SqliteUserChecklistRepository::try_new(&conn).unwrap();

    repo.clone_template(&networking, USER).unwrap();
    let job_copy = repo.clone_template(&job_search, USER).unwrap();

    let found = repo
        .find_newest_for_template_name(USER, "Job Search")
        .unwrap()
        .unwrap();
    assert_eq!(found.checklist.id, job_copy.checklist.id);

    assert!(repo
        .find_newest_for_template_name(OTHER_USER, "Job Search")
        .unwrap()
        .is_none());
}

#[test]
fn completing_every_item_rolls_up_to_the_checklist() {
    let conn = open_db_in_memory().unwrap();
    let template = seed(&conn, "Job Search", &["Write resume", "Apply to 10 jobs"]);
    let repo = SqliteUserChecklistRepository::try_new(&conn).unwrap();

    let cloned = repo.clone_template(&template, USER).unwrap();
    let first = cloned.items[0].item.id;
    let second = cloned.items[1].item.id;

    let view = repo.set_item_completion(USER, first, true).unwrap();
    assert!(view.item.is_complete);
    let partial = repo.get_with_items(cloned.checklist.id).unwrap().unwrap();
    assert!(!partial.checklist.is_complete);

    repo.set_item_completion(USER, second, true).unwrap();
    let complete = repo.get_with_items(cloned.checklist.id).unwrap().unwrap();
    assert!(complete.checklist.is_complete);

    // Unchecking any item clears the roll-up flag.
    repo.set_item_completion(USER, first, false).unwrap();
    let reopened = repo.get_with_items(cloned.checklist.id).unwrap().unwrap();
    assert!(!reopened.checklist.is_complete);
    assert!(reopened.items[1].item.is_complete);
}

#[test]
fn toggling_another_users_item_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let template = seed(&conn, "Job Search", &["Write resume"]);
    let repo = SqliteUserChecklistRepository::try_new(&conn).unwrap();

    let cloned = repo.clone_template(&template, USER).unwrap();
    let item_id = cloned.items[0].item.id;

    let err = repo
        .set_item_completion(OTHER_USER, item_id, true)
        .unwrap_err();
    assert!(matches!(err, UserChecklistRepoError::ItemNotFound(id) if id == item_id));

    let err = repo.set_item_completion(USER, 9999, true).unwrap_err();
    assert!(matches!(err, UserChecklistRepoError::ItemNotFound(9999)));
}

#[test]
fn replace_with_clone_swaps_rows_atomically() {
    let conn = open_db_in_memory().unwrap();
    let template = seed(&conn, "Job Search", &["Write resume"]);
    let repo = SqliteUserChecklistRepository::try_new(&conn).unwrap();

    let original = repo.clone_template(&template, USER).unwrap();
    let replaced = repo
        .replace_with_clone(original.checklist.id, &template, USER)
        .unwrap();

    assert_ne!(original.checklist.id, replaced.checklist.id);
    assert!(repo.get_with_items(original.checklist.id).unwrap().is_none());

    // Replacing a row that is already gone reports the lost race.
    let err = repo
        .replace_with_clone(original.checklist.id, &template, OTHER_USER)
        .unwrap_err();
    assert!(matches!(err, UserChecklistRepoError::ChecklistNotFound(_)));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteUserChecklistRepository::try_new(&conn) {
        Err(UserChecklistRepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "PRAGMA user_version = {};",
        climb_core::db::migrations::latest_version()
    ))
    .unwrap();

    let result = SqliteUserChecklistRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(UserChecklistRepoError::MissingRequiredTable("user_checklists"))
    ));
}

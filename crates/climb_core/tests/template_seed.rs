use climb_core::db::open_db_in_memory;
use climb_core::{
    seed_checklists_from_json, ChecklistDefinition, DefinitionError, ItemDefinition,
    ItemDefinitionFields, SeedError, SqliteTemplateRepository, TemplateListQuery,
    TemplateRepoError, TemplateRepository,
};

const SEED_JSON: &str = r#"[
    {
        "name": "Job Search",
        "version": "2024-01-01",
        "items": [
            "Write resume",
            {
                "display_text": "Apply to 10 jobs",
                "detail_text": "Aim for roles matching your level.",
                "link_text": "Job board",
                "link_uri": "https://jobs.example"
            }
        ]
    }
]"#;

fn definition(
    name: &str,
    version: &str,
    items: &[(&str, &str, &str)],
) -> ChecklistDefinition {
    ChecklistDefinition {
        name: name.to_string(),
        version: version.to_string(),
        items: items
            .iter()
            .map(|(display_text, detail_text, link_uri)| {
                ItemDefinition::Full(ItemDefinitionFields {
                    display_text: display_text.to_string(),
                    detail_text: detail_text.to_string(),
                    is_required: true,
                    link_text: String::new(),
                    link_uri: link_uri.to_string(),
                })
            })
            .collect(),
        is_premium: false,
        pretty_route: None,
    }
}

#[test]
fn seed_from_json_creates_template_with_ordered_items() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    let seeded = seed_checklists_from_json(&repo, SEED_JSON).unwrap();
    assert_eq!(seeded.len(), 1);

    let template = &seeded[0];
    assert_eq!(template.template.name, "Job Search");
    assert_eq!(template.template.version, "2024-01-01");
    assert_eq!(template.items.len(), 2);
    assert_eq!(template.items[0].display_text, "Write resume");
    assert_eq!(template.items[0].display_index, 0);
    assert!(template.items[0].is_required);
    assert_eq!(template.items[1].display_text, "Apply to 10 jobs");
    assert_eq!(template.items[1].display_index, 1);
    assert_eq!(template.items[1].link_uri, "https://jobs.example");
}

#[test]
fn reseed_same_version_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    let first = seed_checklists_from_json(&repo, SEED_JSON).unwrap();
    let second = seed_checklists_from_json(&repo, SEED_JSON).unwrap();

    assert_eq!(first[0].template.id, second[0].template.id);
    assert_eq!(first[0].items.len(), second[0].items.len());

    let row_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM checklist_templates;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(row_count, 1);
}

#[test]
fn reseed_same_version_syncs_items_in_place() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    let initial = definition(
        "Job Search",
        "2024-01-01",
        &[
            ("Write resume", "", ""),
            ("Apply to 10 jobs", "", ""),
            ("Old step", "", ""),
        ],
    );
    let first = repo.upsert_definition(&initial).unwrap();

    let revised = definition(
        "Job Search",
        "2024-01-01",
        &[
            ("Write resume", "Use one page.", "https://resume.example"),
            ("Apply to 10 jobs", "", ""),
            ("Practice interviews", "", ""),
        ],
    );
    let second = repo.upsert_definition(&revised).unwrap();

    assert_eq!(first.template.id, second.template.id);
    let texts: Vec<&str> = second
        .items
        .iter()
        .map(|item| item.display_text.as_str())
        .collect();
    assert_eq!(
        texts,
        vec!["Write resume", "Apply to 10 jobs", "Practice interviews"]
    );
    assert_eq!(second.items[0].detail_text, "Use one page.");
    assert_eq!(second.items[0].link_uri, "https://resume.example");

    // Surviving items keep their row ids; only the dropped one disappears.
    assert_eq!(first.items[0].id, second.items[0].id);
    assert_eq!(first.items[1].id, second.items[1].id);
}

#[test]
fn new_version_creates_new_row_and_keeps_old_one() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    let v1 = repo
        .upsert_definition(&definition(
            "Job Search",
            "2024-01-01",
            &[("Write resume", "", "")],
        ))
        .unwrap();
    let v2 = repo
        .upsert_definition(&definition(
            "Job Search",
            "2024-02-01",
            &[("Write resume", "", ""), ("Network weekly", "", "")],
        ))
        .unwrap();

    assert_ne!(v1.template.id, v2.template.id);

    let versions = repo.list_versions("Job Search").unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, "2024-02-01");
    assert_eq!(versions[1].version, "2024-01-01");

    let latest = repo.find_latest_by_name("Job Search").unwrap().unwrap();
    assert_eq!(latest.template.id, v2.template.id);
    assert_eq!(latest.items.len(), 2);

    let old = repo.get_with_items(v1.template.id).unwrap().unwrap();
    assert_eq!(old.items.len(), 1);
}

#[test]
fn reseeding_superseded_version_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    repo.upsert_definition(&definition(
        "Job Search",
        "2024-01-01",
        &[("Write resume", "", "")],
    ))
    .unwrap();
    repo.upsert_definition(&definition(
        "Job Search",
        "2024-02-01",
        &[("Write resume", "", "")],
    ))
    .unwrap();

    let err = repo
        .upsert_definition(&definition(
            "Job Search",
            "2024-01-01",
            &[("Something else", "", "")],
        ))
        .unwrap_err();
    assert!(matches!(err, TemplateRepoError::SupersededVersion { .. }));
}

#[test]
fn invalid_definitions_are_rejected_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    let bad_version = definition("Job Search", "v2", &[("Write resume", "", "")]);
    let err = repo.upsert_definition(&bad_version).unwrap_err();
    assert!(matches!(
        err,
        TemplateRepoError::Validation(DefinitionError::InvalidVersion { .. })
    ));

    let duplicate = definition(
        "Job Search",
        "2024-01-01",
        &[("Write resume", "", ""), ("Write resume", "", "")],
    );
    let err = repo.upsert_definition(&duplicate).unwrap_err();
    assert!(matches!(
        err,
        TemplateRepoError::Validation(DefinitionError::DuplicateItemText { .. })
    ));

    let row_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM checklist_templates;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(row_count, 0);
}

#[test]
fn seed_parse_failure_reports_parse_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    let err = seed_checklists_from_json(&repo, "not json").unwrap_err();
    assert!(matches!(err, SeedError::Parse(_)));
}

#[test]
fn list_templates_supports_limit_and_offset() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTemplateRepository::try_new(&conn).unwrap();

    for name in ["Alpha", "Beta", "Gamma"] {
        repo.upsert_definition(&definition(name, "2024-01-01", &[("Step one", "", "")]))
            .unwrap();
    }

    let page = repo
        .list_templates(&TemplateListQuery {
            limit: Some(2),
            offset: 1,
        })
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "Beta");
    assert_eq!(page[1].name, "Gamma");

    let all = repo.list_templates(&TemplateListQuery::default()).unwrap();
    assert_eq!(all.len(), 3);
}

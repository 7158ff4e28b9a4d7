mod common;

use common::{
    assets_column, child_count, engineer_draft, engineer_form, seed_catalogs, RecordingSink,
    ACTOR,
};
use jobdesc_core::db::open_db_in_memory;
use jobdesc_core::{
    AssetRef, AuditAction, JdStatus, JobDescriptionListQuery, JobDescriptionService,
    NoopAuditSink, ResponsibilityCategory, RiskItem, RiskLevel, RiskType, ServiceError,
    SqliteAuditSink, SqliteJobDescriptionRepository, ValidationError,
};
use uuid::Uuid;

#[test]
fn create_then_get_returns_assembled_aggregate() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);

    let outcome = service.create(ACTOR, &engineer_draft()).unwrap();
    assert!(!outcome.is_degraded());

    let jd = service.get(outcome.id).unwrap();
    assert_eq!(jd.root.position, "Engineer");
    assert_eq!(jd.root.status, JdStatus::Draft);
    assert_eq!(jd.root.version, 1);
    assert_eq!(jd.root.parent_version_id, None);
    assert_eq!(jd.root.created_by, ACTOR);
    assert_eq!(
        jd.root
            .responsibility_percentages
            .get(ResponsibilityCategory::Strategic),
        40
    );
    assert_eq!(jd.root.responsibility_percentages.total(), 100);

    assert_eq!(jd.responsibilities.len(), 1);
    assert_eq!(jd.responsibilities[0].category, ResponsibilityCategory::Strategic);
    assert_eq!(jd.responsibilities[0].description, "Plan roadmap");
    assert!(jd.risks.is_empty());
    assert_eq!(jd.competencies.len(), 1);
    assert_eq!(jd.competencies[0].competency_id, "comm-1");
    assert_eq!(jd.competencies[0].score, 4);
    assert_eq!(
        jd.competencies[0].competency_name.as_deref(),
        Some("Communication")
    );
}

#[test]
fn get_missing_root_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);

    let missing = Uuid::new_v4();
    let err = service.get(missing).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(id) if id == missing));
}

#[test]
fn update_with_empty_responsibilities_clears_them() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);
    let id = service.create(ACTOR, &engineer_draft()).unwrap().id;

    let mut update = engineer_form().to_update();
    update.responsibilities = Some(Vec::new());
    service.update("user-2", id, &update).unwrap();

    let jd = service.get(id).unwrap();
    assert!(jd.responsibilities.is_empty());
    assert_eq!(jd.competencies.len(), 1);
    assert_eq!(jd.root.updated_by, "user-2");
    assert_eq!(jd.root.created_by, ACTOR);
}

#[test]
fn update_replaces_supplied_collections_and_keeps_omitted_ones() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);
    let id = service.create(ACTOR, &engineer_draft()).unwrap().id;

    let mut update = engineer_form().to_update();
    update.fields.position = "Senior Engineer".to_string();
    update.responsibilities = None;
    update.competencies = None;
    update.risks = Some(vec![RiskItem {
        risk_type: RiskType::External,
        description: "Vendor outage".to_string(),
        risk_level: RiskLevel::High,
        order_index: 0,
    }]);
    service.update(ACTOR, id, &update).unwrap();

    let jd = service.get(id).unwrap();
    assert_eq!(jd.root.position, "Senior Engineer");
    assert_eq!(jd.responsibilities.len(), 1);
    assert_eq!(jd.competencies.len(), 1);
    assert_eq!(jd.risks.len(), 1);
    assert_eq!(jd.risks[0].risk_level, RiskLevel::High);

    service.update(ACTOR, id, &update).unwrap();
    assert_eq!(child_count(&conn, "jd_risks", id), 1);
}

#[test]
fn update_missing_root_is_not_found_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);

    let missing = Uuid::new_v4();
    let err = service
        .update(ACTOR, missing, &engineer_form().to_update())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(id) if id == missing));
    assert_eq!(child_count(&conn, "jd_responsibilities", missing), 0);
}

#[test]
fn invalid_submission_never_reaches_the_store() {
    let conn = open_db_in_memory().unwrap();
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);

    let mut form = engineer_form();
    form.set_percentage(ResponsibilityCategory::General, 50);
    let err = service.create(ACTOR, &form.to_draft()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::PercentageTotal { total: 90 })
    ));

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM job_descriptions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn delete_cascades_to_children() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);
    let id = service.create(ACTOR, &engineer_draft()).unwrap().id;
    assert_eq!(child_count(&conn, "jd_responsibilities", id), 1);

    service.delete(ACTOR, id).unwrap();

    assert!(matches!(service.get(id), Err(ServiceError::NotFound(_))));
    assert_eq!(child_count(&conn, "jd_responsibilities", id), 0);
    assert_eq!(child_count(&conn, "jd_competency_scores", id), 0);
    assert!(matches!(
        service.delete(ACTOR, id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn list_joins_lookup_names_and_filters_by_status() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);
    let first = service.create(ACTOR, &engineer_draft()).unwrap().id;
    let second = service.create(ACTOR, &engineer_draft()).unwrap().id;
    service.publish(ACTOR, second).unwrap();

    let all = service.list(&JobDescriptionListQuery::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|row| row.location_name.as_deref() == Some("Head Office")));
    assert!(all.iter().all(|row| row.department_name.as_deref() == Some("Engineering")));
    assert!(all.iter().all(|row| row.team_name.as_deref() == Some("Core Platform")));

    let drafts = service
        .list(&JobDescriptionListQuery {
            status: Some(JdStatus::Draft),
            ..JobDescriptionListQuery::default()
        })
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, first);

    let limited = service
        .list(&JobDescriptionListQuery {
            limit: Some(1),
            ..JobDescriptionListQuery::default()
        })
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn status_transitions_and_mutations_are_audited() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let sink = RecordingSink::default();
    let service = JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), &sink);

    let id = service.create(ACTOR, &engineer_draft()).unwrap().id;
    let mut update = engineer_form().to_update();
    update.fields.job_purpose = "Keep the platform healthy".to_string();
    service.update(ACTOR, id, &update).unwrap();
    service.publish(ACTOR, id).unwrap();
    assert_eq!(service.get(id).unwrap().root.status, JdStatus::Published);
    service.archive(ACTOR, id).unwrap();
    assert_eq!(service.get(id).unwrap().root.status, JdStatus::Archived);
    service.delete(ACTOR, id).unwrap();

    let events = sink.events.borrow();
    let actions: Vec<AuditAction> = events.iter().map(|event| event.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Publish,
            AuditAction::Archive,
            AuditAction::Delete,
        ]
    );
    assert!(events
        .iter()
        .all(|event| event.entity_type == "job_description" && event.actor_id == ACTOR));
    assert_eq!(events[1].metadata["changed_fields"], serde_json::json!(["job_purpose"]));
    assert_eq!(
        events[1].metadata["replaced_collections"],
        serde_json::json!(["responsibilities", "risks", "competency_scores"])
    );
}

#[test]
fn sqlite_audit_sink_writes_activity_rows() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service = JobDescriptionService::new(
        SqliteJobDescriptionRepository::new(&conn),
        SqliteAuditSink::new(&conn),
    );
    let id = service.create(ACTOR, &engineer_draft()).unwrap().id;
    service.publish(ACTOR, id).unwrap();

    let mut stmt = conn
        .prepare("SELECT action, entity_id, metadata FROM activity_logs ORDER BY id ASC;")
        .unwrap();
    let rows: Vec<(String, String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .map(|row| row.unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0, "create");
    assert_eq!(rows[1].0, "publish");
    assert_eq!(rows[0].1, id.to_string());
    let metadata: serde_json::Value = serde_json::from_str(&rows[1].2).unwrap();
    assert_eq!(metadata["status"], "published");
}

#[test]
fn tagged_assets_are_persisted_with_their_kind() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(SqliteJobDescriptionRepository::new(&conn), NoopAuditSink);

    let mut draft = engineer_draft();
    draft.fields.assets = vec![AssetRef::catalog("asset-laptop"), AssetRef::custom("Desk lamp")];
    let id = service.create(ACTOR, &draft).unwrap().id;

    let raw = assets_column(&conn, id);
    assert_eq!(
        raw,
        r#"[{"kind":"catalog","id":"asset-laptop"},{"kind":"custom","text":"Desk lamp"}]"#
    );
    assert_eq!(service.get(id).unwrap().root.assets, draft.fields.assets);
}

mod common;

use common::{
    child_count, engineer_draft, engineer_form, seed_catalogs, FailingSink, FlakyStore,
    RecordingSink, ACTOR,
};
use jobdesc_core::db::open_db_in_memory;
use jobdesc_core::{
    ChildCollection, ChildOperation, ChildWritePolicy, JobDescriptionDraft, JobDescriptionService,
    NoopAuditSink, ResponsibilityCategory, RiskItem, RiskLevel, RiskType, ServiceError,
};
use rusqlite::Connection;

fn root_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM job_descriptions;", [], |row| row.get(0))
        .unwrap()
}

fn draft_with_risk() -> JobDescriptionDraft {
    let mut draft = engineer_draft();
    draft.risks = vec![RiskItem {
        risk_type: RiskType::Internal,
        description: "Key person dependency".to_string(),
        risk_level: RiskLevel::Medium,
        order_index: 0,
    }];
    draft
}

#[test]
fn absorbed_child_insert_failure_is_reported_and_root_kept() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(FlakyStore::new(&conn, &["insert_risks"]), NoopAuditSink);

    let outcome = service.create(ACTOR, &draft_with_risk()).unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(outcome.degraded.len(), 1);
    assert_eq!(outcome.degraded[0].collection, ChildCollection::Risks);
    assert_eq!(outcome.degraded[0].operation, ChildOperation::Insert);
    assert_eq!(root_count(&conn), 1);
    assert_eq!(child_count(&conn, "jd_responsibilities", outcome.id), 1);
    assert_eq!(child_count(&conn, "jd_risks", outcome.id), 0);
    assert_eq!(child_count(&conn, "jd_competency_scores", outcome.id), 1);
}

#[test]
fn strict_child_insert_failure_removes_the_new_root() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(FlakyStore::new(&conn, &["insert_risks"]), NoopAuditSink)
            .with_policy(ChildWritePolicy::Strict);

    let err = service.create(ACTOR, &draft_with_risk()).unwrap_err();

    match err {
        ServiceError::ChildCollection {
            collection,
            operation,
            ..
        } => {
            assert_eq!(collection, ChildCollection::Risks);
            assert_eq!(operation, ChildOperation::Insert);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(root_count(&conn), 0);
    let orphans: i64 = conn
        .query_row("SELECT COUNT(*) FROM jd_responsibilities;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn root_insert_failure_is_fatal_and_writes_no_children() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service =
        JobDescriptionService::new(FlakyStore::new(&conn, &["insert_root"]), NoopAuditSink);

    let err = service.create(ACTOR, &engineer_draft()).unwrap_err();

    assert!(matches!(err, ServiceError::Repo(_)));
    assert_eq!(root_count(&conn), 0);
    let children: i64 = conn
        .query_row("SELECT COUNT(*) FROM jd_responsibilities;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(children, 0);
}

#[test]
fn update_insert_failure_after_delete_leaves_collection_empty() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let id = JobDescriptionService::new(FlakyStore::new(&conn, &[]), NoopAuditSink)
        .create(ACTOR, &engineer_draft())
        .unwrap()
        .id;

    let service = JobDescriptionService::new(
        FlakyStore::new(&conn, &["insert_responsibilities"]),
        NoopAuditSink,
    );
    let mut form = engineer_form();
    form.push_responsibility(ResponsibilityCategory::General, "Review designs");
    form.job_purpose = "Own the platform".to_string();
    let outcome = service.update(ACTOR, id, &form.to_update()).unwrap();

    assert_eq!(outcome.degraded.len(), 1);
    assert_eq!(outcome.degraded[0].collection, ChildCollection::Responsibilities);
    assert_eq!(outcome.degraded[0].operation, ChildOperation::Insert);

    let jd = service.get(id).unwrap();
    assert_eq!(jd.root.job_purpose, "Own the platform");
    assert!(jd.responsibilities.is_empty());
    assert_eq!(jd.competencies.len(), 1);
}

#[test]
fn absorbed_delete_failure_keeps_the_old_rows_without_duplicates() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let id = JobDescriptionService::new(FlakyStore::new(&conn, &[]), NoopAuditSink)
        .create(ACTOR, &engineer_draft())
        .unwrap()
        .id;

    let sink = RecordingSink::default();
    let service = JobDescriptionService::new(
        FlakyStore::new(&conn, &["delete_responsibilities"]),
        &sink,
    );
    let mut form = engineer_form();
    form.push_responsibility(ResponsibilityCategory::General, "Review designs");
    let outcome = service.update(ACTOR, id, &form.to_update()).unwrap();

    assert_eq!(outcome.degraded.len(), 1);
    assert_eq!(outcome.degraded[0].collection, ChildCollection::Responsibilities);
    assert_eq!(outcome.degraded[0].operation, ChildOperation::Delete);

    let jd = service.get(id).unwrap();
    assert_eq!(child_count(&conn, "jd_responsibilities", id), 1);
    assert_eq!(jd.responsibilities[0].description, "Plan roadmap");

    let events = sink.events.borrow();
    assert_eq!(
        events[0].metadata["replaced_collections"],
        serde_json::json!(["risks", "competency_scores"])
    );
    assert_eq!(
        events[0].metadata["degraded"],
        serde_json::json!(["responsibilities:delete"])
    );
}

#[test]
fn root_update_failure_is_fatal_and_leaves_children_untouched() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let id = JobDescriptionService::new(FlakyStore::new(&conn, &[]), NoopAuditSink)
        .create(ACTOR, &engineer_draft())
        .unwrap()
        .id;

    let sink = RecordingSink::default();
    let service = JobDescriptionService::new(FlakyStore::new(&conn, &["update_root"]), &sink);
    let mut form = engineer_form();
    form.job_purpose = "Own the platform".to_string();
    form.push_responsibility(ResponsibilityCategory::General, "Review designs");
    let err = service.update(ACTOR, id, &form.to_update()).unwrap_err();

    assert!(matches!(err, ServiceError::Repo(_)));
    let jd = service.get(id).unwrap();
    assert_eq!(jd.root.job_purpose, engineer_form().job_purpose);
    assert_eq!(jd.responsibilities.len(), 1);
    assert_eq!(jd.responsibilities[0].description, "Plan roadmap");
    assert_eq!(jd.competencies.len(), 1);
    assert!(sink.events.borrow().is_empty());
}

#[test]
fn strict_update_stops_at_the_first_child_failure() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let id = JobDescriptionService::new(FlakyStore::new(&conn, &[]), NoopAuditSink)
        .create(ACTOR, &engineer_draft())
        .unwrap()
        .id;

    let service = JobDescriptionService::new(
        FlakyStore::new(&conn, &["delete_risks"]),
        NoopAuditSink,
    )
    .with_policy(ChildWritePolicy::Strict);
    let err = service
        .update(ACTOR, id, &engineer_form().to_update())
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::ChildCollection {
            collection: ChildCollection::Risks,
            operation: ChildOperation::Delete,
            ..
        }
    ));
    // Responsibilities were replaced before the risk delete failed.
    assert_eq!(child_count(&conn, "jd_responsibilities", id), 1);
    // Competency scores were never reached.
    assert_eq!(child_count(&conn, "jd_competency_scores", id), 1);
}

#[test]
fn child_read_failure_degrades_to_an_empty_list() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let id = JobDescriptionService::new(FlakyStore::new(&conn, &[]), NoopAuditSink)
        .create(ACTOR, &engineer_draft())
        .unwrap()
        .id;

    let service = JobDescriptionService::new(
        FlakyStore::new(&conn, &["list_competency_scores"]),
        NoopAuditSink,
    );
    let outcome = service.load(id).unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(outcome.degraded[0].collection, ChildCollection::CompetencyScores);
    assert_eq!(outcome.degraded[0].operation, ChildOperation::Read);
    assert!(outcome.aggregate.competencies.is_empty());
    assert_eq!(outcome.aggregate.responsibilities.len(), 1);
    assert_eq!(outcome.aggregate.root.position, "Engineer");
}

#[test]
fn root_read_failure_is_fatal() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let id = JobDescriptionService::new(FlakyStore::new(&conn, &[]), NoopAuditSink)
        .create(ACTOR, &engineer_draft())
        .unwrap()
        .id;

    let service =
        JobDescriptionService::new(FlakyStore::new(&conn, &["get_root"]), NoopAuditSink);
    assert!(matches!(service.load(id), Err(ServiceError::Repo(_))));
}

#[test]
fn strict_next_version_refuses_a_degraded_source() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let id = JobDescriptionService::new(FlakyStore::new(&conn, &[]), NoopAuditSink)
        .create(ACTOR, &engineer_draft())
        .unwrap()
        .id;

    let service =
        JobDescriptionService::new(FlakyStore::new(&conn, &["list_risks"]), NoopAuditSink)
            .with_policy(ChildWritePolicy::Strict);
    let err = service.create_next_version(ACTOR, id).unwrap_err();

    match &err {
        ServiceError::DegradedSource { id: source_id, failure } => {
            assert_eq!(*source_id, id);
            assert_eq!(failure.collection, ChildCollection::Risks);
            assert_eq!(failure.operation, ChildOperation::Read);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("risks read failed"));
    assert!(std::error::Error::source(&err).is_none());
    assert_eq!(root_count(&conn), 1);
}

#[test]
fn audit_failure_does_not_fail_the_operation() {
    let conn = open_db_in_memory().unwrap();
    seed_catalogs(&conn);
    let service = JobDescriptionService::new(FlakyStore::new(&conn, &[]), FailingSink);

    let id = service.create(ACTOR, &engineer_draft()).unwrap().id;
    service.publish(ACTOR, id).unwrap();
    service.delete(ACTOR, id).unwrap();

    assert_eq!(root_count(&conn), 0);
}

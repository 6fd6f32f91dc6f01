use arkivo_core::migration::{DecisionAction, LogSeverity, MigrationStatus};
use arkivo_db::models::file_catalog_entry::CreateFileCatalogEntry;
use arkivo_db::models::file_decision::UpsertFileDecision;
use arkivo_db::models::migration_run::CreateMigrationRun;
use arkivo_db::repositories::{
    FileCatalogRepo, FileDecisionRepo, MigrationLogRepo, MigrationRunRepo,
};
use sqlx::PgPool;

fn new_run() -> CreateMigrationRun {
    CreateMigrationRun {
        title: "June batch".into(),
        manifest_key: "uploads/june/manifest.csv".into(),
        target_bucket: Some("archive-media".into()),
        created_by: Some("operator".into()),
        notes: None,
    }
}

fn entry(event: &str, key: &str) -> CreateFileCatalogEntry {
    CreateFileCatalogEntry {
        event_code: event.into(),
        storage_key: key.into(),
        filename: key.rsplit('/').next().unwrap().into(),
        directory: String::new(),
        file_type: "audio".into(),
        category: "audio_main".into(),
        extension: Some("mp3".into()),
        size_bytes: Some(1024),
        media_type: Some("audio/mpeg".into()),
        suggested_action: "include".into(),
        suggested_category: None,
        conflicts: None,
        metadata: None,
        matched_manifest: true,
        needs_extraction: false,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn run_starts_uploaded_and_transitions(pool: PgPool) {
    arkivo_db::health_check(&pool).await.unwrap();

    let run = MigrationRunRepo::create(&pool, &new_run()).await.unwrap();
    assert_eq!(run.status(), Some(MigrationStatus::Uploaded));

    let updated = MigrationRunRepo::transition(
        &pool,
        run.id,
        MigrationStatus::Uploaded,
        MigrationStatus::Analyzing,
    )
    .await
    .unwrap()
    .expect("transition applies");
    assert_eq!(updated.status(), Some(MigrationStatus::Analyzing));

    // Stale compare-and-set is a no-op.
    let stale = MigrationRunRepo::transition(
        &pool,
        run.id,
        MigrationStatus::Uploaded,
        MigrationStatus::Analyzing,
    )
    .await
    .unwrap();
    assert!(stale.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn decision_upsert_replaces_previous(pool: PgPool) {
    let run = MigrationRunRepo::create(&pool, &new_run()).await.unwrap();
    let entry = FileCatalogRepo::insert(&pool, run.id, &entry("EVT-001", "events/EVT-001/001 talk.mp3"))
        .await
        .unwrap();

    let first = FileDecisionRepo::upsert(
        &pool,
        run.id,
        &UpsertFileDecision {
            catalog_entry_id: entry.id,
            action: DecisionAction::Review,
            new_filename: None,
            target_category: None,
            target_key: None,
            notes: None,
            decided_by: Some("operator".into()),
        },
    )
    .await
    .unwrap();

    let second = FileDecisionRepo::upsert(
        &pool,
        run.id,
        &UpsertFileDecision {
            catalog_entry_id: entry.id,
            action: DecisionAction::Include,
            new_filename: None,
            target_category: None,
            target_key: None,
            notes: None,
            decided_by: Some("operator".into()),
        },
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id, "upsert keeps one row per entry");
    assert_eq!(second.action(), Some(DecisionAction::Include));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn catalog_rows_are_immutable_on_reinsert(pool: PgPool) {
    let run = MigrationRunRepo::create(&pool, &new_run()).await.unwrap();
    let first = FileCatalogRepo::insert(&pool, run.id, &entry("EVT-001", "events/EVT-001/a.mp3"))
        .await
        .unwrap();

    let mut rescanned = entry("EVT-001", "events/EVT-001/a.mp3");
    rescanned.category = "audio_legacy".into();
    rescanned.suggested_action = "ignore".into();
    let second = FileCatalogRepo::insert(&pool, run.id, &rescanned).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.category, "audio_main");
    assert_eq!(second.suggested_action, "include");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn undecided_count_treats_review_as_open(pool: PgPool) {
    let run = MigrationRunRepo::create(&pool, &new_run()).await.unwrap();
    let a = FileCatalogRepo::insert(&pool, run.id, &entry("EVT-001", "events/EVT-001/a.mp3"))
        .await
        .unwrap();
    let _b = FileCatalogRepo::insert(&pool, run.id, &entry("EVT-001", "events/EVT-001/b.mp3"))
        .await
        .unwrap();
    let c = FileCatalogRepo::insert(&pool, run.id, &entry("EVT-001", "events/EVT-001/c.mp3"))
        .await
        .unwrap();

    let decide = |id, action| UpsertFileDecision {
        catalog_entry_id: id,
        action,
        new_filename: None,
        target_category: None,
        target_key: None,
        notes: None,
        decided_by: None,
    };
    FileDecisionRepo::upsert(&pool, run.id, &decide(a.id, DecisionAction::Include))
        .await
        .unwrap();
    FileDecisionRepo::upsert(&pool, run.id, &decide(c.id, DecisionAction::Review))
        .await
        .unwrap();

    // b has no decision, c is review: both are open.
    let open = FileCatalogRepo::count_undecided(&pool, run.id).await.unwrap();
    assert_eq!(open, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_run_cascades_to_working_tables(pool: PgPool) {
    let run = MigrationRunRepo::create(&pool, &new_run()).await.unwrap();
    let entry = FileCatalogRepo::insert(&pool, run.id, &entry("EVT-001", "events/EVT-001/a.mp3"))
        .await
        .unwrap();
    MigrationLogRepo::append(&pool, run.id, LogSeverity::Info, "scan started", None, None)
        .await
        .unwrap();

    sqlx::query("DELETE FROM migrations_runs WHERE id = $1")
        .bind(run.id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(FileCatalogRepo::find_by_id(&pool, entry.id)
        .await
        .unwrap()
        .is_none());
    let logs = MigrationLogRepo::list_recent(&pool, run.id, 10).await.unwrap();
    assert!(logs.is_empty());
}

//! Redis store integration tests.
//!
//! These run against a live Redis and are ignored by default.

use fastcut_models::{
    AspectRatio, ImageRef, RenderEnvelope, RenderJob, RenderJobId, RenderSettings, RenderStatus,
    ResolvedStyle, StatusUpdate, ENVELOPE_VERSION,
};
use fastcut_store::{GenerationStore, RedisGenerationStore, StoreConfig, Upserted};

fn test_job() -> RenderJob {
    let envelope = RenderEnvelope {
        version: ENVELOPE_VERSION,
        images: vec![
            ImageRef {
                url: "https://cdn.example.com/a.jpg".to_string(),
                order: 0,
            },
            ImageRef {
                url: "https://cdn.example.com/b.jpg".to_string(),
                order: 1,
            },
        ],
        audio: None,
        script: Vec::new(),
        settings: RenderSettings::from_style(ResolvedStyle::default(), AspectRatio::PORTRAIT, 30.0),
        style_set_id: None,
        seo: None,
    };
    RenderJob::new(RenderJobId::new(), None, envelope)
}

fn store() -> RedisGenerationStore {
    dotenvy::dotenv().ok();
    RedisGenerationStore::new(StoreConfig::from_env()).expect("Failed to create store")
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_upsert_and_get_roundtrip() {
    let store = store();
    let job = test_job();

    let outcome = store.upsert_pending(&job).await.expect("upsert failed");
    assert_eq!(outcome, Upserted::Created);

    let fetched = store
        .get(&job.id)
        .await
        .expect("get failed")
        .expect("job missing");
    assert_eq!(fetched.status, RenderStatus::Pending);
    assert_eq!(fetched.envelope, job.envelope);

    // Second upsert with the same id refreshes, never duplicates
    let outcome = store.upsert_pending(&job).await.expect("upsert failed");
    assert_eq!(outcome, Upserted::Updated);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_status_lifecycle_and_terminal_guard() {
    let store = store();
    let job = test_job();
    store.upsert_pending(&job).await.expect("upsert failed");

    store
        .apply_status(&job.id, StatusUpdate::processing(Some(30)))
        .await
        .expect("apply failed");
    store
        .record_backend_call(&job.id, "call-integration-1")
        .await
        .expect("record failed");

    let transition = store
        .apply_status(
            &job.id,
            StatusUpdate::completed("s3://bucket/out/final.mp4"),
        )
        .await
        .expect("apply failed");
    assert!(transition.is_applied());

    // A stale in-flight poll after completion is ignored
    let transition = store
        .apply_status(&job.id, StatusUpdate::processing(Some(80)))
        .await
        .expect("apply failed");
    assert!(!transition.is_applied());

    let fetched = store
        .get(&job.id)
        .await
        .expect("get failed")
        .expect("job missing");
    assert_eq!(fetched.status, RenderStatus::Completed);
    assert_eq!(fetched.progress, 100);

    // Terminal jobs drop out of the active set
    let active = store.list_active().await.expect("list failed");
    assert!(!active.contains(&fetched.id));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_retry_gating() {
    let store = store();
    let job = test_job();
    store.upsert_pending(&job).await.expect("upsert failed");

    // Pending is not retryable
    assert!(store.get_for_retry(&job.id).await.is_err());

    store
        .apply_status(&job.id, StatusUpdate::failed("render crashed"))
        .await
        .expect("apply failed");

    let retryable = store.get_for_retry(&job.id).await.expect("retry failed");
    assert_eq!(retryable.status, RenderStatus::Failed);
    assert_eq!(retryable.envelope, job.envelope);
}

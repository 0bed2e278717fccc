//! Dashboard polling against a job the engine advances in the background.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::TestHarness;
use dataops::config::PollingConfig;
use dataops::{Engine, IngestionDashboard, JobStatus, MemoryEngine};

fn polling(interval_ms: u64, auto_refresh: bool) -> PollingConfig {
    PollingConfig {
        interval_ms,
        job_limit: None,
        auto_refresh,
    }
}

#[tokio::test(start_paused = true)]
async fn test_polling_tracks_engine_progress() {
    let harness = TestHarness::new();
    let mut dashboard =
        IngestionDashboard::from_config(Arc::clone(&harness.registry), &polling(2000, true));

    let job = harness.registry.create_job("Background").await.unwrap();
    harness.registry.start_job(job.id).await.unwrap();
    dashboard.mount().await;
    assert_eq!(dashboard.jobs()[0].status, JobStatus::Running);

    harness.engine.advance(job.id, 45.0);
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(dashboard.jobs()[0].progress, 45.0);

    harness.engine.complete(job.id);
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let finished = &dashboard.jobs()[0];
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.progress, 100.0);
    assert_eq!(dashboard.stats().unwrap().completed_jobs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_from_dashboard_sticks() {
    let harness = TestHarness::new();
    let mut dashboard =
        IngestionDashboard::from_config(Arc::clone(&harness.registry), &polling(1000, true));

    let job = harness.registry.create_job("Stoppable").await.unwrap();
    dashboard.mount().await;
    dashboard.start_job(job.id).await.unwrap();
    harness.engine.advance(job.id, 20.0);

    dashboard.select(Some(job.id));
    dashboard.cancel_job(job.id).await.unwrap();

    // Progress reports after cancellation are dropped.
    harness.engine.advance(job.id, 90.0);
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let selected = dashboard.selected_job().unwrap();
    assert_eq!(selected.status, JobStatus::Cancelled);
    assert_eq!(selected.progress, 20.0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_mode_never_polls() {
    let harness = TestHarness::new();
    let mut dashboard =
        IngestionDashboard::from_config(Arc::clone(&harness.registry), &polling(500, false));

    dashboard.mount().await;
    assert!(!dashboard.is_polling());

    // Created behind the registry's back.
    harness.engine.create_job("Unseen").await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(dashboard.jobs().is_empty());

    dashboard.refresh().await;
    assert_eq!(dashboard.jobs().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_polling() {
    let harness = TestHarness::new();
    let mut dashboard =
        IngestionDashboard::from_config(Arc::clone(&harness.registry), &polling(1000, true));
    dashboard.mount().await;
    drop(dashboard);

    let calls = harness.engine.calls().len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.engine.calls().len(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_polling_sees_engine_finish_after_processing() {
    let harness = TestHarness::with_engine(MemoryEngine::new().with_manual_completion());
    let mut dashboard =
        IngestionDashboard::from_config(Arc::clone(&harness.registry), &polling(1000, true));

    let feed = harness.base_path().join("feed.txt");
    std::fs::write(&feed, "rows still streaming in").unwrap();
    let job = harness.registry.create_job("Streaming").await.unwrap();
    harness.registry.process_files(job.id, &[feed]).await.unwrap();

    dashboard.mount().await;
    let running = &dashboard.jobs()[0];
    assert_eq!(running.status, JobStatus::Running);
    assert_eq!(running.progress, 99.0);
    assert_eq!(dashboard.stats().unwrap().running_jobs, 1);

    harness.engine.complete(job.id);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let finished = &dashboard.jobs()[0];
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(dashboard.stats().unwrap().completed_jobs, 1);
}

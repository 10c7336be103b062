// Render session exit paths against the scripted mock engine
//
// Every path must close the context it opened exactly once and report
// whether the engine is still fit for the pool.
//
// Run with: cargo test -p printworks-core --test session_test

use std::time::Duration;

use printworks_core::mock::{MockBehavior, MockEngine, MOCK_PDF};
use printworks_core::{
    EngineError, RenderError, RenderJob, RenderOptions, RenderSession, RenderSettings,
    TimeoutStage,
};

fn settings() -> RenderSettings {
    RenderSettings::default()
        .with_ready_timeout(Duration::from_millis(200))
        .with_export_timeout(Duration::from_millis(200))
}

fn job() -> RenderJob {
    RenderJob::new("<h1>Invoice</h1>")
}

async fn run(behavior: MockBehavior, job: RenderJob) -> (printworks_core::SessionOutcome, MockEngine) {
    let engine = MockEngine::new(behavior);
    let outcome = RenderSession::run(&engine, &job, &settings()).await;
    (outcome, engine)
}

#[tokio::test]
async fn test_success_closes_context_and_keeps_worker() {
    let (outcome, engine) = run(MockBehavior::Succeed, job()).await;

    let artifact = outcome.result.unwrap();
    assert_eq!(artifact.as_bytes(), MOCK_PDF);
    assert!(outcome.worker_healthy);
    assert_eq!(engine.contexts_opened(), 1);
    assert_eq!(engine.contexts_closed(), 1);
}

#[tokio::test]
async fn test_alternative_output_shapes_normalize() {
    for behavior in [MockBehavior::SucceedBase64, MockBehavior::SucceedChunked] {
        let (outcome, _) = run(behavior, job()).await;
        assert_eq!(outcome.result.unwrap().as_bytes(), MOCK_PDF);
        assert!(outcome.worker_healthy);
    }
}

#[tokio::test]
async fn test_empty_content_never_opens_context() {
    let (outcome, engine) = run(MockBehavior::Succeed, RenderJob::new("  ")).await;

    assert!(matches!(outcome.result, Err(RenderError::Validation(_))));
    assert!(outcome.worker_healthy);
    assert_eq!(engine.contexts_opened(), 0);
}

#[tokio::test]
async fn test_invalid_options_never_open_context() {
    let options = RenderOptions {
        page_ranges: Some("zero".into()),
        ..Default::default()
    };
    let (outcome, engine) = run(MockBehavior::Succeed, job().with_options(options)).await;

    assert!(matches!(outcome.result, Err(RenderError::Validation(_))));
    assert_eq!(engine.contexts_opened(), 0);
}

#[tokio::test]
async fn test_open_failure_marks_worker_broken() {
    let (outcome, engine) = run(MockBehavior::FailOpen, job()).await;

    assert!(matches!(
        outcome.result,
        Err(RenderError::Engine(EngineError::OpenContext(_)))
    ));
    assert!(!outcome.worker_healthy);
    assert_eq!(engine.contexts_closed(), 0);
}

#[tokio::test]
async fn test_load_failure_closes_and_marks_broken() {
    let (outcome, engine) = run(MockBehavior::FailLoad, job()).await;

    assert!(matches!(
        outcome.result,
        Err(RenderError::Engine(EngineError::Load(_)))
    ));
    assert!(!outcome.worker_healthy);
    assert_eq!(engine.contexts_closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ready_timeout_closes_and_keeps_worker() {
    let (outcome, engine) = run(MockBehavior::HangLoad, job()).await;

    match outcome.result {
        Err(RenderError::Timeout { stage, .. }) => assert_eq!(stage, TimeoutStage::Load),
        other => panic!("expected load timeout, got {:?}", other),
    }
    assert!(outcome.worker_healthy);
    assert_eq!(engine.contexts_closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_export_timeout_closes_and_keeps_worker() {
    let (outcome, engine) = run(MockBehavior::HangExport, job()).await;

    match outcome.result {
        Err(RenderError::Timeout { stage, .. }) => assert_eq!(stage, TimeoutStage::Export),
        other => panic!("expected export timeout, got {:?}", other),
    }
    assert!(outcome.worker_healthy);
    assert_eq!(engine.contexts_closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_job_timeout_shortens_export_bound() {
    let options = RenderOptions {
        timeout: Some(20),
        ..Default::default()
    };
    let engine = MockEngine::new(MockBehavior::HangExport);
    let settings = RenderSettings::default().with_export_timeout(Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    let outcome = RenderSession::run(&engine, &job().with_options(options), &settings).await;

    assert!(matches!(outcome.result, Err(RenderError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_export_failure_marks_worker_broken() {
    let (outcome, engine) = run(MockBehavior::FailExport, job()).await;

    assert!(matches!(
        outcome.result,
        Err(RenderError::Engine(EngineError::Export(_)))
    ));
    assert!(!outcome.worker_healthy);
    assert_eq!(engine.contexts_closed(), 1);
}

#[tokio::test]
async fn test_unnormalizable_output_marks_worker_broken() {
    for behavior in [MockBehavior::Malformed, MockBehavior::Empty] {
        let (outcome, engine) = run(behavior, job()).await;

        assert!(matches!(
            outcome.result,
            Err(RenderError::Engine(EngineError::MalformedOutput(_)))
        ));
        assert!(!outcome.worker_healthy);
        assert_eq!(engine.contexts_closed(), 1);
    }
}

#[tokio::test]
async fn test_close_failure_keeps_result_but_marks_broken() {
    let (outcome, engine) = run(MockBehavior::FailClose, job()).await;

    assert!(outcome.result.is_ok());
    assert!(!outcome.worker_healthy);
    assert_eq!(engine.contexts_closed(), 1);
}

// End-to-end rendering through a real headless Chromium
//
// These tests need a Chromium binary and are ignored by default.
//
// Run with: PRINTWORKS_CHROMIUM=/usr/bin/chromium cargo test -p printworks-core --test chromium_test -- --ignored

use std::time::Duration;

use printworks_core::{
    ChromiumConfig, ChromiumLauncher, Printer, RenderJob, RenderOptions, RenderSettings,
    PDF_SIGNATURE,
};
use printworks_pool::{Pool, PoolConfig};

fn printer() -> Printer<ChromiumLauncher> {
    let launcher = ChromiumLauncher::new(ChromiumConfig::from_env());
    let pool = Pool::new(
        launcher,
        PoolConfig::default()
            .with_max_workers(1)
            .with_acquire_timeout(Duration::from_secs(60)),
    )
    .unwrap();
    Printer::new(pool, RenderSettings::default())
}

#[tokio::test]
#[ignore = "requires a Chromium binary"]
async fn test_minimal_html_renders_pdf() {
    let printer = printer();

    let artifact = printer
        .print(RenderJob::new("<h1>Hello, printworks</h1>"), 1)
        .await
        .unwrap();

    assert!(!artifact.is_empty());
    assert!(artifact.as_bytes().starts_with(PDF_SIGNATURE));

    printer.pool().drain().await.unwrap();
    assert_eq!(printer.pool().live_workers(), 0);
}

#[tokio::test]
#[ignore = "requires a Chromium binary"]
async fn test_options_and_worker_reuse() {
    let printer = printer();
    let options: RenderOptions = serde_json::from_value(serde_json::json!({
        "format": "A4",
        "landscape": true,
        "printBackground": true,
        "margin": { "top": "10mm", "bottom": "10mm" }
    }))
    .unwrap();

    for n in 0..3 {
        let job = RenderJob::new(format!("<p style=\"background:#eee\">page {}</p>", n))
            .with_options(options.clone());
        let artifact = printer.print(job, 1).await.unwrap();
        assert!(artifact.as_bytes().starts_with(PDF_SIGNATURE));
    }

    assert_eq!(printer.pool().stats().created_total, 1);
    printer.pool().drain().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Chromium binary"]
async fn test_probe_reports_ok() {
    let printer = printer();
    let report = printer.probe().await;
    assert!(report.is_ok(), "{:?}", report);
    printer.pool().drain().await.unwrap();
}

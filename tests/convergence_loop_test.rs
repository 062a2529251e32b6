//! Convergence loop end-to-end against a mock quality server, a fake
//! scanner binary, and stub fix endpoints.

#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{write_fake_scanner, StaticEndpoint};
use quorum::{
    ConvergenceLoop, ConvergenceParams, Endpoint, LanguageProfile, QualityGateClient,
    QualityGateConfig,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issue_page(files: &[&str]) -> serde_json::Value {
    let issues: Vec<serde_json::Value> = files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            json!({
                "rule": "python:S1481",
                "severity": "MAJOR",
                "message": format!("issue {i}"),
                "component": format!("demo:{file}"),
                "line": i + 1,
            })
        })
        .collect();
    json!({"issues": issues, "total": files.len()})
}

/// Mount a success-only task endpoint and a sequence of per-iteration
/// findings responses (consumed in order, last one persistent).
async fn mount_quality_server(server: &MockServer, finding_counts: &[usize]) {
    Mock::given(method("GET"))
        .and(path("/api/ce/task"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task": {"status": "SUCCESS"}})),
        )
        .mount(server)
        .await;

    for (index, count) in finding_counts.iter().enumerate() {
        let files: Vec<String> = (0..*count).map(|i| format!("src/f{i}.py")).collect();
        let refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let mock = Mock::given(method("GET"))
            .and(path("/api/issues/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issue_page(&refs)));
        if index + 1 < finding_counts.len() {
            mock.up_to_n_times(1).mount(server).await;
        } else {
            mock.mount(server).await;
        }
    }
}

fn loop_under_test(
    server: &MockServer,
    project_dir: &Path,
    fixer: Arc<dyn Endpoint>,
    profile: LanguageProfile,
    max_iterations: u32,
) -> ConvergenceLoop {
    let scanner = write_fake_scanner(
        project_dir,
        "INFO: report at http://localhost:9000/api/ce/task?id=TASK1",
        0,
    );

    let quality = QualityGateClient::new(QualityGateConfig {
        base_url: server.uri(),
        scanner_command: scanner.display().to_string(),
        poll_interval: Duration::from_millis(10),
        task_timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap();

    ConvergenceLoop::new(
        quality,
        fixer,
        profile,
        ConvergenceParams {
            project_dir: project_dir.to_path_buf(),
            project_key: "demo".to_string(),
            max_iterations,
        },
    )
}

fn no_linters() -> LanguageProfile {
    LanguageProfile {
        linters: vec![],
        extensions: vec![".py".to_string()],
    }
}

#[tokio::test]
async fn issue_deltas_accumulate_but_the_terminal_iteration_is_excluded() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // Finding counts per iteration: 10, 6, 6, then clean.
    mount_quality_server(&server, &[10, 6, 6, 0]).await;

    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok("anthropic", "no code here"));
    let convergence = loop_under_test(&server, dir.path(), fixer, no_linters(), 5);

    let result = convergence.run().await;

    assert!(result.final_passed);
    assert_eq!(result.iterations.len(), 4);
    // Only the 10 -> 6 delta counts: 6 -> 6 adds zero and the passing
    // iteration's 6 -> 0 resolution is excluded by design.
    assert_eq!(result.total_issues_fixed, 4);
    assert!(result.iterations[3].passed());
}

#[tokio::test]
async fn budget_exhaustion_without_passing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_quality_server(&server, &[5]).await;

    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok("anthropic", "no code here"));
    let convergence = loop_under_test(&server, dir.path(), fixer, no_linters(), 2);

    let result = convergence.run().await;

    assert!(!result.final_passed);
    assert_eq!(result.iterations.len(), 2);
    assert_eq!(result.total_issues_fixed, 0);
}

#[tokio::test]
async fn fix_with_changed_fenced_block_rewrites_the_file_and_backs_it_up() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(dir.path().join("app.py"), "print('hello')").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/ce/task"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task": {"status": "SUCCESS"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/issues/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue_page(&["app.py"])))
        .mount(&server)
        .await;

    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok(
        "anthropic",
        "Here is the corrected file:\n```python\nprint('fixed')\n```",
    ));
    let convergence = loop_under_test(&server, dir.path(), fixer, no_linters(), 1);

    let result = convergence.run().await;

    assert!(!result.final_passed);
    assert!(result.iterations[0].fixes_applied);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("app.py")).unwrap(),
        "print('fixed')"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("app.py.bak")).unwrap(),
        "print('hello')"
    );
}

#[tokio::test]
async fn fix_without_fenced_block_leaves_the_file_untouched() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(dir.path().join("app.py"), "print('hello')").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/ce/task"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task": {"status": "SUCCESS"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/issues/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue_page(&["app.py"])))
        .mount(&server)
        .await;

    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok(
        "anthropic",
        "I would suggest renaming the variable.",
    ));
    let convergence = loop_under_test(&server, dir.path(), fixer, no_linters(), 1);
    let result = convergence.run().await;

    assert!(result.iterations[0].fixes_applied);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("app.py")).unwrap(),
        "print('hello')"
    );
    assert!(!dir.path().join("app.py.bak").exists());
    assert!(!result.final_passed);
}

#[tokio::test]
async fn fix_with_identical_fenced_block_creates_no_backup() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(dir.path().join("app.py"), "print('hello')").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/ce/task"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task": {"status": "SUCCESS"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/issues/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue_page(&["app.py"])))
        .mount(&server)
        .await;

    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok(
        "anthropic",
        "```python\nprint('hello')\n```",
    ));
    let convergence = loop_under_test(&server, dir.path(), fixer, no_linters(), 1);
    let result = convergence.run().await;

    assert_eq!(
        std::fs::read_to_string(dir.path().join("app.py")).unwrap(),
        "print('hello')"
    );
    assert!(!dir.path().join("app.py.bak").exists());
    assert!(!result.final_passed);
}

#[tokio::test]
async fn scan_failure_is_fatal_to_the_loop() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/ce/task"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task": {"status": "FAILED"}})),
        )
        .mount(&server)
        .await;

    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok("anthropic", "unused"));
    let convergence = loop_under_test(&server, dir.path(), fixer, no_linters(), 3);
    let result = convergence.run().await;

    assert!(!result.final_passed);
    assert_eq!(result.iterations.len(), 1);
    let error = result.iterations[0].error.as_deref().unwrap();
    assert!(error.contains("FAILED"), "error was: {error}");
}

#[tokio::test]
async fn absent_linter_is_a_skip_not_a_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_quality_server(&server, &[0]).await;

    let profile = LanguageProfile {
        linters: vec!["definitely-not-a-real-linter-binary --check".to_string()],
        extensions: vec![".py".to_string()],
    };
    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok("anthropic", "unused"));
    let convergence = loop_under_test(&server, dir.path(), fixer, profile, 2);
    let result = convergence.run().await;

    assert!(result.final_passed);
    assert_eq!(result.iterations.len(), 1);
    let outcome = &result.iterations[0].linter_outcomes[0];
    assert!(outcome.passed);
    assert!(outcome.output.contains("not installed"));
}

#[tokio::test]
async fn failing_linter_output_is_scraped_for_fix_targets() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(dir.path().join("style.py"), "x=1").unwrap();
    mount_quality_server(&server, &[0]).await;

    // A linter that fails and names the file in its output. `sh` exists
    // everywhere the suite runs, so this linter is never skipped.
    let profile = LanguageProfile {
        linters: vec!["sh -c 'echo style.py:1:2: E225; exit 1'".to_string()],
        extensions: vec![".py".to_string()],
    };
    let fixer: Arc<dyn Endpoint> = Arc::new(StaticEndpoint::ok(
        "anthropic",
        "```python\nx = 1\n```",
    ));
    let convergence = loop_under_test(&server, dir.path(), fixer, profile, 1);
    let result = convergence.run().await;

    // Scan is clean but the linter failed, so the iteration cannot pass;
    // the scraped file got fixed.
    assert!(!result.final_passed);
    assert!(result.iterations[0].fixes_applied);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("style.py")).unwrap(),
        "x = 1"
    );
    assert!(dir.path().join("style.py.bak").exists());
}

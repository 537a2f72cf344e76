use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

/// Creates a config file without an account, so the run fails before any network call.
fn create_accountless_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"api:\n  base_url: \"http://127.0.0.1:9\"\nanalysis:\n  repository_concurrency: 2\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_report_command() {
    let mut cmd = Command::cargo_bin("repo-census").expect("Binary exists");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("report"));
}

#[test]
fn report_fails_for_missing_config_file() {
    let mut cmd = Command::cargo_bin("repo-census").expect("Binary exists");
    cmd.args(["report", "--config", "does-not-exist.yaml", "--account", "octo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn report_requires_an_account() {
    let config = create_accountless_config();
    let mut cmd = Command::cargo_bin("repo-census").expect("Binary exists");
    cmd.arg("report")
        .arg("--config")
        .arg(config.path())
        .env_remove("GITHUB_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No account given"));
}

#[test]
fn report_rejects_unknown_format() {
    let config = create_accountless_config();
    let mut cmd = Command::cargo_bin("repo-census").expect("Binary exists");
    cmd.arg("report")
        .arg("--config")
        .arg(config.path())
        .args(["--format", "xml"])
        .assert()
        .failure();
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let msg = format!("{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use repo_census::cli::{run, Cli, Commands, OutputFormat};

    let cli = Cli {
        command: Commands::Report {
            config: std::path::PathBuf::from("dummy.yaml"),
            account: Some("octo".to_string()),
            format: OutputFormat::Text,
            verbose: false,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy config must not load");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

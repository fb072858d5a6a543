use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use task_intercom::config::GlobalConfig;
use task_intercom::nlu::similarity::SimilarityStrategy;
use task_intercom::AppError;

const SAMPLE: &str = r#"
database_path = "/tmp/task-intercom-test.db"
retention_hours = 48
projects = ["Casa", "Trabalho"]
fallback_text = "Não entendi."

[interpreter]
confidence_threshold = 0.8
slot_timeout_seconds = 90
duplicate_window_seconds = 10
fuzzy_strategy = "levenshtein"
fuzzy_min_similarity = 0.7
strip_emoji = false
max_cas_attempts = 3

[workers]
executors = 4
responders = 1
pop_timeout_ms = 250
failure_cooldown_trigger = 3
cooldown_seconds = 5

[queue]
visibility_timeout_seconds = 15
max_deliveries = 7
poll_interval_ms = 50
max_message_chars = 500

[slack]
allowed_user_ids = ["U1", "U2"]

[task_store]
endpoint = "http://localhost:8080/actions"
"#;

fn expect_config_error(raw: &str, needle: &str) {
    match GlobalConfig::from_toml_str(raw) {
        Err(AppError::Config(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected config error mentioning {needle}, got {other:?}"),
    }
}

#[test]
fn empty_document_uses_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("defaults are valid");
    assert_eq!(config.database_path, PathBuf::from("data/task-intercom.db"));
    assert_eq!(config.retention_hours, 24);
    assert!(config.projects.is_empty());
    assert!(config.slack.is_none());
    assert!(config.task_store.is_none());
    assert!((config.interpreter.confidence_threshold - 0.75).abs() < f64::EPSILON);
    assert_eq!(config.interpreter.slot_timeout_seconds, 120);
    assert_eq!(config.interpreter.duplicate_window_seconds, 30);
    assert_eq!(config.interpreter.fuzzy_strategy, SimilarityStrategy::JaroWinkler);
    assert!(config.interpreter.strip_emoji);
    assert_eq!(config.workers.executors, 2);
    assert_eq!(config.queue.max_deliveries, 5);
    assert_eq!(config.queue.max_message_chars, 2000);
}

#[test]
fn parses_every_section() {
    let config = GlobalConfig::from_toml_str(SAMPLE).expect("sample parses");
    assert_eq!(config.retention_hours, 48);
    assert_eq!(config.projects, vec!["Casa", "Trabalho"]);
    assert_eq!(config.fallback_text, "Não entendi.");
    assert_eq!(config.interpreter.fuzzy_strategy, SimilarityStrategy::Levenshtein);
    assert_eq!(config.interpreter.max_cas_attempts, 3);
    assert_eq!(config.workers.executors, 4);
    assert_eq!(config.queue.visibility_timeout_seconds, 15);

    let slack = config.slack.as_ref().expect("slack section");
    assert_eq!(slack.allowed_user_ids, vec!["U1", "U2"]);
    assert!(slack.app_token.is_empty(), "tokens never come from TOML");

    let store = config.task_store.as_ref().expect("task_store section");
    assert_eq!(store.endpoint, "http://localhost:8080/actions");
    assert_eq!(store.timeout_seconds, 10);
    assert_eq!(store.max_attempts, 3);
}

#[test]
fn derived_settings_follow_config() {
    let config = GlobalConfig::from_toml_str(SAMPLE).expect("sample parses");

    let analyzer = config.analyzer_settings();
    assert!((analyzer.confidence_threshold - 0.8).abs() < f64::EPSILON);
    assert!(!analyzer.normalizer.strip_emoji);
    assert_eq!(analyzer.projects.len(), 2);

    let machine = config.machine_settings();
    assert_eq!(machine.pending_ttl, chrono::Duration::seconds(90));
    assert_eq!(machine.duplicate_window, chrono::Duration::seconds(10));

    let queue = config.queue_settings();
    assert_eq!(queue.visibility_timeout, Duration::from_secs(15));
    assert_eq!(queue.max_deliveries, 7);
    assert_eq!(queue.poll_interval, Duration::from_millis(50));

    let workers = config.worker_settings();
    assert_eq!(workers.pop_timeout, Duration::from_millis(250));
    assert_eq!(workers.failure_cooldown_trigger, 3);
    assert_eq!(workers.cooldown, Duration::from_secs(5));
}

#[test]
fn rejects_threshold_out_of_range() {
    expect_config_error(
        "[interpreter]\nconfidence_threshold = 0.0\n",
        "confidence_threshold",
    );
    expect_config_error(
        "[interpreter]\nconfidence_threshold = 1.5\n",
        "confidence_threshold",
    );
    expect_config_error(
        "[interpreter]\nfuzzy_min_similarity = -0.1\n",
        "fuzzy_min_similarity",
    );
}

#[test]
fn rejects_zero_counts() {
    expect_config_error("[workers]\nexecutors = 0\n", "workers.executors");
    expect_config_error("[queue]\nmax_deliveries = 0\n", "queue.max_deliveries");
    expect_config_error("retention_hours = 0\n", "retention_hours");
}

#[test]
fn rejects_blank_task_store_endpoint() {
    expect_config_error("[task_store]\nendpoint = \"  \"\n", "task_store.endpoint");
}

#[test]
fn rejects_unknown_strategy() {
    let result = GlobalConfig::from_toml_str("[interpreter]\nfuzzy_strategy = \"soundex\"\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(SAMPLE.as_bytes()).expect("write config");

    let config = GlobalConfig::load_from_path(file.path()).expect("config loads");
    assert_eq!(config.retention_hours, 48);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("failed to read config")));
}

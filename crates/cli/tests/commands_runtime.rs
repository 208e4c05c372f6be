use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde_json::{json, Value};
use shopassist_cli::commands::prepare::PrepareArgs;
use shopassist_cli::commands::recommend::RecommendArgs;
use shopassist_cli::commands::{config, doctor, prepare, recommend};
use tempfile::TempDir;

const EDITOR_TURN: &str = "Here is your profile: {'GPU intensity': 'high', 'Display quality': \
    'high', 'Portability': 'low', 'Multitasking': 'high', 'Processing speed': 'high', \
    'Budget': '150000'}";

#[test]
fn recommend_returns_accepted_products_for_complete_requirements() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let result = recommend::run(fixture.recommend_args(EDITOR_TURN));
        assert_eq!(result.exit_code, 0, "expected successful recommendation");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("Creator Z16"), "unexpected message: {message}");
        assert!(!message.contains("Vivobook"));
    });
}

#[test]
fn recommend_json_prints_flat_records_with_price_and_score() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let result =
            recommend::run(RecommendArgs { json: true, ..fixture.recommend_args(EDITOR_TURN) });
        assert_eq!(result.exit_code, 0);

        let accepted = parse_payload(&result.output);
        let accepted = accepted.as_array().expect("json mode prints an array");
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0]["Model Name"], "Creator Z16");
        assert_eq!(accepted[0]["Price"], json!(140000));
        assert_eq!(accepted[0]["Score"], json!(5));
        assert!(accepted[0].get("laptop_feature").is_none());
    });
}

#[test]
fn recommend_keeps_asking_when_a_key_is_missing() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let turn = "{'GPU intensity': 'high', 'Display quality': 'high', 'Multitasking': 'high', \
                    'Processing speed': 'high', 'Budget': '150000'}";
        let result = recommend::run(fixture.recommend_args(turn));
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "requirements_incomplete");
        assert!(payload["correlation_id"].is_string());
    });
}

#[test]
fn recommend_rejects_levels_outside_vocabulary() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let turn = "{'GPU intensity': 'high', 'Display quality': 'high', 'Portability': 'tiny', \
                    'Multitasking': 'high', 'Processing speed': 'high', 'Budget': '150000'}";
        let result = recommend::run(fixture.recommend_args(turn));
        assert_eq!(result.exit_code, 4, "expected malformed requirements code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "malformed_requirements");
        assert!(payload["message"].as_str().unwrap_or_default().contains("Portability"));
        assert!(payload["correlation_id"].is_string());
    });
}

#[test]
fn recommend_rejects_unparsable_budget() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let turn = "{'GPU intensity': 'high', 'Display quality': 'high', 'Portability': 'low', \
                    'Multitasking': 'high', 'Processing speed': 'high', 'Budget': 'flexible'}";
        let result = recommend::run(fixture.recommend_args(turn));
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_budget");
    });
}

#[test]
fn recommend_reports_below_floor_budget_as_domain_answer() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let turn = "{'GPU intensity': 'low', 'Display quality': 'low', 'Portability': 'high', \
                    'Multitasking': 'low', 'Processing speed': 'low', 'Budget': '20000'}";
        let result = recommend::run(fixture.recommend_args(turn));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or_default().contains("no laptops"));
    });
}

#[test]
fn recommend_json_keeps_the_below_floor_message() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let turn = "{'GPU intensity': 'low', 'Display quality': 'low', 'Portability': 'high', \
                    'Multitasking': 'low', 'Processing speed': 'low', 'Budget': '20000'}";
        let result = recommend::run(RecommendArgs { json: true, ..fixture.recommend_args(turn) });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or_default().contains("25000"));
    });
}

#[test]
fn recommend_seed_prints_conversation_opening() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let result =
            recommend::run(RecommendArgs { seed: true, ..fixture.recommend_args(EDITOR_TURN) });
        assert_eq!(result.exit_code, 0);

        let messages = parse_payload(&result.output);
        let messages = messages.as_array().expect("seed mode prints a message array");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        let products = messages[1]["content"].as_str().unwrap_or_default();
        assert!(products.contains("Creator Z16"));
        assert!(!products.contains("Vivobook"));
    });
}

#[test]
fn recommend_respects_budget_floor_from_env() {
    with_env(&[("SHOPASSIST_MATCHING_BUDGET_FLOOR", "10000")], || {
        let fixture = Fixture::new();
        let turn = "{'GPU intensity': 'low', 'Display quality': 'low', 'Portability': 'low', \
                    'Multitasking': 'low', 'Processing speed': 'low', 'Budget': '20000'}";
        let result =
            recommend::run(RecommendArgs { json: true, ..fixture.recommend_args(turn) });
        assert_eq!(result.exit_code, 0);
        assert_eq!(parse_payload(&result.output), json!([]));
    });
}

#[test]
fn recommend_asks_for_more_when_turn_is_a_question() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let result =
            recommend::run(fixture.recommend_args("Do you mostly work with 4K footage?"));
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "requirements_incomplete");
    });
}

#[test]
fn recommend_fails_with_catalog_code_when_catalog_is_missing() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let args = RecommendArgs {
            catalog: Some(fixture.dir.path().join("absent.json")),
            ..fixture.recommend_args(EDITOR_TURN)
        };
        let result = recommend::run(args);
        assert_eq!(result.exit_code, 3);
        assert_eq!(parse_payload(&result.output)["error_class"], "catalog_load");
    });
}

#[test]
fn recommend_fails_with_config_code_on_invalid_threshold() {
    with_env(&[("SHOPASSIST_MATCHING_ACCEPTANCE_THRESHOLD", "9")], || {
        let fixture = Fixture::new();
        let result = recommend::run(fixture.recommend_args(EDITOR_TURN));
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn prepare_writes_versioned_catalog_without_model_calls_when_complete() {
    with_env(&[], || {
        let fixture = Fixture::new();
        let output = fixture.dir.path().join("prepared.json");
        let result = prepare::run(PrepareArgs {
            catalog: Some(fixture.catalog.clone()),
            output: Some(output.clone()),
            config_path: None,
        });
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "prepare");
        assert!(payload["message"].as_str().unwrap_or_default().contains("3 already prepared"));

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&output).expect("prepared catalog written"))
                .expect("prepared catalog is json");
        assert!(written["prepared_at"].is_string());
        assert_eq!(written["products"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn prepare_fails_with_catalog_code_when_catalog_is_missing() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let result = prepare::run(PrepareArgs {
            catalog: Some(dir.path().join("absent.json")),
            output: Some(dir.path().join("out.json")),
            config_path: None,
        });
        assert_eq!(result.exit_code, 3);
        assert_eq!(parse_payload(&result.output)["error_class"], "catalog_load");
    });
}

#[test]
fn doctor_passes_for_fully_prepared_catalog() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog.display().to_string();
    let prepared = fixture.dir.path().join("not-yet.json").display().to_string();
    with_env(
        &[
            ("SHOPASSIST_CATALOG_PATH", catalog.as_str()),
            ("SHOPASSIST_CATALOG_PREPARED_PATH", prepared.as_str()),
        ],
        || {
            let report = parse_payload(&doctor::run(true, None));
            assert_eq!(report["overall_status"], "pass");
            assert_eq!(report["checks"].as_array().map(Vec::len), Some(3));
        },
    );
}

#[test]
fn doctor_flags_products_without_feature_records() {
    let dir = TempDir::new().expect("tempdir");
    let catalog = write_catalog(
        dir.path(),
        json!([{ "Model Name": "Bare", "Price": "55,000", "Description": "Core i5, 16 GB" }]),
    );
    let catalog = catalog.display().to_string();
    let prepared = dir.path().join("not-yet.json").display().to_string();
    with_env(
        &[
            ("SHOPASSIST_CATALOG_PATH", catalog.as_str()),
            ("SHOPASSIST_CATALOG_PREPARED_PATH", prepared.as_str()),
        ],
        || {
            let report = parse_payload(&doctor::run(true, None));
            assert_eq!(report["overall_status"], "fail");
            assert_eq!(report["checks"][2]["name"], "feature_coverage");
            assert_eq!(report["checks"][2]["status"], "fail");

            let human = doctor::run(false, None);
            assert!(human.contains("- [fail] feature_coverage"));
        },
    );
}

#[test]
fn doctor_skips_catalog_checks_when_config_is_invalid() {
    with_env(&[("SHOPASSIST_LLM_TIMEOUT_SECS", "0")], || {
        let report = parse_payload(&doctor::run(true, None));
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
    });
}

#[test]
fn config_attributes_values_to_their_source() {
    let env = [("SHOPASSIST_CATALOG_PATH", "from-env.json"), ("SHOPASSIST_LOG_LEVEL", "debug")];
    with_env(&env, || {
        let output = config::run(None);
        assert!(output.contains(
            "- catalog.path = from-env.json (source: env (SHOPASSIST_CATALOG_PATH))"
        ));
        assert!(output.contains("- logging.level = debug (source: env (SHOPASSIST_LOG_LEVEL))"));
        assert!(output.contains("- matching.budget_floor = 25000 (source: default)"));
        assert!(output.contains("- llm.api_key = <unset> (source: default)"));
    });
}

#[test]
fn config_redacts_api_keys() {
    with_env(
        &[("SHOPASSIST_LLM_PROVIDER", "openai"), ("SHOPASSIST_LLM_API_KEY", "sk-secret-value")],
        || {
            let output = config::run(None);
            let expected = "- llm.api_key = sk-*** (source: env (SHOPASSIST_LLM_API_KEY))";
            assert!(output.contains(expected));
            assert!(!output.contains("secret-value"));
        },
    );
}

struct Fixture {
    dir: TempDir,
    catalog: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let catalog = write_catalog(
            dir.path(),
            json!([
                {
                    "Brand": "MSI",
                    "Model Name": "Creator Z16",
                    "Price": "1,40,000",
                    "laptop_feature": "{'GPU intensity': 'high','Display quality': 'high',\
                        'Portability': 'medium','Multitasking': 'high','Processing speed': 'high'}"
                },
                {
                    "Brand": "ASUS",
                    "Model Name": "Vivobook 15",
                    "Price": "42,990",
                    "laptop_feature": {
                        "GPU intensity": "low", "Display quality": "medium", "Portability": "medium",
                        "Multitasking": "low", "Processing speed": "medium"
                    }
                },
                {
                    "Brand": "Dell",
                    "Model Name": "Alienware m18",
                    "Price": "2,60,000",
                    "laptop_feature": {
                        "GPU intensity": "high", "Display quality": "high", "Portability": "low",
                        "Multitasking": "high", "Processing speed": "high"
                    }
                }
            ]),
        );
        Self { dir, catalog }
    }

    fn recommend_args(&self, turn: &str) -> RecommendArgs {
        let requirements = self.dir.path().join(format!("turn-{}.txt", turn.len()));
        fs::write(&requirements, turn).expect("requirements file written");
        RecommendArgs {
            requirements: requirements.display().to_string(),
            catalog: Some(self.catalog.clone()),
            config_path: None,
            json: false,
            seed: false,
            use_llm: false,
        }
    }
}

fn write_catalog(dir: &Path, rows: Value) -> PathBuf {
    let path = dir.join("laptops.json");
    fs::write(&path, rows.to_string()).expect("catalog written");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|e| e.into_inner());

    let keys = [
        "SHOPASSIST_LLM_PROVIDER",
        "SHOPASSIST_LLM_API_KEY",
        "SHOPASSIST_LLM_BASE_URL",
        "SHOPASSIST_LLM_MODEL",
        "SHOPASSIST_LLM_TIMEOUT_SECS",
        "SHOPASSIST_LLM_MAX_RETRIES",
        "SHOPASSIST_LLM_RETRY_BASE_DELAY_MS",
        "SHOPASSIST_LLM_RETRY_MAX_DELAY_MS",
        "SHOPASSIST_CATALOG_PATH",
        "SHOPASSIST_CATALOG_PREPARED_PATH",
        "SHOPASSIST_MATCHING_ACCEPTANCE_THRESHOLD",
        "SHOPASSIST_MATCHING_MAX_CANDIDATES",
        "SHOPASSIST_MATCHING_BUDGET_FLOOR",
        "SHOPASSIST_LOGGING_LEVEL",
        "SHOPASSIST_LOGGING_FORMAT",
        "SHOPASSIST_LOG_LEVEL",
        "SHOPASSIST_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

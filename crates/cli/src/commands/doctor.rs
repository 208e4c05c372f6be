use std::path::Path;

use serde::Serialize;
use shopassist_core::config::{AppConfig, ConfigOverrides};
use shopassist_core::CatalogSnapshot;

use super::{load_config, matching_catalog_path};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool, config_path: Option<&Path>) -> String {
    let report = build_report(config_path);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config_path: Option<&Path>) -> DoctorReport {
    let mut checks = Vec::new();

    match load_config(config_path, ConfigOverrides::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match check_catalog(&config) {
                Ok((readable, coverage)) => {
                    checks.push(readable);
                    checks.push(coverage);
                }
                Err(readable) => {
                    checks.push(readable);
                    checks.push(skipped("feature_coverage", "catalog did not load"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("catalog_readability", "configuration did not load"));
            checks.push(skipped("feature_coverage", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog(config: &AppConfig) -> Result<(DoctorCheck, DoctorCheck), DoctorCheck> {
    let path = matching_catalog_path(config);
    let snapshot = CatalogSnapshot::load(&path).map_err(|error| DoctorCheck {
        name: "catalog_readability",
        status: CheckStatus::Fail,
        details: error.to_string(),
    })?;

    let readable = DoctorCheck {
        name: "catalog_readability",
        status: CheckStatus::Pass,
        details: format!("loaded {} products from `{}`", snapshot.len(), path.display()),
    };

    let missing = snapshot.products.iter().filter(|product| product.features.is_none()).count();
    let coverage = if missing == 0 {
        DoctorCheck {
            name: "feature_coverage",
            status: CheckStatus::Pass,
            details: "every product carries a feature record".to_string(),
        }
    } else {
        DoctorCheck {
            name: "feature_coverage",
            status: CheckStatus::Fail,
            details: format!(
                "{missing} of {} products have no feature record and will score 0; run `shopassist prepare`",
                snapshot.len()
            ),
        }
    };

    Ok((readable, coverage))
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

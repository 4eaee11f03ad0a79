use orderbot_agent::build_llm_client;
use orderbot_core::backend::{InMemoryOrderBackend, OrderBackend};
use orderbot_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::CommandResult;

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

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_credentials(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "llm_credentials",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }
    checks.push(check_order_backend());

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Builds the client without calling the model; no network traffic.
fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let llm = &config.llm;
    let key_state = if llm.has_api_key() {
        "api key present"
    } else if llm.provider.requires_api_key() {
        "api key missing"
    } else {
        "no api key required"
    };

    match build_llm_client(llm) {
        Ok(_) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Pass,
            details: format!(
                "{:?} client ready for model `{}` at {} ({key_state})",
                llm.provider,
                llm.model,
                llm.effective_base_url()
            ),
        },
        Err(error) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Fail,
            details: format!("{error} ({key_state})"),
        },
    }
}

fn check_order_backend() -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "order_backend",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let backend = InMemoryOrderBackend::with_demo_orders();
    let Some(first) = backend.orders().first().map(|order| order.id.to_string()) else {
        return DoctorCheck {
            name: "order_backend",
            status: CheckStatus::Fail,
            details: "no demo orders are loaded".to_string(),
        };
    };

    match runtime.block_on(backend.track_order(&first)) {
        Ok(info) => DoctorCheck {
            name: "order_backend",
            status: CheckStatus::Pass,
            details: format!(
                "{} demo orders loaded; {} is {}",
                backend.orders().len(),
                info.order_id,
                info.status
            ),
        },
        Err(error) => DoctorCheck {
            name: "order_backend",
            status: CheckStatus::Fail,
            details: format!("tracking lookup for {first} failed: {error}"),
        },
    }
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

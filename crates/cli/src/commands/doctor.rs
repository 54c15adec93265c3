use offerhub_core::config::AppConfig;
use offerhub_db::{connect_with_settings, migrations::MIGRATOR, DbPool};
use offerhub_distributors::build_gateway;
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::commands::{current_thread_runtime, load_config, CommandResult};

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

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const CONFIG: &str = "config_validation";
const DATABASE: &str = "database_connectivity";
const SCHEMA: &str = "database_schema";
const DISTRIBUTORS: &str = "distributor_reachability";

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if !json_output {
        return CommandResult { exit_code, output: render_human(&report) };
    }
    match serde_json::to_string_pretty(&report) {
        Ok(output) => CommandResult { exit_code, output },
        Err(error) => CommandResult::failure("doctor", "serialization", error.to_string(), 1),
    }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match (load_config("doctor"), current_thread_runtime("doctor")) {
        (Ok(config), Ok(runtime)) => {
            checks.push(DoctorCheck::pass(
                CONFIG,
                format!("configuration valid, {} distributor(s)", config.distributors.len()),
            ));
            checks.extend(check_database(&config, &runtime));
            checks.push(check_distributors(&config, &runtime));
        }
        (Err(failure), _) | (_, Err(failure)) => {
            checks.push(DoctorCheck::fail(CONFIG, failure.output));
            for name in [DATABASE, SCHEMA, DISTRIBUTORS] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let failed = checks.iter().filter(|check| check.status == CheckStatus::Fail).count();
    DoctorReport {
        overall_status: if all_pass { CheckStatus::Pass } else { CheckStatus::Fail },
        summary: if all_pass {
            "doctor: all readiness checks passed".to_string()
        } else {
            format!("doctor: {failed} readiness check(s) failed")
        },
        checks,
    }
}

fn check_database(config: &AppConfig, runtime: &Runtime) -> Vec<DoctorCheck> {
    let connected = runtime.block_on(connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    ));
    let pool = match connected {
        Ok(pool) => pool,
        Err(error) => {
            return vec![
                DoctorCheck::fail(DATABASE, format!("failed to connect to database: {error}")),
                DoctorCheck::skipped(SCHEMA, "the database is unreachable"),
            ];
        }
    };

    let schema = runtime.block_on(check_schema(&pool));
    runtime.block_on(pool.close());
    vec![DoctorCheck::pass(DATABASE, format!("connected using `{}`", config.database.url)), schema]
}

async fn check_schema(pool: &DbPool) -> DoctorCheck {
    let expected =
        MIGRATOR.iter().filter(|migration| !migration.migration_type.is_down_migration()).count();
    let applied = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await;

    match applied {
        Ok(applied) if applied as usize >= expected => {
            DoctorCheck::pass(SCHEMA, format!("{applied} of {expected} migration(s) applied"))
        }
        Ok(applied) => DoctorCheck::fail(
            SCHEMA,
            format!("{applied} of {expected} migration(s) applied; run `offerhub migrate`"),
        ),
        Err(_) => DoctorCheck::fail(SCHEMA, "schema not initialised; run `offerhub migrate`"),
    }
}

fn check_distributors(config: &AppConfig, runtime: &Runtime) -> DoctorCheck {
    let gateway = match build_gateway(config) {
        Ok(gateway) => gateway,
        Err(error) => {
            return DoctorCheck::fail(
                DISTRIBUTORS,
                format!("failed to build distributor clients: {error}"),
            );
        }
    };

    let reports = runtime.block_on(gateway.probe_all());
    let unreachable: Vec<String> = reports
        .iter()
        .filter(|report| !report.connected)
        .map(|report| format!("{} ({})", report.distributor_id, report.detail))
        .collect();

    if unreachable.is_empty() {
        DoctorCheck::pass(DISTRIBUTORS, format!("{} distributor(s) reachable", reports.len()))
    } else {
        DoctorCheck::fail(
            DISTRIBUTORS,
            format!(
                "{} of {} unreachable: {}",
                unreachable.len(),
                reports.len(),
                unreachable.join(", ")
            ),
        )
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

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

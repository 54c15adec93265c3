use offerhub_core::gateway::ProbeReport;
use offerhub_distributors::build_gateway;
use serde::Serialize;

use crate::commands::{current_thread_runtime, exit, load_config, CommandResult};

#[derive(Debug, Serialize)]
struct ProbeOutcome {
    command: &'static str,
    status: &'static str,
    reachable: usize,
    total: usize,
    reports: Vec<ProbeReport>,
}

/// Exits non-zero when any distributor is unreachable.
pub fn run() -> CommandResult {
    let config = match load_config("probe") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("probe") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let gateway = match build_gateway(&config) {
        Ok(gateway) => gateway,
        Err(error) => {
            return CommandResult::failure(
                "probe",
                "client_init",
                format!("failed to build distributor clients: {error}"),
                exit::DISTRIBUTOR,
            );
        }
    };

    let reports = runtime.block_on(gateway.probe_all());
    let reachable = reports.iter().filter(|report| report.connected).count();
    let total = reports.len();
    let all_reachable = reachable == total;

    let outcome = ProbeOutcome {
        command: "probe",
        status: if all_reachable { "ok" } else { "degraded" },
        reachable,
        total,
        reports,
    };
    let output = match serde_json::to_string_pretty(&outcome) {
        Ok(output) => output,
        Err(error) => {
            return CommandResult::failure("probe", "serialization", error.to_string(), 1);
        }
    };

    CommandResult { exit_code: if all_reachable { 0 } else { exit::DISTRIBUTOR }, output }
}

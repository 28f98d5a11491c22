use std::time::{Duration, Instant};

use addrbatch_common::address::object::AddressObject;
use addrbatch_common::address::record::AddressRecord;
use addrbatch_common::config::ManagerConfig;
use addrbatch_common::{success, warn};
use addrbatch_core::api::jsonrpc::JsonRpcClient;
use addrbatch_core::batch::{BatchExecutor, BatchReport};
use addrbatch_core::session::AuthStrategy;
use colored::*;

use crate::terminal::{colors, print};

type Detail = (String, ColoredString);

const KEY_WIDTH: usize = 14;

pub async fn provision(cfg: &ManagerConfig, records: &[AddressRecord]) -> anyhow::Result<()> {
    let client = JsonRpcClient::new(cfg)?;
    print::aligned_line("Manager", client.endpoint().to_string(), KEY_WIDTH);
    print::aligned_line("Domain", cfg.domain.as_str(), KEY_WIDTH);

    let start_time: Instant = Instant::now();
    let report: BatchReport = BatchExecutor::new(cfg).run(Box::new(client), records).await?;

    print_report(&report, start_time.elapsed());
    print::print("Operation completed.");

    exit_status(&report)
}

/// Failed records alone still exit zero; a failed commit, unlock or logout does not.
fn exit_status(report: &BatchReport) -> anyhow::Result<()> {
    if report.epilogue_completed() {
        return Ok(());
    }
    let steps: Vec<String> = report
        .epilogue_failures
        .iter()
        .map(|failure| failure.step.to_string())
        .collect();
    anyhow::bail!("transaction did not close cleanly ({} failed)", steps.join(", "))
}

pub fn dry_run(records: &[AddressRecord]) {
    print::header("dry run");

    let mut valid: usize = 0;
    for record in records {
        match AddressObject::from_record(record) {
            Ok(object) => {
                valid += 1;
                let payload = serde_json::to_string(&object).unwrap_or_default();
                print::print_status(format!("{} {}", object.name.color(colors::PRIMARY), payload));
            }
            Err(e) => warn!("{}: {e}", record.name),
        }
    }

    success!("{valid} of {} addresses would be created", records.len());
}

fn print_report(report: &BatchReport, total_time: Duration) {
    print::header("summary");

    let auth: &str = match report.strategy {
        AuthStrategy::Token => "api token",
        AuthStrategy::Password => "password login",
    };
    print::aligned_line("Authentication", auth, KEY_WIDTH);
    print::aligned_line("Created", report.succeeded().to_string().green().bold(), KEY_WIDTH);
    print::aligned_line("Failed", failed_count(report.failed()), KEY_WIDTH);
    print::aligned_line(
        "Elapsed",
        format!("{:.2}s", total_time.as_secs_f64()).yellow(),
        KEY_WIDTH,
    );

    let failures = report.outcomes.iter().filter(|o| !o.success);
    for (idx, outcome) in failures.enumerate() {
        print::tree_head(idx, &outcome.name);
        let details: Vec<Detail> = vec![
            ("Subnet".to_string(), outcome.subnet.normal()),
            ("Code".to_string(), outcome.code.to_string().color(colors::FAILURE)),
            ("Reason".to_string(), outcome.message.normal()),
        ];
        print::as_tree_one_level(details);
    }

    for failure in &report.epilogue_failures {
        print::aligned_line(
            &failure.step.to_string(),
            failure.reason.as_str().color(colors::FAILURE),
            KEY_WIDTH,
        );
    }

    print::fat_separator();
}

fn failed_count(failed: usize) -> ColoredString {
    if failed == 0 {
        failed.to_string().normal()
    } else {
        failed.to_string().color(colors::FAILURE).bold()
    }
}

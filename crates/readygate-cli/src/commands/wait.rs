//! The `wait` and `wait-all` subcommands.

use std::path::Path;

use serde::Serialize;

use readygate_core::{ConfigError, ProbeOutcome, ProbeRequest, SuccessPolicy, parse_duration};
use readygate_poller::{HttpProbe, ReadinessWatcher, poll};

use crate::config::WaitConfig;

/// Per-target outcome as emitted in JSON reports.
#[derive(Serialize)]
struct Report<'a> {
    target: &'a str,
    #[serde(flatten)]
    outcome: &'a ProbeOutcome,
}

/// Poll a single target. Returns whether it became ready.
pub async fn wait(
    target: &str,
    max_attempts: u32,
    interval: &str,
    probe_timeout: &str,
    expect: u16,
    accept_redirects: bool,
    format: &str,
) -> anyhow::Result<bool> {
    let interval =
        parse_duration(interval).ok_or_else(|| ConfigError::InvalidDuration(interval.into()))?;
    let probe_timeout = parse_duration(probe_timeout)
        .ok_or_else(|| ConfigError::InvalidDuration(probe_timeout.into()))?;
    let policy = if accept_redirects {
        SuccessPolicy::accept_redirects()
    } else {
        SuccessPolicy::Status(expect)
    };

    let request = ProbeRequest::new(target)
        .with_max_attempts(max_attempts)
        .with_interval(interval)
        .with_probe_timeout(probe_timeout)
        .with_policy(policy);

    let outcome = poll(&HttpProbe, &request).await?;

    if format == "json" {
        let report = Report { target, outcome: &outcome };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_text(target, &outcome));
    }
    Ok(outcome.success)
}

/// Poll every target in the config file concurrently. Returns whether
/// all of them became ready.
pub async fn wait_all(config_path: &str, format: &str) -> anyhow::Result<bool> {
    let config = WaitConfig::from_path(Path::new(config_path))?;
    let requests = config.requests()?;

    tracing::info!(targets = requests.len(), config = config_path, "waiting for targets");

    let watcher = ReadinessWatcher::new(HttpProbe);
    for request in requests {
        watcher.start(request).await?;
    }

    let mut rows: Vec<(String, ProbeOutcome)> = watcher.wait_all().await.into_iter().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    let all_ready = rows.iter().all(|(_, outcome)| outcome.success);

    if format == "json" {
        let reports: Vec<Report> = rows
            .iter()
            .map(|(target, outcome)| Report { target, outcome })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for (target, outcome) in &rows {
            println!("{}", render_text(target, outcome));
        }
    }
    Ok(all_ready)
}

fn render_text(target: &str, outcome: &ProbeOutcome) -> String {
    if outcome.success {
        format!(
            "{target}: ready in {} attempt(s) ({}ms)",
            outcome.attempts_used, outcome.elapsed_ms
        )
    } else {
        let reason = outcome
            .last_error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "{target}: not ready after {} attempt(s) ({}ms): {reason}",
            outcome.attempts_used, outcome.elapsed_ms
        )
    }
}

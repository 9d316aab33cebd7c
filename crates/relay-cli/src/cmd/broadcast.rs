use crate::output::{print_json, print_table};
use crate::{EXIT_ERROR, EXIT_OK, EXIT_TIMEOUT};
use anyhow::{bail, Context};
use relay_core::broadcast::{self, BroadcastStatus};
use relay_core::wait::WaitOptions;
use relay_core::{SystemClock, TmuxTerminal};
use std::path::Path;

pub fn run(
    config_path: Option<&Path>,
    message: &str,
    timeout_secs: Option<u64>,
    no_preamble: bool,
    json: bool,
) -> anyhow::Result<i32> {
    let mut ctx = super::load_ctx(config_path)?;
    if ctx.config.endpoints.is_empty() {
        bail!("no endpoints configured");
    }

    let mut opts = WaitOptions::from_config(&ctx.config.wait);
    if let Some(secs) = timeout_secs {
        opts = opts.with_timeout_ms(secs * 1_000);
    }
    let cancel = super::install_interrupt()?;

    let outcome = broadcast::broadcast(
        &TmuxTerminal,
        &SystemClock,
        &ctx.state_dir,
        &ctx.config,
        &mut ctx.counters,
        message,
        &opts,
        no_preamble,
        &cancel,
    )?;
    ctx.counters
        .save(&ctx.state_dir)
        .context("saving preamble counters")?;

    if json {
        print_json(&outcome)?;
    } else {
        if let Some(warning) = &outcome.actor_warning {
            eprintln!("warning: {warning}");
        }
        let rows = outcome
            .results
            .iter()
            .map(|r| {
                vec![
                    r.target.clone(),
                    format!("{:?}", r.status).to_lowercase(),
                    format!("{}ms", r.elapsed_ms),
                    r.response
                        .as_deref()
                        .or(r.partial_response.as_deref())
                        .or(r.error.as_deref())
                        .unwrap_or("-")
                        .lines()
                        .next()
                        .unwrap_or("-")
                        .to_string(),
                ]
            })
            .collect();
        print_table(&["ENDPOINT", "STATUS", "ELAPSED", "RESULT"], rows);
        let s = &outcome.summary;
        println!(
            "\n{} total: {} completed, {} timeout, {} error, {} skipped",
            s.total, s.completed, s.timeout, s.error, s.skipped
        );
    }

    Ok(match outcome.status {
        BroadcastStatus::Success => EXIT_OK,
        BroadcastStatus::Timeout => EXIT_TIMEOUT,
        BroadcastStatus::Error | BroadcastStatus::AllSendsFailed => EXIT_ERROR,
    })
}

use crate::output::print_json;
use crate::{EXIT_ERROR, EXIT_OK, EXIT_TIMEOUT};
use anyhow::Context;
use relay_core::wait::{self, WaitOptions, WaitStatus};
use relay_core::{compose, SystemClock, TmuxTerminal};
use std::path::Path;

pub fn run(
    config_path: Option<&Path>,
    endpoint_name: &str,
    message: &str,
    wait_mode: bool,
    timeout_secs: Option<u64>,
    no_preamble: bool,
    json: bool,
) -> anyhow::Result<i32> {
    let mut ctx = super::load_ctx(config_path)?;
    let endpoint = ctx.config.endpoint(endpoint_name)?.clone();
    let term = TmuxTerminal;

    let composed = compose::compose(
        message,
        &endpoint,
        &ctx.config.preambles,
        &mut ctx.counters,
        no_preamble,
    );
    ctx.counters
        .save(&ctx.state_dir)
        .context("saving preamble counters")?;

    if !wait_mode {
        let text = compose::apply_strip_chars(&composed, endpoint.strip_chars.as_deref());
        wait::send_only(&term, &endpoint, &text)?;
        if json {
            print_json(&serde_json::json!({
                "target": endpoint.name,
                "address": endpoint.address,
                "status": "sent",
            }))?;
        } else {
            println!("Sent to {}", endpoint.name);
        }
        return Ok(EXIT_OK);
    }

    let mut opts = WaitOptions::from_config(&ctx.config.wait);
    if let Some(secs) = timeout_secs {
        opts = opts.with_timeout_ms(secs * 1_000);
    }
    let cancel = super::install_interrupt()?;

    let outcome = wait::send_and_wait(
        &term,
        &SystemClock,
        &ctx.state_dir,
        &endpoint,
        &composed,
        &opts,
        &cancel,
    )?;

    if json {
        print_json(&outcome)?;
    } else {
        match outcome.status {
            WaitStatus::Completed => {
                println!("{}", outcome.response.as_deref().unwrap_or("(empty response)"));
            }
            WaitStatus::Timeout => {
                eprintln!(
                    "timed out after {}ms waiting for {}",
                    outcome.elapsed_ms, outcome.target
                );
                if let Some(partial) = &outcome.partial_response {
                    println!("{partial}");
                }
            }
            WaitStatus::Error => {
                eprintln!(
                    "error waiting for {}: {}",
                    outcome.target,
                    outcome.error.as_deref().unwrap_or("unknown")
                );
            }
            WaitStatus::Cancelled => {
                eprintln!("cancelled while waiting for {}", outcome.target);
            }
            WaitStatus::Pending => unreachable!("waiter returned a non-terminal outcome"),
        }
    }

    Ok(match outcome.status {
        WaitStatus::Completed => EXIT_OK,
        WaitStatus::Timeout => EXIT_TIMEOUT,
        _ => EXIT_ERROR,
    })
}

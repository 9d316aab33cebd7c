use crate::output::{print_json, print_table};
use crate::EXIT_OK;
use clap::Subcommand;
use relay_core::clock::{Clock, SystemClock};
use relay_core::{paths, registry};

#[derive(Subcommand)]
pub enum StateSubcommand {
    /// List in-flight requests from the advisory registry
    Show,
    /// Remove registry entries older than the TTL
    Cleanup {
        /// Entry time-to-live in seconds
        #[arg(long, default_value = "3600")]
        ttl_secs: u64,
    },
}

pub fn run(subcmd: StateSubcommand, json: bool) -> anyhow::Result<i32> {
    let state_dir = paths::state_dir()?;
    match subcmd {
        StateSubcommand::Show => {
            let entries = registry::list_active_requests(&state_dir)?;
            if json {
                let values: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|(name, e)| {
                        serde_json::json!({
                            "endpoint": name,
                            "request_id": e.request_id,
                            "address": e.address,
                            "started_at_ms": e.started_at_ms,
                        })
                    })
                    .collect();
                print_json(&values)?;
            } else if entries.is_empty() {
                println!("No in-flight requests");
            } else {
                let rows = entries
                    .iter()
                    .map(|(name, e)| {
                        vec![name.clone(), e.request_id.clone(), e.address.clone()]
                    })
                    .collect();
                print_table(&["ENDPOINT", "REQUEST", "ADDRESS"], rows);
            }
        }
        StateSubcommand::Cleanup { ttl_secs } => {
            let removed =
                registry::cleanup_state(&state_dir, ttl_secs, SystemClock.now_ms())?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }))?;
            } else {
                println!("Removed {removed} stale entries");
            }
        }
    }
    Ok(EXIT_OK)
}

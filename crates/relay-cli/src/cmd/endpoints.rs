use crate::output::{print_json, print_table};
use crate::EXIT_OK;
use relay_core::registry;
use std::path::Path;

pub fn run(config_path: Option<&Path>, json: bool) -> anyhow::Result<i32> {
    let ctx = super::load_ctx(config_path)?;
    let active: Vec<String> = registry::list_active_requests(&ctx.state_dir)?
        .into_iter()
        .map(|(name, _)| name)
        .collect();

    if json {
        let entries: Vec<serde_json::Value> = ctx
            .config
            .endpoints
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "address": e.address,
                    "preamble": e.preamble.is_some(),
                    "active": active.contains(&e.name),
                })
            })
            .collect();
        print_json(&entries)?;
    } else {
        let rows = ctx
            .config
            .endpoints
            .iter()
            .map(|e| {
                vec![
                    e.name.clone(),
                    e.address.clone(),
                    if e.preamble.is_some() { "yes" } else { "-" }.to_string(),
                    if active.contains(&e.name) { "yes" } else { "-" }.to_string(),
                ]
            })
            .collect();
        print_table(&["NAME", "ADDRESS", "PREAMBLE", "ACTIVE"], rows);
    }
    Ok(EXIT_OK)
}

//! Info command implementation
//!
//! Display the effective configuration and what the tree was built from.

use clap::Args;
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::command::Command;
use crate::common::Runtime;
use crate::error::Result;

const DEFAULTS: &str = "built-in defaults";

/// Information about a running arbor
#[derive(Debug, Serialize)]
pub struct InfoData {
    arbor: ArborInfo,
    backends: BackendInfo,
    plugins: Vec<String>,
    counts: CountInfo,
    chains: ChainInfo,
}

#[derive(Debug, Serialize)]
struct ArborInfo {
    version: &'static str,
    config: String,
}

#[derive(Debug, Serialize)]
struct BackendInfo {
    storage: String,
    crypto: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct CountInfo {
    entities: usize,
    groups: usize,
}

#[derive(Debug, Serialize)]
struct ChainInfo {
    entity: IndexMap<String, Vec<String>>,
    group: IndexMap<String, Vec<String>>,
}

/// Info command
#[derive(Debug, Args)]
pub struct InfoCommand {
    /// Also list every chain and its hooks
    #[arg(long)]
    pub all: bool,

    /// Output in JSON format (default: table format)
    #[arg(long)]
    pub json: bool,
}

impl Command for InfoCommand {
    type Output = InfoData;

    fn execute(&self, runtime: &Runtime) -> Result<InfoData> {
        let info = gather_info(runtime)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            display_table(&info, self.all);
        }

        Ok(info)
    }
}

/// Gather counts, backends and chain layouts
fn gather_info(runtime: &Runtime) -> Result<InfoData> {
    tracing::debug!("Gathering tree information");
    let tree = &runtime.tree;
    let storage = tree.refs().storage();

    let entity = tree
        .entity_chains()
        .chain_names()
        .map(|chain| (chain.to_string(), hook_list(tree.entity_chains().hook_names(chain))))
        .collect();
    let group = tree
        .group_chains()
        .chain_names()
        .map(|chain| (chain.to_string(), hook_list(tree.group_chains().hook_names(chain))))
        .collect();

    Ok(InfoData {
        arbor: ArborInfo {
            version: env!("CARGO_PKG_VERSION"),
            config: runtime
                .config
                .source()
                .map_or_else(|| DEFAULTS.to_string(), |p| p.display().to_string()),
        },
        backends: BackendInfo {
            storage: runtime.storage_backend().to_string(),
            crypto: runtime.crypto_backend().to_string(),
            token: runtime.config.token.backend.clone(),
        },
        plugins: runtime.plugins.names(),
        counts: CountInfo {
            entities: storage.discover_entity_ids()?.len(),
            groups: storage.discover_group_names()?.len(),
        },
        chains: ChainInfo { entity, group },
    })
}

fn hook_list(names: Option<Vec<&str>>) -> Vec<String> {
    names
        .unwrap_or_default()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn display_table(info: &InfoData, all: bool) {
    println!("{}", "Arbor".bold());
    println!("  {:<12} {}", "Version".dimmed(), info.arbor.version);
    println!("  {:<12} {}", "Config".dimmed(), info.arbor.config);
    println!();

    println!("{}", "Backends".bold());
    println!("  {:<12} {}", "Storage".dimmed(), info.backends.storage);
    println!("  {:<12} {}", "Crypto".dimmed(), info.backends.crypto);
    println!("  {:<12} {}", "Token".dimmed(), info.backends.token);
    println!();

    println!("{}", "Tree".bold());
    println!("  {:<12} {}", "Entities".dimmed(), info.counts.entities);
    println!("  {:<12} {}", "Groups".dimmed(), info.counts.groups);
    let plugins = if info.plugins.is_empty() {
        "none".dimmed().to_string()
    } else {
        info.plugins.join(", ")
    };
    println!("  {:<12} {plugins}", "Plugins".dimmed());

    if all {
        for (kind, chains) in [
            ("Entity chains", &info.chains.entity),
            ("Group chains", &info.chains.group),
        ] {
            println!();
            println!("{}", kind.bold());
            for (chain, hooks) in chains {
                println!("  {:<22} {}", chain.cyan(), hooks.join(" → "));
            }
        }
    }
}

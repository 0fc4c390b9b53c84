//! Token commands

use arbor_core::{Capability, Entity, Result as ArborResult, TokenClaims};
use arbor_tree::Tree;
use clap::Subcommand;
use owo_colors::OwoColorize;

use crate::cmd::entity::join;
use crate::command::Command;
use crate::common::Runtime;
use crate::error::Result;

/// Commands issuing and checking bearer tokens
#[derive(Debug, Subcommand)]
pub enum TokenCommands {
    /// Authenticate an entity and print a token for it
    Issue {
        /// Entity ID
        id: String,

        /// The entity's secret
        #[arg(long, env = "ARBOR_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Validate a token and print its claims
    Validate {
        /// Token to check
        token: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl Command for TokenCommands {
    type Output = ();

    fn execute(&self, runtime: &Runtime) -> Result<()> {
        match self {
            Self::Issue { id, secret } => {
                let entity = runtime.tree.validate_secret(id, secret)?;
                let claims = claims_for(&runtime.tree, &entity)?;
                let token = runtime.token_service()?.issue(&claims)?;
                tracing::info!(id, "Issued token");
                println!("{token}");
            }
            Self::Validate { token, json } => {
                let claims = runtime.token_service()?.validate(token)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&claims)?);
                } else {
                    println!("{} token for {}", "Valid".green(), claims.entity_id.bold());
                    println!(
                        "  {:<14} {}",
                        "Capabilities".dimmed(),
                        join(claims.capabilities.iter().copied().map(Capability::as_str))
                    );
                }
            }
        }
        Ok(())
    }
}

/// Capabilities granted to `entity` directly and through its direct groups
///
/// Groups that no longer exist contribute nothing.
pub fn claims_for(tree: &Tree, entity: &Entity) -> ArborResult<TokenClaims> {
    let mut capabilities = entity.capabilities.clone();
    for name in &entity.groups {
        match tree.fetch_group(name) {
            Ok(group) => capabilities.extend(group.capabilities),
            Err(e) if e.is_not_found() => {
                tracing::debug!(group = %name, "Skipping missing group");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(TokenClaims {
        entity_id: entity.id.clone(),
        capabilities,
    })
}

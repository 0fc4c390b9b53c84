//! Entity commands

use arbor_core::{Capability, Entity};
use clap::Subcommand;
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::Runtime;
use crate::error::Result;

/// Commands acting on entities
#[derive(Debug, Subcommand)]
pub enum EntityCommands {
    /// Create an entity
    New {
        /// Entity ID
        id: String,

        /// Entity number (allocated when omitted)
        #[arg(short, long)]
        number: Option<i32>,

        /// Initial secret
        #[arg(long, env = "ARBOR_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Delete an entity
    Delete {
        /// Entity ID
        id: String,
    },

    /// Show one entity
    Show {
        /// Entity ID
        id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List all entities
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Lock an entity so it cannot authenticate
    Lock {
        /// Entity ID
        id: String,
    },

    /// Unlock an entity
    Unlock {
        /// Entity ID
        id: String,
    },

    /// Replace an entity's secret
    SetSecret {
        /// Entity ID
        id: String,

        /// New secret
        #[arg(long, env = "ARBOR_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Set or clear the display name
    SetMeta {
        /// Entity ID
        id: String,

        /// Display name; empty clears it
        meta: String,
    },

    /// Grant a capability
    AddCapability {
        /// Entity ID
        id: String,

        /// Capability (e.g. `CREATE_ENTITY`)
        capability: Capability,
    },

    /// Revoke a capability
    DropCapability {
        /// Entity ID
        id: String,

        /// Capability (e.g. `CREATE_ENTITY`)
        capability: Capability,
    },

    /// Add an entity to a group
    Join {
        /// Entity ID
        id: String,

        /// Group name
        group: String,
    },

    /// Remove an entity from a group
    Leave {
        /// Entity ID
        id: String,

        /// Group name
        group: String,
    },
}

impl Command for EntityCommands {
    type Output = ();

    fn execute(&self, runtime: &Runtime) -> Result<()> {
        let tree = &runtime.tree;
        match self {
            Self::New { id, number, secret } => {
                let entity = tree.new_entity(id, number.unwrap_or(-1), secret.as_deref())?;
                println!(
                    "{} entity {} (number {})",
                    "Created".green(),
                    entity.id.bold(),
                    entity.number
                );
            }
            Self::Delete { id } => {
                tree.delete_entity(id)?;
                println!("{} entity {}", "Deleted".green(), id.bold());
            }
            Self::Show { id, json } => {
                let entity = tree.fetch_entity(id)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&redacted(entity))?);
                } else {
                    print_entity(&entity);
                }
            }
            Self::List { json } => {
                let entities = tree.list_entities()?;
                if *json {
                    let entities: Vec<Entity> = entities.into_iter().map(redacted).collect();
                    println!("{}", serde_json::to_string_pretty(&entities)?);
                } else if entities.is_empty() {
                    println!("{}", "No entities".dimmed());
                } else {
                    for entity in &entities {
                        print_summary(entity);
                    }
                }
            }
            Self::Lock { id } => {
                tree.lock_entity(id)?;
                println!("{} entity {}", "Locked".yellow(), id.bold());
            }
            Self::Unlock { id } => {
                tree.unlock_entity(id)?;
                println!("{} entity {}", "Unlocked".green(), id.bold());
            }
            Self::SetSecret { id, secret } => {
                tree.set_entity_secret(id, secret)?;
                println!("{} secret for {}", "Updated".green(), id.bold());
            }
            Self::SetMeta { id, meta } => {
                tree.update_entity_meta(id, meta)?;
                println!("{} metadata for {}", "Updated".green(), id.bold());
            }
            Self::AddCapability { id, capability } => {
                tree.add_entity_capability(id, *capability)?;
                println!("{} {capability} to {}", "Granted".green(), id.bold());
            }
            Self::DropCapability { id, capability } => {
                tree.drop_entity_capability(id, *capability)?;
                println!("{} {capability} from {}", "Revoked".yellow(), id.bold());
            }
            Self::Join { id, group } => {
                tree.add_entity_to_group(id, group)?;
                println!("{} {} to group {}", "Added".green(), id.bold(), group.bold());
            }
            Self::Leave { id, group } => {
                tree.remove_entity_from_group(id, group)?;
                println!(
                    "{} {} from group {}",
                    "Removed".yellow(),
                    id.bold(),
                    group.bold()
                );
            }
        }
        Ok(())
    }
}

/// Strip the secured secret before display
fn redacted(mut entity: Entity) -> Entity {
    if entity.secret.is_some() {
        entity.secret = Some("<redacted>".to_string());
    }
    entity
}

fn print_summary(entity: &Entity) {
    let state = if entity.locked {
        "locked".red().to_string()
    } else {
        "active".green().to_string()
    };
    println!(
        "{:>6}  {:<24} {state}  {}",
        entity.number,
        entity.id.bold(),
        entity.meta.as_deref().unwrap_or_default().dimmed()
    );
}

fn print_entity(entity: &Entity) {
    println!("{}", entity.id.bold());
    println!("  {:<14} {}", "Number".dimmed(), entity.number);
    println!(
        "  {:<14} {}",
        "Display name".dimmed(),
        entity.meta.as_deref().unwrap_or("-")
    );
    println!(
        "  {:<14} {}",
        "Locked".dimmed(),
        if entity.locked { "yes" } else { "no" }
    );
    println!(
        "  {:<14} {}",
        "Secret".dimmed(),
        if entity.secret.is_some() { "set" } else { "unset" }
    );
    println!("  {:<14} {}", "Groups".dimmed(), join(&entity.groups));
    println!(
        "  {:<14} {}",
        "Capabilities".dimmed(),
        join(entity.capabilities.iter().copied().map(Capability::as_str))
    );
}

/// Comma separated list, or `-` when empty
pub(crate) fn join<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let joined = items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::cmd::tests::runtime;
    use arbor_core::Error;

    #[test]
    fn test_new_and_lock() {
        let runtime = runtime();
        EntityCommands::New {
            id: "alice".into(),
            number: Some(7),
            secret: Some("pw".into()),
        }
        .execute(&runtime)
        .unwrap();
        EntityCommands::Lock { id: "alice".into() }
            .execute(&runtime)
            .unwrap();

        let alice = runtime.tree.fetch_entity("alice").unwrap();
        assert_eq!(alice.number, 7);
        assert!(alice.locked);
    }

    #[test]
    fn test_capabilities_and_membership() {
        let runtime = runtime();
        runtime.tree.new_entity("bob", -1, None).unwrap();
        runtime.tree.new_group("ops", "Ops", None, -1).unwrap();

        EntityCommands::AddCapability {
            id: "bob".into(),
            capability: Capability::LockEntity,
        }
        .execute(&runtime)
        .unwrap();
        EntityCommands::Join {
            id: "bob".into(),
            group: "ops".into(),
        }
        .execute(&runtime)
        .unwrap();

        let bob = runtime.tree.fetch_entity("bob").unwrap();
        assert!(bob.capabilities.contains(&Capability::LockEntity));
        assert!(bob.groups.contains("ops"));

        EntityCommands::Leave {
            id: "bob".into(),
            group: "ops".into(),
        }
        .execute(&runtime)
        .unwrap();
        assert!(runtime.tree.fetch_entity("bob").unwrap().groups.is_empty());
    }

    #[test]
    fn test_delete_missing_entity() {
        let runtime = runtime();
        let err = EntityCommands::Delete { id: "ghost".into() }
            .execute(&runtime)
            .unwrap_err();
        assert!(matches!(err.arbor(), Some(Error::UnknownEntity(_))));
    }

    #[test]
    fn test_redacted_hides_secret() {
        let mut entity = Entity::new("carol");
        entity.secret = Some("$argon2id$...".into());
        assert_eq!(redacted(entity).secret.as_deref(), Some("<redacted>"));
        assert_eq!(redacted(Entity::new("dave")).secret, None);
    }

    #[test]
    fn test_join() {
        assert_eq!(join(Vec::<String>::new()), "-");
        assert_eq!(join(["a", "b"]), "a, b");
    }
}

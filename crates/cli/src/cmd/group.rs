//! Group commands

use arbor_core::{Capability, Group};
use clap::Subcommand;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cmd::entity::join;
use crate::command::Command;
use crate::common::Runtime;
use crate::error::Result;

/// Commands acting on groups
#[derive(Debug, Subcommand)]
pub enum GroupCommands {
    /// Create a group
    New {
        /// Group name
        name: String,

        /// Human readable name (defaults to the group name)
        #[arg(short, long)]
        display_name: Option<String>,

        /// Managing group; pass the group's own name for a self-managed group
        #[arg(short, long)]
        managed_by: Option<String>,

        /// Group number (allocated when omitted)
        #[arg(short, long)]
        number: Option<i32>,
    },

    /// Delete a group
    Delete {
        /// Group name
        name: String,
    },

    /// Show one group and its members
    Show {
        /// Group name
        name: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List all groups
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the direct members of a group
    Members {
        /// Group name
        name: String,
    },

    /// Set the managing group
    SetManager {
        /// Group name
        name: String,

        /// Managing group; omit to clear
        manager: Option<String>,
    },

    /// Change the display name
    SetDisplayName {
        /// Group name
        name: String,

        /// New display name
        display_name: String,
    },

    /// Grant a capability
    AddCapability {
        /// Group name
        name: String,

        /// Capability (e.g. `MODIFY_GROUP_MEMBERS`)
        capability: Capability,
    },

    /// Revoke a capability
    DropCapability {
        /// Group name
        name: String,

        /// Capability (e.g. `MODIFY_GROUP_MEMBERS`)
        capability: Capability,
    },
}

#[derive(Debug, Serialize)]
struct GroupView {
    #[serde(flatten)]
    group: Group,
    members: Vec<String>,
}

impl Command for GroupCommands {
    type Output = ();

    fn execute(&self, runtime: &Runtime) -> Result<()> {
        let tree = &runtime.tree;
        match self {
            Self::New {
                name,
                display_name,
                managed_by,
                number,
            } => {
                let group = tree.new_group(
                    name,
                    display_name.as_deref().unwrap_or(name),
                    managed_by.as_deref(),
                    number.unwrap_or(-1),
                )?;
                println!(
                    "{} group {} (number {})",
                    "Created".green(),
                    group.name.bold(),
                    group.number
                );
            }
            Self::Delete { name } => {
                tree.delete_group(name)?;
                println!("{} group {}", "Deleted".green(), name.bold());
            }
            Self::Show { name, json } => {
                let view = GroupView {
                    group: tree.fetch_group(name)?,
                    members: tree.group_members(name)?,
                };
                if *json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    print_group(&view);
                }
            }
            Self::List { json } => {
                let groups = tree.list_groups()?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&groups)?);
                } else if groups.is_empty() {
                    println!("{}", "No groups".dimmed());
                } else {
                    for group in &groups {
                        println!(
                            "{:>6}  {:<24} {}",
                            group.number,
                            group.name.bold(),
                            group.display_name.dimmed()
                        );
                    }
                }
            }
            Self::Members { name } => {
                for member in tree.group_members(name)? {
                    println!("{member}");
                }
            }
            Self::SetManager { name, manager } => {
                let group = tree.set_managing_group(name, manager.as_deref())?;
                match group.managed_by {
                    Some(manager) => println!(
                        "{} {} is managed by {}",
                        "Updated".green(),
                        name.bold(),
                        manager.bold()
                    ),
                    None => println!("{} manager of {}", "Cleared".yellow(), name.bold()),
                }
            }
            Self::SetDisplayName { name, display_name } => {
                tree.update_group_meta(name, display_name)?;
                println!("{} display name of {}", "Updated".green(), name.bold());
            }
            Self::AddCapability { name, capability } => {
                tree.add_group_capability(name, *capability)?;
                println!("{} {capability} to group {}", "Granted".green(), name.bold());
            }
            Self::DropCapability { name, capability } => {
                tree.drop_group_capability(name, *capability)?;
                println!(
                    "{} {capability} from group {}",
                    "Revoked".yellow(),
                    name.bold()
                );
            }
        }
        Ok(())
    }
}

fn print_group(view: &GroupView) {
    let group = &view.group;
    println!("{}", group.name.bold());
    println!("  {:<14} {}", "Number".dimmed(), group.number);
    println!("  {:<14} {}", "Display name".dimmed(), group.display_name);
    println!(
        "  {:<14} {}",
        "Managed by".dimmed(),
        group.managed_by.as_deref().unwrap_or("-")
    );
    println!(
        "  {:<14} {}",
        "Capabilities".dimmed(),
        join(group.capabilities.iter().copied().map(Capability::as_str))
    );
    println!("  {:<14} {}", "Members".dimmed(), join(&view.members));
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::cmd::tests::runtime;
    use arbor_core::Error;

    #[test]
    fn test_new_defaults_display_name() {
        let runtime = runtime();
        GroupCommands::New {
            name: "ops".into(),
            display_name: None,
            managed_by: Some("ops".into()),
            number: None,
        }
        .execute(&runtime)
        .unwrap();

        let ops = runtime.tree.fetch_group("ops").unwrap();
        assert_eq!(ops.display_name, "ops");
        assert_eq!(ops.managed_by.as_deref(), Some("ops"));
        assert_eq!(ops.number, 1);
    }

    #[test]
    fn test_set_manager_and_clear() {
        let runtime = runtime();
        runtime.tree.new_group("admins", "Admins", None, -1).unwrap();
        runtime.tree.new_group("ops", "Ops", None, -1).unwrap();

        GroupCommands::SetManager {
            name: "ops".into(),
            manager: Some("admins".into()),
        }
        .execute(&runtime)
        .unwrap();
        assert_eq!(
            runtime.tree.fetch_group("ops").unwrap().managed_by.as_deref(),
            Some("admins")
        );

        GroupCommands::SetManager {
            name: "ops".into(),
            manager: None,
        }
        .execute(&runtime)
        .unwrap();
        assert_eq!(runtime.tree.fetch_group("ops").unwrap().managed_by, None);
    }

    #[test]
    fn test_set_unknown_manager() {
        let runtime = runtime();
        runtime.tree.new_group("ops", "Ops", None, -1).unwrap();

        let err = GroupCommands::SetManager {
            name: "ops".into(),
            manager: Some("ghosts".into()),
        }
        .execute(&runtime)
        .unwrap_err();
        assert!(matches!(err.arbor(), Some(Error::UnknownGroup(_))));
    }

    #[test]
    fn test_group_view_flattens() {
        let view = GroupView {
            group: Group::new("ops"),
            members: vec!["alice".into()],
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["name"], "ops");
        assert_eq!(value["members"][0], "alice");
    }
}

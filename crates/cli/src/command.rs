//! Command trait for the arbor CLI
//!
//! Every subcommand that needs a running tree implements [`Command`] and
//! receives the started [`Runtime`].
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::command::Command;
//! use crate::common::Runtime;
//! use crate::error::Result;
//! use clap::Args;
//!
//! #[derive(Debug, Args)]
//! pub struct LockCommand {
//!     pub id: String,
//! }
//!
//! impl Command for LockCommand {
//!     type Output = ();
//!
//!     fn execute(&self, runtime: &Runtime) -> Result<()> {
//!         runtime.tree.lock_entity(&self.id)?;
//!         Ok(())
//!     }
//! }
//! ```

use crate::common::Runtime;
use crate::error::Result;

/// Trait for all arbor commands
pub trait Command {
    /// The type returned by this command
    ///
    /// Most commands return `()`; tests use richer outputs.
    type Output;

    /// Execute the command against a started runtime
    fn execute(&self, runtime: &Runtime) -> Result<Self::Output>;
}

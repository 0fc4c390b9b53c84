//! # Arbor Tree
//!
//! The tree of entities and groups, and the hook chains every mutation of
//! it runs through.
//!
//! ## Execution Model
//!
//! - A chain is an ordered list of hooks bound to one lifecycle event
//!   (`CREATE`, `LOCK`, `SET-MANAGING-GROUP`, ...)
//! - Chains are assembled once at startup from [`ChainDirective`]s and are
//!   immutable afterwards
//! - Each run threads one working copy and one delta through the hooks in
//!   order; the first error aborts the run and nothing is persisted
//! - At most one mutation is in flight per record key
//!
//! ## Module Organization
//!
//! - `hook`: hook contract and the name → constructor registry
//! - `chain`: chain assembly and execution
//! - `defaults`: chain names and the built-in chain layouts
//! - `hooks`: built-in hooks
//! - `locks`: per-key mutation locks
//! - `tree`: the lifecycle entry points

pub mod chain;
pub mod context;
pub mod defaults;
pub mod hook;
pub mod hooks;
pub mod locks;
pub mod tree;

pub use arbor_config::{ChainDirective, InsertPosition};
pub use chain::{CancelToken, ChainBuilder, Chains};
pub use context::RefContext;
pub use hook::{Hook, HookConstructor, HookFn, HookRegistry, Record};
pub use locks::{KeyGuard, KeyLocks, LockKey};
pub use tree::{BootstrapRequest, Tree, TreeBuilder};

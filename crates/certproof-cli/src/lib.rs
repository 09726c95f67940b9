//! # certproof-cli — Command-Line Front End
//!
//! ## Subcommands
//!
//! - `demo`: issue, store, present, verify, revoke, and re-verify one
//!   credential, printing each step
//! - `snapshot verify`: reload persisted accumulator state and prove
//!   every recorded credential against the restored root
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; behavior lives in the library crates.
//! - `anyhow` is used only in this crate.

pub mod demo;
pub mod snapshot;

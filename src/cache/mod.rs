//! # Compiled-Artifact Cache
//!
//! Compiling a stylesheet, query or pipeline is expensive, so every component compiles its
//! source at most once and shares the result across all requests.
//!
//! ## Overview
//!
//! Each component owns a [`CompileCell`], registered in the application's
//! [`ArtifactCache`] under the component's identity. A cell moves through four states:
//!
//! ```text
//! Uninitialized --first caller--> InProgress --ok--> Ready(unit)
//!                                            \-err-> Failed(error)
//! ```
//!
//! ## Single flight
//!
//! - Exactly one caller performs the compilation; concurrent callers block on a condition
//!   variable until it completes, then observe the same outcome.
//! - The cell lock is not held while compiling, so other cells are never blocked.
//! - A failure is permanent: the cell reports the same error on every later access until
//!   the application is redeployed.
//! - If the compiling caller panics, the cell is marked failed and waiters are released.
//!
//! ## Observability
//!
//! Compilations are logged with their duration, and a warning is emitted when one exceeds
//! the configured slow-compile threshold.

mod core;
#[cfg(test)]
mod tests;

pub use core::{ArtifactCache, CacheStats, CellState, CompileCell, CompiledUnit};

//! # CLI Module
//!
//! Command-line tools for checking descriptors and repositories.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Load every webapp of a repository directory and report servlet and filter counts. With
//! `--watch`, keep running and reload on change:
//!
//! ```bash
//! servlex check --repository ./repo --watch
//! ```
//!
//! ### `routes`
//!
//! Print the routing table of a descriptor:
//!
//! ```bash
//! servlex routes --descriptor hello/servlex.yaml --context-root hello
//! ```
//!
//! ### `resolve`
//!
//! Show which servlet, bindings and filters a path resolves to, or which resource it serves:
//!
//! ```bash
//! servlex resolve --descriptor hello/servlex.yaml --path /greet/bob
//! ```
//!
//! ### `webapps`
//!
//! List the deployed context roots.
//!
//! The repository defaults to the `repository` entry of the configuration file
//! (`--config` or `SERVLEX_CONFIG`) and to `SERVLEX_REPOSITORY`. Logging is set up from the
//! `log` section of that same configuration, once it is loaded.

mod commands;


pub use commands::{load_config, run, run_cli, Cli, Commands};

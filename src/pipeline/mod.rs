//! # Pipeline Module
//!
//! Executes the component chain selected for a request.
//!
//! ## Execution order
//!
//! For a servlet wrapped by filters `F1..Fn` (declaration order):
//!
//! ```text
//! F1.inbound → … → Fn.inbound → servlet chain → Fn.outbound → … → F1.outbound
//! ```
//!
//! Each component consumes the connector produced by the previous one. The first error
//! (component error, technical exception or HTTP-level error) aborts the rest of the chain
//! and is propagated unchanged. Deciding whether a component error is handled by an error
//! route is left to the caller.
//!
//! ## Cleanup guarantee
//!
//! Every component that was entered is cleaned up, most recent first, whether the chain
//! succeeded, failed, or panicked:
//!
//! - a cleanup error never replaces the error that aborted the chain, it is only logged;
//! - on an otherwise successful chain, the first cleanup error becomes the request error;
//! - a panic inside a component is caught, cleanup still runs, and the panic surfaces as a
//!   [`TechnicalException`](crate::error::TechnicalException).

mod core;

pub use core::{InvocationPlan, PipelineExecutor, Step, StepRole};

//! # Contracts
//!
//! Frozen interface contracts shared by every publisher crate: pool sizing,
//! publish requests, the broker client seam, diagnostics records and the
//! publisher blueprint. Business crates depend on this crate only; reverse
//! dependencies are prohibited.
//!
//! ## Delivery model
//! - Publishing is fire-and-forget and at-most-once
//! - Rejections and delivery failures surface only as [`Diagnostic`] records

mod blueprint;
mod broker;
mod diagnostics;
mod error;
mod pool_config;
mod request;

pub use blueprint::*;
pub use broker::*;
pub use diagnostics::*;
pub use error::*;
pub use pool_config::*;
pub use request::*;

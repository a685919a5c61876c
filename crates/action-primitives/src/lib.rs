//! Action primitives - browser driver port, adaptive waits and action dispatch
//!
//! This crate provides the pieces the step executor invokes for one step:
//! - `BrowserDriver`: the capability set a browser backend must offer
//! - `AdaptiveWaiter`: readiness polling with a learned ceiling
//! - `DispatchTable`: action kind to handler routing with a no-op fallback
//! - the built-in handler catalogue

pub mod dispatch;
pub mod driver;
pub mod errors;
mod primitives;
#[cfg(test)]
mod testing;
pub mod types;
mod waiting;

pub use dispatch::*;
pub use driver::*;
pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;

//! Contest/membership state and its persistence.
//!
//! # Module Structure
//!
//! - [`types`] - Document types and the pure mutation rules
//! - [`store`] - Lock-guarded owner that persists after every mutation

mod store;
mod types;

pub use store::StateStore;
pub use types::{AliasMatch, Contest, ContestSeed, Linked, State, Upserted, User};

//! Data models
//!
//! Shared between the ordering core, its HTTP surface and the collaborators
//! that consume orders (receipts, reporting).

pub mod cart;
pub mod catalog;
pub mod identity;
pub mod order;

// Re-exports
pub use cart::*;
pub use catalog::*;
pub use identity::*;
pub use order::*;

//! Shared types for the brew ordering core
//!
//! Error codes, the unified `AppError`/`ApiResponse` envelope, and the cart and
//! order models used by the server and its collaborators.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, ErrorCode};
pub use models::{
    CartEntry, CartSnapshot, CustomerIdentity, Customizations, Order, OrderLine, OrderStatus,
    Product, Role, Size,
};

//! Core types for Pola.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pagination;
pub mod session;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use pagination::{Page, PageRequest, PaginationError};
pub use session::{SessionId, SessionIdError};
pub use status::*;

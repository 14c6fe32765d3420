//! Storage for refresh token records.
//!
//! The session manager depends only on the [`RefreshTokenStorage`] trait.
//!
//! # Implementations
//!
//! - [`MemoryRefreshTokenStorage`] - in-process backend in this crate
//! - `authgate-auth-postgres` - PostgreSQL storage backend

pub mod memory;
pub mod refresh_token;

pub use memory::MemoryRefreshTokenStorage;
pub use refresh_token::RefreshTokenStorage;

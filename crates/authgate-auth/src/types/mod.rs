//! Domain types shared by the session lifecycle and its storage backends.
//!
//! - [`RefreshTokenRecord`] - persisted state of one refresh token
//! - [`TokenPair`] - credentials returned to the client

pub mod refresh_token;
pub mod token_pair;

pub use refresh_token::{REFRESH_SECRET_LEN, RefreshTokenRecord};
pub use token_pair::TokenPair;

//! Access token encoding and verification.
//!
//! Access tokens are short-lived HS256 JWTs verified without any storage
//! lookup. Refresh tokens are opaque secrets and live in
//! [`crate::types::refresh_token`].

pub mod codec;

pub use codec::{AccessTokenClaims, AccessTokenCodec, CodecError};

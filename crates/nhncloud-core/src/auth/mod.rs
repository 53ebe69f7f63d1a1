//! Authentication module.
//!
//! Obtains OAuth2 bearer tokens with the client-credentials grant and
//! caches them on disk between invocations.

mod token;

pub use token::{Token, TokenManager, DEFAULT_TOKEN_URL, EXPIRY_MARGIN_SECS};

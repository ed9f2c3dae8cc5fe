//! # cardkit auth
//!
//! Short-lived bearer tokens for the card directory.
//!
//! - [`Jwt`] - the token and its string form
//! - [`JwtGenerator`] / [`JwtVerifier`] - issue and check tokens under an api key
//! - [`TokenProvider`] - where the manager gets a token before each call

pub mod error;
pub mod jwt;
pub mod provider;
pub mod signer;

pub use error::{AuthError, Result};
pub use jwt::{now_secs, Jwt, JwtBody, JwtHeader, JWT_CONTENT_TYPE, JWT_TYPE};
pub use provider::{
    CachingTokenProvider, CallbackTokenProvider, ConstTokenProvider, GeneratorTokenProvider,
    TokenContext, TokenProvider,
};
pub use signer::{AccessTokenSigner, Ed25519TokenSigner, JwtGenerator, JwtVerifier};

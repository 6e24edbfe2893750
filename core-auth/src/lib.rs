//! # Token Lifecycle Module
//!
//! Bearer-token lifecycle management for the HTTP client SDK.
//!
//! ## Overview
//!
//! This crate keeps an authentication token valid without the caller's
//! involvement: it extracts bearer tokens from response envelopes, persists
//! them through the platform secure store, decodes JWT expiry claims, and
//! proactively checks for upcoming expiry on a timer independent of request
//! traffic.
//!
//! ## Features
//!
//! - Token extraction from response envelopes with no-op change detection
//! - Secure persistence via the [`SecureStore`](bridge_traits::storage::SecureStore) bridge
//! - JWT payload decoding without signature verification
//! - Proactive expiry checking with configured/cleared/expired handlers
//! - Database encryption-key management over the same secure store

pub mod error;
pub mod jwt;
pub mod keys;
pub mod token_manager;

pub use error::{AuthError, JwtError, Result};
pub use jwt::JwtPayload;
pub use keys::DatabaseKeyStore;
pub use token_manager::TokenManager;

//! # Arbor Crypto
//!
//! Backends for the secret hashing and token contracts.
//!
//! - `nocrypto`: stores secrets as given, compares in constant time
//! - `argon2`: PHC-encoded argon2id hashes with random salts
//! - `jwt`: HS256 bearer tokens
//!
//! Backends are selected by name through [`HasherRegistry`] and
//! [`TokenRegistry`].

pub mod argon;
pub mod jwt;
pub mod nocrypto;

pub use argon::Argon2Crypto;
pub use jwt::JwtTokenService;
pub use nocrypto::NoCrypto;

use arbor_config::Config;
use arbor_core::{Registry, Result, SecretHasher, TokenService};
use std::sync::Arc;

/// Constructs a secret hasher from configuration
pub type HasherFactory = fn(&Config) -> Result<Arc<dyn SecretHasher>>;

/// Constructs a token service from configuration
pub type TokenFactory = fn(&Config) -> Result<Arc<dyn TokenService>>;

/// Registry of secret hashers
pub type HasherRegistry = Registry<HasherFactory>;

/// Registry of token services
pub type TokenRegistry = Registry<TokenFactory>;

/// Registry holding `nocrypto` and `argon2`
pub fn default_hashers() -> HasherRegistry {
    let mut registry = Registry::new("crypto");
    for (name, factory) in [
        (nocrypto::NAME, new_nocrypto as HasherFactory),
        (argon::NAME, new_argon2 as HasherFactory),
    ] {
        let _ = registry.register(name, factory);
    }
    registry
}

/// Registry holding `jwt`
pub fn default_token_services() -> TokenRegistry {
    let mut registry = Registry::new("token");
    let _ = registry.register(jwt::NAME, new_jwt as TokenFactory);
    registry
}

fn new_nocrypto(_config: &Config) -> Result<Arc<dyn SecretHasher>> {
    tracing::warn!("Secrets are stored in plain text (nocrypto backend)");
    Ok(Arc::new(NoCrypto))
}

fn new_argon2(_config: &Config) -> Result<Arc<dyn SecretHasher>> {
    Ok(Arc::new(Argon2Crypto::new()))
}

fn new_jwt(config: &Config) -> Result<Arc<dyn TokenService>> {
    Ok(Arc::new(JwtTokenService::from_config(&config.token)?))
}

/// Build the secret hasher named in `config`
pub fn open_hasher(registry: &HasherRegistry, config: &Config) -> Result<Arc<dyn SecretHasher>> {
    let factory = registry.get(&config.crypto.backend)?;
    tracing::debug!(backend = %config.crypto.backend, "Using secret hasher");
    factory(config)
}

/// Build the token service named in `config`
pub fn open_token_service(
    registry: &TokenRegistry,
    config: &Config,
) -> Result<Arc<dyn TokenService>> {
    let factory = registry.get(&config.token.backend)?;
    factory(config)
}

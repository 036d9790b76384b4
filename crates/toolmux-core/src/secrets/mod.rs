//! Secret lookup for the reasoning-service API key
//!
//! - `SecretStore` trait for pluggable stores
//! - `EnvSecretStore`, `MemorySecretStore`, `KeychainSecretStore`
//! - `ChainSecretStore` tries stores in order; `default_chain()` is env then keychain

mod traits;
mod env_store;
mod memory_store;
mod chain_store;
mod keychain_store;

pub use traits::{SecretStore, SecretInfo, SecretStoreError, SecretStoreResult};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use chain_store::{ChainSecretStore, default_chain};
pub use keychain_store::KeychainSecretStore;

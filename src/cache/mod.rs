//! Cache module - Response caching over Moka.
//!
//! ## Architecture
//!
//! - `CacheKey` - Canonical key derived from an operation, its upstream
//!   path and its parameter set
//! - `ExpiringStore` - Shared key to response mapping with one TTL
//! - `StoreConfig` - TTL and housekeeping settings
//!
//! ## Usage
//!
//! ```rust
//! let store = ExpiringStore::new(StoreConfig::with_ttl(Duration::from_secs(300)));
//! let key = CacheKey::build(&request);
//!
//! store.set(key.clone(), value);
//! let cached = store.get(&key);
//! ```

mod config;
mod key;
mod store;

pub use config::StoreConfig;
pub use key::CacheKey;
pub use store::ExpiringStore;

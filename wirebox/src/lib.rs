//! # wirebox: provider-based dependency injection for Rust
//!
//! Declare how each part of an application is built (a fixed value,
//! loaded configuration, a factory, a shared singleton, a callable or a
//! delegated factory) and let the container wire them together on demand.
//!
//! ```rust
//! use std::sync::Arc;
//! use wirebox::prelude::*;
//!
//! struct PasswordHasher { salt_size: u32 }
//!
//! let container = Container::builder()
//!     .configuration("config", Configuration::from_value(serde_json::json!({ "salt_size": 16 })))
//!     .provide(
//!         "password_hasher",
//!         Provider::factory(|args: &Arguments| Ok(PasswordHasher { salt_size: args.config("salt_size")? }))
//!             .kwarg("salt_size", Argument::provider("config.salt_size")),
//!     )
//!     .build()?;
//!
//! let hasher: Arc<PasswordHasher> = container.resolve("password_hasher")?;
//! assert_eq!(hasher.salt_size, 16);
//! # Ok::<(), wirebox::WireboxError>(())
//! ```

pub use wirebox_container::*;
pub use wirebox_support;

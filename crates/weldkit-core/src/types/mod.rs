//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for `Arc<Mutex<T>>` and `Arc<RwLock<T>>`

pub mod aliases;

pub use aliases::*;

//! Items used by derive output. Not part of the public API.

#[cfg(feature = "auto_register")]
pub use inventory;

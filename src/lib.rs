#![warn(missing_docs)]
//! Salted digest contexts over CRC32, CRC64, SHA-256 and truncated SHA-256.
//!
//! A [`HashContext`] is built once from an [`Algorithm`] selector and a [`SaltKind`].
//! Construction resolves both: `Default` becomes truncated SHA-256 and the salt
//! descriptor becomes concrete bytes (a `Random` salt is drawn from the OS exactly
//! once). Every digest is the lowercase hex of the algorithm run over `salt ++ input`.
//!
//! Contexts can be cloned to hand independent copies to other workers and are
//! disposed explicitly; disposed contexts reject further use.
//!
//! # Example
//! ```
//! use khash::{Algorithm, HashContext, SaltKind};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!   let ctx = HashContext::new(Algorithm::Default, SaltKind::Specific(b"pepper".to_vec()))?;
//!   let len = ctx.length(b"hello")?;
//!   let digest = ctx.do_hash(b"hello")?;
//!   assert_eq!(digest.len(), len);
//!   println!("Result: {}", digest);
//!
//!   Ok(())
//! }
//! ```
//!
//! The [`binding`] module exposes the same operations as status-code functions
//! over opaque handles, for callers that cannot hold Rust values.

/// `algorithm` is the registry of supported digest algorithms.
pub mod algorithm;
/// `binding` is the handle-based, status-code interface.
pub mod binding;
/// `codec` turns raw digest bytes into text.
pub mod codec;
/// `context` holds the salted hashing context.
pub mod context;
/// `error` lists every failure and its status code.
pub mod error;
/// `handle_table` stores contexts behind generation-checked handles.
pub mod handle_table;
/// `salt` describes and resolves salts.
pub mod salt;

pub use algorithm::Algorithm;
pub use context::HashContext;
pub use error::{Error, Result};
pub use handle_table::{ContextHandle, HandleTable};
pub use salt::{Salt, SaltKind};

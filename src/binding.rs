//! Status-code entry points over a [`HandleTable`].
//!
//! Each operation returns [`status::SUCCESS`] or the status of the error that
//! stopped it, and writes its output slot only on success. Panics are caught
//! and reported as [`status::PANIC`].
use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::Lazy;

use crate::algorithm::Algorithm;
use crate::codec;
use crate::context::HashContext;
use crate::error::{status, Error, InvalidSalt, Result};
use crate::handle_table::{ContextHandle, HandleTable};
use crate::salt::SaltKind;

/// Process-wide table used by the free functions of this module.
static CONTEXTS: Lazy<HandleTable> = Lazy::new(HandleTable::default);

/// Runs `f`, converting its outcome or a panic into a status code.
fn boundary(f: impl FnOnce() -> Result<()>) -> i32 {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => status::SUCCESS,
        Ok(Err(err)) => err.status(),
        Err(_) => status::PANIC,
    }
}

impl HandleTable {
    /// Creates a context and stores its handle in `out`.
    ///
    /// Only the first `salt_len` bytes of `salt_material` are used, and only for the
    /// `Specific` salt kind.
    pub fn new_context(
        &self,
        algorithm: u8,
        salt_kind: u8,
        salt_material: Option<&[u8]>,
        salt_len: usize,
        out: &mut ContextHandle,
    ) -> i32 {
        boundary(|| {
            let algorithm = Algorithm::try_from(algorithm)?;
            let material = match salt_material {
                Some(m) if SaltKind::is_specific(salt_kind) => {
                    Some(m.get(..salt_len).ok_or(InvalidSalt::LengthMismatch {
                        declared: salt_len,
                        available: m.len(),
                    })?)
                }
                _ => None,
            };
            let context = HashContext::new(algorithm, SaltKind::from_raw(salt_kind, material)?)?;
            *out = self.insert(context)?;
            Ok(())
        })
    }

    /// Disposes the context behind `handle` and invalidates the handle.
    pub fn free_context(&self, handle: ContextHandle) -> i32 {
        boundary(|| self.remove(handle))
    }

    /// Stores a handle to an independent copy of `src` in `dst`.
    pub fn clone_context(&self, src: ContextHandle, dst: &mut ContextHandle) -> i32 {
        boundary(|| {
            let clone = self.snapshot(src)?;
            *dst = self.insert(clone)?;
            Ok(())
        })
    }

    /// Stores the digest text length for `input` in `out_len`.
    pub fn length(&self, handle: ContextHandle, input: &[u8], out_len: &mut usize) -> i32 {
        boundary(|| {
            *out_len = self.with(handle, |ctx| ctx.length(input))?;
            Ok(())
        })
    }

    /// Writes the digest of `input` followed by a `0` byte into `out`.
    ///
    /// `out` must hold at least `length + 1` bytes. The digest is computed on a
    /// copy of the context, outside the table lock.
    pub fn do_hash(&self, handle: ContextHandle, input: &[u8], out: &mut [u8]) -> i32 {
        boundary(|| {
            let ctx = self.snapshot(handle)?;
            let required = ctx.length(input)? + 1;
            if out.len() < required {
                return Err(Error::BufferTooSmall {
                    required,
                    provided: out.len(),
                });
            }
            let text = ctx.do_hash(input)?;
            codec::write_terminated(&text, out).map(|_| ())
        })
    }
}

/// See [`HandleTable::new_context`].
pub fn new_context(
    algorithm: u8,
    salt_kind: u8,
    salt_material: Option<&[u8]>,
    salt_len: usize,
    out: &mut ContextHandle,
) -> i32 {
    CONTEXTS.new_context(algorithm, salt_kind, salt_material, salt_len, out)
}

/// See [`HandleTable::free_context`].
pub fn free_context(handle: ContextHandle) -> i32 {
    CONTEXTS.free_context(handle)
}

/// See [`HandleTable::clone_context`].
pub fn clone_context(src: ContextHandle, dst: &mut ContextHandle) -> i32 {
    CONTEXTS.clone_context(src, dst)
}

/// See [`HandleTable::length`].
pub fn length(handle: ContextHandle, input: &[u8], out_len: &mut usize) -> i32 {
    CONTEXTS.length(handle, input, out_len)
}

/// See [`HandleTable::do_hash`].
pub fn do_hash(handle: ContextHandle, input: &[u8], out: &mut [u8]) -> i32 {
    CONTEXTS.do_hash(handle, input, out)
}

/// Text length of any digest produced under `algorithm`, without a context.
pub fn max_length(algorithm: u8, out_len: &mut usize) -> i32 {
    boundary(|| {
        *out_len = codec::digest_len(Algorithm::try_from(algorithm)?);
        Ok(())
    })
}

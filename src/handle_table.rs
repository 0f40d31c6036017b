use std::cmp::Ordering;

use log::warn;
use parking_lot::RwLock;

use crate::context::HashContext;
use crate::error::{Error, Result};

/// Opaque reference to a context stored in a [`HandleTable`].
///
/// The low 32 bits index a slot, the high 32 bits carry the slot generation the
/// handle was issued for. Generations start at 1, so [`ContextHandle::NULL`] is
/// never issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ContextHandle(u64);

impl ContextHandle {
    /// The handle that never refers to a context.
    pub const NULL: ContextHandle = ContextHandle(0);

    fn new(index: u32, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | u64::from(index))
    }

    fn index(self) -> usize {
        (self.0 & u64::from(u32::MAX)) as usize
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Whether this is [`ContextHandle::NULL`].
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Rebuilds a handle from the value returned by [`ContextHandle::into_raw`].
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The handle as a plain integer.
    pub fn into_raw(self) -> u64 {
        self.0
    }
}

struct Slot {
    generation: u32,
    context: Option<HashContext>,
}

/// Handle table
///
/// Owns every context created through the binding surface. Freed slots are
/// recycled under a new generation, so a handle that outlived its context is
/// recognised as stale instead of reaching whatever now occupies the slot.
#[derive(Default)]
pub struct HandleTable {
    table: RwLock<HandleTableInner>,
}

impl HandleTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// insert takes ownership of `context` and returns its handle.
    pub fn insert(&self, context: HashContext) -> Result<ContextHandle> {
        let mut table = self.table.write();
        table.insert(context)
    }

    /// with runs `f` on the live context behind `handle` under the read lock.
    pub fn with<T>(
        &self,
        handle: ContextHandle,
        f: impl FnOnce(&HashContext) -> Result<T>,
    ) -> Result<T> {
        let table = self.table.read();
        f(table.get(handle)?)
    }

    /// snapshot returns an independent copy of the live context behind `handle`.
    ///
    /// Only the copy is taken under the read lock, so long digests over the copy
    /// do not hold up inserts and removals.
    pub fn snapshot(&self, handle: ContextHandle) -> Result<HashContext> {
        self.with(handle, HashContext::try_clone)
    }

    /// remove disposes the context behind `handle` and retires the handle.
    pub fn remove(&self, handle: ContextHandle) -> Result<()> {
        let mut table = self.table.write();
        let mut context = table.remove(handle)?;
        context.dispose()
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.table.read().live
    }

    /// Whether no context is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct HandleTableInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl HandleTableInner {
    fn insert(&mut self, context: HashContext) -> Result<ContextHandle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| Error::InvalidHandle)?;
                self.slots.push(Slot {
                    generation: 1,
                    context: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.context = Some(context);
        self.live += 1;
        Ok(ContextHandle::new(index, slot.generation))
    }

    fn slot(&self, handle: ContextHandle) -> Result<&Slot> {
        // generation 0 is never issued, which also covers the null handle
        if handle.generation() == 0 {
            return Err(Error::InvalidHandle);
        }
        self.slots.get(handle.index()).ok_or(Error::InvalidHandle)
    }

    /// stale reports whether `handle` was issued for `slot` and has since been freed.
    fn stale(handle: ContextHandle, slot: &Slot) -> Result<bool> {
        match handle.generation().cmp(&slot.generation) {
            Ordering::Less => Ok(true),
            Ordering::Equal => Ok(slot.context.is_none()),
            Ordering::Greater => Err(Error::InvalidHandle),
        }
    }

    fn get(&self, handle: ContextHandle) -> Result<&HashContext> {
        let slot = self.slot(handle)?;
        if Self::stale(handle, slot)? {
            warn!("context handle {:#x} used after free", handle.0);
            return Err(Error::UseAfterFree);
        }
        slot.context.as_ref().ok_or(Error::UseAfterFree)
    }

    fn remove(&mut self, handle: ContextHandle) -> Result<HashContext> {
        let slot = self.slot(handle)?;
        if Self::stale(handle, slot)? {
            warn!("context handle {:#x} freed twice", handle.0);
            return Err(Error::DoubleFree);
        }

        let index = handle.index();
        let slot = &mut self.slots[index];
        let context = slot.context.take().ok_or(Error::DoubleFree)?;
        // A slot at the last generation is retired instead of wrapping to a reused one.
        if slot.generation < u32::MAX {
            slot.generation += 1;
            self.free.push(index as u32);
        }
        self.live -= 1;
        Ok(context)
    }
}

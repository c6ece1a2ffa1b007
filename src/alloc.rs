//! Host allocator capability.
//!
//! Allocation requests made while parsing JSON or building a manifest are
//! routed through a caller-supplied [`HostAllocator`] before the backing
//! buffer grows. The allocator decides whether the request is granted; a
//! refusal surfaces as [`ErrorCode::OutOfHostMemory`] and is propagated
//! immediately. Memory itself is owned by ordinary Rust containers, so a
//! failed parse releases everything it had built when the partial values
//! drop.
//!
//! Growable buffers follow a doubling-from-one capacity policy; see
//! [`push_growing`].

use std::cell::Cell;

use indexmap::IndexMap;

use crate::error::{ErrorCode, SkResult};

/// Allocator capability threaded through every allocating call.
pub trait HostAllocator {
    /// Request `bytes` bytes of storage.
    ///
    /// Returning an error refuses the allocation.
    fn allocate(&self, bytes: usize) -> SkResult<()>;

    /// Notify that a previously granted buffer of `bytes` bytes was
    /// replaced by a larger one.
    fn release(&self, _bytes: usize) {}
}

/// Allocator used when the caller supplies none. Grants every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAllocator;

impl HostAllocator for DefaultAllocator {
    fn allocate(&self, _bytes: usize) -> SkResult<()> {
        Ok(())
    }
}

/// Counting allocator with optional failure injection.
///
/// Counts every request it sees. When built with [`DebugAllocator::failing_at`]
/// the n-th request (zero-based) and every later one is refused.
#[derive(Debug, Default)]
pub struct DebugAllocator {
    requests: Cell<usize>,
    requested_bytes: Cell<usize>,
    outstanding_bytes: Cell<usize>,
    fail_at: Option<usize>,
}

impl DebugAllocator {
    /// Allocator that counts but never refuses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that refuses request number `index` and all later ones.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// Number of allocation requests seen so far, refused ones included.
    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    /// Total bytes of granted requests.
    pub fn requested_bytes(&self) -> usize {
        self.requested_bytes.get()
    }

    /// Bytes granted and not yet released by a later growth step.
    pub fn outstanding_bytes(&self) -> usize {
        self.outstanding_bytes.get()
    }
}

impl HostAllocator for DebugAllocator {
    fn allocate(&self, bytes: usize) -> SkResult<()> {
        let index = self.requests.get();
        self.requests.set(index + 1);
        if matches!(self.fail_at, Some(n) if index >= n) {
            return Err(ErrorCode::OutOfHostMemory);
        }
        self.requested_bytes
            .set(self.requested_bytes.get().saturating_add(bytes));
        self.outstanding_bytes
            .set(self.outstanding_bytes.get().saturating_add(bytes));
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.outstanding_bytes
            .set(self.outstanding_bytes.get().saturating_sub(bytes));
    }
}

/// Capacity the next growth step should reach.
fn next_capacity(capacity: usize) -> usize {
    if capacity == 0 {
        1
    } else {
        capacity.saturating_mul(2)
    }
}

/// Make room for one more element in `vec`, doubling its capacity from one.
pub fn reserve_one<T>(vec: &mut Vec<T>, alloc: &dyn HostAllocator) -> SkResult<()> {
    if vec.len() < vec.capacity() {
        return Ok(());
    }
    let old = vec.capacity();
    let new = next_capacity(old);
    alloc.allocate(new.saturating_mul(std::mem::size_of::<T>()))?;
    vec.try_reserve_exact(new - vec.len())
        .map_err(|_| ErrorCode::OutOfHostMemory)?;
    if old > 0 {
        alloc.release(old.saturating_mul(std::mem::size_of::<T>()));
    }
    Ok(())
}

/// Append `item` to `vec` through the allocator capability.
pub fn push_growing<T>(vec: &mut Vec<T>, item: T, alloc: &dyn HostAllocator) -> SkResult<()> {
    reserve_one(vec, alloc)?;
    vec.push(item);
    Ok(())
}

/// Make room for one more entry in `map`, doubling its capacity from one.
pub fn reserve_entry<K, V>(map: &mut IndexMap<K, V>, alloc: &dyn HostAllocator) -> SkResult<()>
where
    K: std::hash::Hash + Eq,
{
    if map.len() < map.capacity() {
        return Ok(());
    }
    let old = map.capacity();
    let new = next_capacity(old);
    alloc.allocate(new.saturating_mul(std::mem::size_of::<(K, V)>()))?;
    map.try_reserve_exact(new - map.len())
        .map_err(|_| ErrorCode::OutOfHostMemory)?;
    if old > 0 {
        alloc.release(old.saturating_mul(std::mem::size_of::<(K, V)>()));
    }
    Ok(())
}

/// Copy `value` into a freshly allocated string.
pub fn copy_str(value: &str, alloc: &dyn HostAllocator) -> SkResult<String> {
    alloc.allocate(value.len())?;
    let mut out = String::new();
    out.try_reserve_exact(value.len())
        .map_err(|_| ErrorCode::OutOfHostMemory)?;
    out.push_str(value);
    Ok(out)
}

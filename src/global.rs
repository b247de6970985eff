//! A process-wide [`Heap`] singleton, for callers who want `malloc`-family
//! semantics without carrying a `Heap` value around.
//!
//! Deliberately **not** thread-safe. Correct use from more than one thread
//! requires an outer mutex held across every call into this module, the
//! same as calling `Heap`'s methods concurrently would. Calling these
//! functions from more than one thread without that external mutex is
//! undefined behavior.

use std::cell::UnsafeCell;

use crate::heap::Heap;

struct Singleton(UnsafeCell<Heap>);

// Safety: `Sync` here is a lie in the general case — it only holds because
// every public function below requires the caller to serialize access
// externally, exactly as `Heap` itself does. No constructor runs before
// first use: `Heap::new()` is a const fn, and the region cursor initializes
// itself lazily on the first `grow`.
unsafe impl Sync for Singleton {}

static HEAP: Singleton = Singleton(UnsafeCell::new(Heap::new()));

fn heap() -> &'static mut Heap {
  unsafe { &mut *HEAP.0.get() }
}

/// See [`Heap::allocate`].
///
/// # Safety
/// Must not be called concurrently with any other function in this module
/// from another thread without external synchronization.
pub unsafe fn allocate(n: usize) -> *mut u8 {
  unsafe { heap().allocate(n) }
}

/// See [`Heap::zalloc`].
///
/// # Safety
/// Same as [`allocate`].
pub unsafe fn zalloc(num: usize, size: usize) -> *mut u8 {
  unsafe { heap().zalloc(num, size) }
}

/// See [`Heap::reallocate`].
///
/// # Safety
/// Same as [`allocate`].
pub unsafe fn reallocate(ptr: *mut u8, n: usize) -> *mut u8 {
  unsafe { heap().reallocate(ptr, n) }
}

/// See [`Heap::deallocate`].
///
/// # Safety
/// Same as [`allocate`].
pub unsafe fn free(ptr: *mut u8) {
  unsafe { heap().deallocate(ptr) }
}

#[cfg(test)]
mod tests {
  use super::*;

  // These share the one process-wide singleton, so they're collapsed into
  // a single #[test] to avoid cross-test interference under parallel
  // execution against the real process break.
  #[test]
  fn allocate_write_read_free_round_trip() {
    unsafe {
      let p = allocate(64) as *mut u64;
      assert!(!p.is_null());
      p.write(0xDEAD_BEEF_DEAD_BEEF);
      assert_eq!(p.read(), 0xDEAD_BEEF_DEAD_BEEF);
      free(p as *mut u8);

      let z = zalloc(8, 8) as *mut u64;
      assert!(!z.is_null());
      assert_eq!(z.read(), 0);
      free(z as *mut u8);

      let r = reallocate(std::ptr::null_mut(), 16);
      assert!(!r.is_null());
      free(r);
    }
  }
}

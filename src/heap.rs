//! # Heap — components D, E, F
//!
//! `Heap` is the process-wide allocator object: a [`Region`] cursor plus a
//! [`FreeList`], composed into the coalescing insert, split, and expand
//! policies, and the four public entry points.
//!
//! ## Memory layout
//!
//! ```text
//!   ┌──────────────── used prefix (blocks, in address order) ───────────┬──── unclaimed suffix ────┐
//!   │  [hdr|payload]  [hdr|payload]  [hdr|payload]  ...                 │                           │
//!   └─────────────────────────────────────────────────────────────────────┴───────────────────────────┘
//!                                                                       extra_start              extra_end
//! ```
//!
//! Each block is `[Header; 8 bytes][payload; size bytes]`. A free block's
//! header additionally carries a self-relative `next` offset (see
//! `header.rs`) linking it into the address-ordered free list.
//!
//! ## Allocation
//!
//! `allocate` runs a best-fit search over the free list first; only on a
//! miss does it carve a fresh block from the unclaimed suffix. Reused blocks
//! are **not** split at allocation time — any internal slack is discovered
//! later, by `reallocate` (which splits it back out) or `free` (which
//! coalesces it away). This keeps `allocate` itself a single, bounded-size-
//! search operation.
//!
//! ## Freeing
//!
//! `free`'s coalescing insert keeps the free list's central invariant (no
//! two free blocks are ever physically adjacent) by checking, on every
//! insertion, whether the freed block is the last block (return it straight
//! to the unclaimed suffix), would become the new head/tail, or lands in the
//! interior (merge with whichever of its two neighbors are physically
//! touching it).

use std::ptr;

use crate::free_list::FreeList;
use crate::header::{self, Header, HEADER_SIZE, MIN_BLOCK_SIZE};
use crate::region::Region;

pub struct Heap {
  region: Region,
  free: FreeList,
}

impl Heap {
  pub const fn new() -> Self {
    Self {
      region: Region::new(),
      free: FreeList::new(),
    }
  }

  // ---------------------------------------------------------------------
  // Component D: coalescing insert.
  // ---------------------------------------------------------------------

  /// Inserts a freed block into the free list, merging with whichever
  /// physical neighbors are themselves free, or returning the block
  /// straight to the unclaimed suffix if it is the last block.
  ///
  /// `hint`, when given, must be the true predecessor of `block`'s final
  /// address-ordered position (callers that already know it — none in this
  /// crate currently do — can skip the `locate_by_address` walk).
  fn insert_free(&mut self, block: *mut Header, hint: Option<*mut Header>) {
    // 1. Last-block case: give the block back to the OS-backed suffix.
    if unsafe { header::adjacent(block, self.region.extra_start()) } {
      self.region.shrink(block as *mut u8);

      // The cascade: if the new tail has itself become the last block
      // (this can only happen to `tail`, never an interior node), erase
      // it and shrink once more. Only `tail` can ever newly border
      // `extra_start` here, so one extra pass always suffices.
      if let Some(tail) = self.free.tail() {
        if unsafe { header::adjacent(tail, self.region.extra_start()) } {
          let (prev, _) = self.free.locate_by_address(tail);
          self.free.erase_after(prev);
          self.region.shrink(tail as *mut u8);

          debug_assert!(
            self.free.tail().map_or(true, |t| !unsafe {
              header::adjacent(t, self.region.extra_start())
            }),
            "last-block cascade should never need a second pass"
          );
        }
      }
      return;
    }

    // 2. Empty list.
    if self.free.is_empty() {
      self.free.set_head(Some(block));
      self.free.set_tail(Some(block));
      unsafe { header::set_next(block, None) };
      return;
    }

    let head = self.free.head().unwrap();
    let tail = self.free.tail().unwrap();

    // 3. New head.
    if (block as usize) < (head as usize) {
      if unsafe { header::adjacent(block, head as *mut u8) } {
        unsafe { self.free.merge_into(block, head) };
        if head == tail {
          self.free.set_tail(Some(block));
        }
      } else {
        unsafe { header::set_next(block, Some(head)) };
      }
      self.free.set_head(Some(block));
      return;
    }

    // 4. New tail.
    if (block as usize) > (tail as usize) {
      if unsafe { header::adjacent(tail, block as *mut u8) } {
        unsafe { self.free.merge_into(tail, block) };
      } else {
        unsafe { header::set_next(tail, Some(block)) };
        unsafe { header::set_next(block, None) };
        self.free.set_tail(Some(block));
      }
      return;
    }

    // 5. Interior: resolve predecessor and successor, then try both merges.
    let (predecessor, after) = match hint {
      Some(p) => (p, unsafe { header::next_of(p) }),
      None => {
        let (p, at_or_after) = self.free.locate_by_address(block);
        (p.expect("an interior block always has a predecessor"), at_or_after)
      }
    };

    if let Some(after) = after {
      if unsafe { header::adjacent(block, after) } {
        unsafe { self.free.merge_into(block, after) };
        if Some(after) == self.free.tail() {
          self.free.set_tail(Some(block));
        }
      } else {
        unsafe { header::set_next(block, Some(after)) };
      }
    }

    if unsafe { header::adjacent(predecessor, block as *mut u8) } {
      unsafe { self.free.merge_into(predecessor, block) };
      if Some(block) == self.free.tail() {
        self.free.set_tail(Some(predecessor));
      }
    } else {
      unsafe { header::set_next(predecessor, Some(block)) };
    }
  }

  // ---------------------------------------------------------------------
  // Component E: split / expand.
  // ---------------------------------------------------------------------

  /// Trims `block` to `new_size` bytes of payload, inserting whatever's left
  /// over as a new free block. A no-op if the remainder would be too small
  /// to be a valid block on its own.
  fn split(&mut self, block: *mut Header, new_size: u32) {
    let old_size = unsafe { (*block).size };
    if new_size as usize + HEADER_SIZE + MIN_BLOCK_SIZE > old_size as usize {
      return;
    }

    unsafe { (*block).size = new_size };

    let remainder = unsafe { (block as *mut u8).add(HEADER_SIZE + new_size as usize) as *mut Header };
    unsafe {
      (*remainder).size = old_size - new_size - HEADER_SIZE as u32;
      (*remainder).next = 0;
    }

    self.insert_free(remainder, None);
  }

  /// Grows `block` in place to `new_size` bytes, either by extending the
  /// unclaimed suffix (if `block` is the last block) or by absorbing its
  /// physical successor, provided that successor is actually free. Leaves
  /// the heap unchanged and returns `false` on failure.
  fn expand(&mut self, block: *mut Header, new_size: u32) -> bool {
    if unsafe { header::adjacent(block, self.region.extra_start()) } {
      let delta = new_size - unsafe { (*block).size };
      if self.region.grow(delta as usize).is_none() {
        return false;
      }
      unsafe { (*block).size = new_size };
      return true;
    }

    let next = unsafe { header::physical_next(block) } as *mut Header;
    let big_enough = unsafe { (*block).size as usize + HEADER_SIZE + (*next).size as usize } >= new_size as usize;
    if !big_enough {
      return false;
    }

    let (prev, at) = self.free.locate_by_address(next);
    if at != Some(next) {
      return false;
    }

    self.free.erase_after(prev);
    unsafe { self.free.merge_into(block, next) };
    self.split(block, new_size);
    true
  }

  // ---------------------------------------------------------------------
  // Component F: public entry points.
  // ---------------------------------------------------------------------

  /// Allocates `n` bytes, returning a payload pointer or null on
  /// out-of-memory. `n == 0` rounds to a zero-payload block and returns a
  /// stable, non-dereferenceable pointer rather than null.
  ///
  /// # Safety
  /// Must not be called concurrently with any other entry point on the same
  /// `Heap` — this allocator is single-threaded by design.
  pub unsafe fn allocate(&mut self, n: usize) -> *mut u8 {
    let block_size = header::round_up_size(n) as u32;

    let (best, before_best) = self.free.find_by_size(block_size);
    let block = match best {
      Some(found) => {
        self.free.erase_after(before_best);
        found
      }
      None => match self.region.grow(HEADER_SIZE + block_size as usize) {
        Some(raw) => {
          let header = raw as *mut Header;
          unsafe { (*header).size = block_size };
          header
        }
        None => return ptr::null_mut(),
      },
    };

    unsafe { header::set_next(block, None) };
    unsafe { header::payload_of(block) }
  }

  /// Allocates `num * size` bytes and zeroes the full rounded block
  /// (including internal fragmentation). `num * size` overflow is treated
  /// as out-of-memory rather than wrapping.
  ///
  /// # Safety
  /// Same requirements as [`Heap::allocate`].
  pub unsafe fn zalloc(&mut self, num: usize, size: usize) -> *mut u8 {
    let Some(total) = num.checked_mul(size) else {
      return ptr::null_mut();
    };

    let payload = unsafe { self.allocate(total) };
    if payload.is_null() {
      return payload;
    }

    unsafe { header::zero_payload(header::header_of(payload)) };
    payload
  }

  /// Resizes the block backing `ptr` to `n` bytes, preserving the shared
  /// prefix and possibly moving it. `ptr == null` behaves as `allocate(n)`.
  /// `n == 0` returns null **without** freeing `ptr` — a deliberate,
  /// documented quirk rather than an oversight.
  ///
  /// # Safety
  /// `ptr` must be null or a live pointer previously returned by this
  /// `Heap`. Same single-threaded requirement as [`Heap::allocate`].
  pub unsafe fn reallocate(&mut self, ptr: *mut u8, n: usize) -> *mut u8 {
    if n == 0 {
      return std::ptr::null_mut();
    }
    if ptr.is_null() {
      return unsafe { self.allocate(n) };
    }

    let block = unsafe { header::header_of(ptr) };
    let block_size = header::round_up_size(n) as u32;

    if block_size <= unsafe { (*block).size } {
      self.split(block, block_size);
      return ptr;
    }

    if self.expand(block, block_size) {
      return ptr;
    }

    let new_ptr = unsafe { self.allocate(n) };
    if new_ptr.is_null() {
      return std::ptr::null_mut();
    }

    let old_size = unsafe { (*block).size as usize };
    unsafe { ptr::copy_nonoverlapping(ptr, new_ptr, old_size.min(n)) };
    unsafe { self.deallocate(ptr) };
    new_ptr
  }

  /// Frees `ptr`, returning it to the free list (and the unclaimed suffix,
  /// if it coalesces all the way to the last block). A no-op on null.
  ///
  /// # Safety
  /// `ptr` must be null or a live pointer previously returned by this
  /// `Heap`, not already freed. Same single-threaded requirement as
  /// [`Heap::allocate`].
  pub unsafe fn deallocate(&mut self, ptr: *mut u8) {
    if ptr.is_null() {
      return;
    }
    let block = unsafe { header::header_of(ptr) };
    self.insert_free(block, None);
  }

  /// Debug/test helper: asserts the free list's structural invariants
  /// (address order, no adjacent free blocks, cursor bounds).
  #[cfg(test)]
  fn check_invariants(&self) {
    self.free.check_sorted_and_separated();

    let extra_start = self.region.extra_start();
    let mut iter = self.free.head();
    while let Some(cur) = iter {
      let payload_end = unsafe { header::physical_next(cur) };
      assert!(payload_end as usize <= extra_start as usize, "free block must not exceed extra_start");
      assert!(!unsafe { header::adjacent(cur, extra_start) }, "no free block may be the last block");
      assert_eq!(unsafe { (*cur).size } % HEADER_SIZE as u32, 0, "size must be a header-size multiple");
      iter = unsafe { header::next_of(cur) };
    }
  }

  #[cfg(test)]
  fn initial_break(&mut self) -> *mut u8 {
    // Force lazy init so extra_start reflects "no blocks yet".
    let p = unsafe { self.allocate(0) };
    let block = unsafe { header::header_of(p) };
    unsafe { self.deallocate(p) };
    block as *mut u8
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn h() -> Heap {
    Heap::new()
  }

  #[test]
  fn two_allocs_then_free_both_returns_to_initial_break() {
    let mut heap = h();
    unsafe {
      let start = heap.initial_break();

      let a = heap.allocate(HEADER_SIZE);
      let b = heap.allocate(HEADER_SIZE);
      heap.deallocate(a);
      heap.check_invariants();
      assert!(!heap.free.is_empty());

      heap.deallocate(b);
      heap.check_invariants();
      assert!(heap.free.is_empty(), "both blocks should coalesce and return to the suffix");
      assert_eq!(heap.region.extra_start(), start);
    }
  }

  #[test]
  fn middle_free_cascades_to_empty() {
    let mut heap = h();
    unsafe {
      let start = heap.initial_break();

      let a = heap.allocate(HEADER_SIZE);
      let b = heap.allocate(HEADER_SIZE);
      let c = heap.allocate(HEADER_SIZE);

      heap.deallocate(a);
      heap.deallocate(c);
      heap.check_invariants();

      heap.deallocate(b);
      heap.check_invariants();
      assert!(heap.free.is_empty(), "b should coalesce with both neighbors and then with the suffix");
      assert_eq!(heap.region.extra_start(), start);
    }
  }

  #[test]
  fn sole_block_freed_is_the_last_block_and_reuses_by_address() {
    // `a` is the only block in existence, so freeing it takes the
    // last-block path (straight back to the unclaimed suffix) rather than
    // entering the free list. The next allocate() re-carves the same
    // address from the suffix, since allocate() never splits a reused
    // block and the whole 8H region comes back as one piece.
    let mut heap = h();
    unsafe {
      let a = heap.allocate(8 * HEADER_SIZE);
      heap.deallocate(a);
      heap.check_invariants();
      assert!(heap.free.is_empty(), "the sole block is last-block and bypasses the free list");

      let b = heap.allocate(HEADER_SIZE);
      assert_eq!(b, a);
      assert!(heap.free.is_empty());
    }
  }

  #[test]
  fn best_fit_reuse_of_a_non_last_block_is_not_split() {
    // Give the large block a successor so freeing it lands in the free
    // list instead of being shrunk away as a last block.
    let mut heap = h();
    unsafe {
      let a = heap.allocate(8 * HEADER_SIZE);
      let _spacer = heap.allocate(HEADER_SIZE);
      heap.deallocate(a);
      heap.check_invariants();
      assert!(!heap.free.is_empty());

      let b = heap.allocate(HEADER_SIZE);
      assert_eq!(b, a, "the only free block large enough should be reused verbatim");

      // allocate() never splits a reused block: the 8H block is now fully
      // in use even though only H bytes were requested.
      assert!(heap.free.is_empty());
      let block = header::header_of(b);
      assert_eq!((*block).size, 8 * HEADER_SIZE as u32);
    }
  }

  #[test]
  fn realloc_of_the_last_block_grows_in_place() {
    // `b` is the last block (nothing was allocated after it), so expand()
    // takes the region-grow path regardless of `a` having been freed;
    // freeing `a` first only confirms it is undisturbed by the expansion.
    let mut heap = h();
    unsafe {
      let a = heap.allocate(HEADER_SIZE);
      let b = heap.allocate(HEADER_SIZE);
      heap.deallocate(a);
      heap.check_invariants();

      let c = heap.reallocate(b, 2 * HEADER_SIZE);
      assert_eq!(c, b, "expand-in-place should preserve the pointer");
      heap.check_invariants();

      let block = header::header_of(a);
      assert_eq!((*block).size, HEADER_SIZE as u32, "a's free block is untouched by b's expansion");
    }
  }

  #[test]
  fn realloc_expands_last_block_in_place() {
    let mut heap = h();
    unsafe {
      let a = heap.allocate(HEADER_SIZE);
      let b = heap.reallocate(a, 4 * HEADER_SIZE);
      assert_eq!(b, a);
    }
  }

  #[test]
  fn realloc_of_a_non_last_block_expands_by_absorbing_a_freed_successor() {
    let mut heap = h();
    unsafe {
      let a = heap.allocate(HEADER_SIZE);
      let b = heap.allocate(HEADER_SIZE);
      let spacer = heap.allocate(HEADER_SIZE);
      heap.deallocate(b);
      heap.check_invariants();

      let grown = heap.reallocate(a, 2 * HEADER_SIZE);
      assert_eq!(grown, a, "expand should absorb the freed successor in place");
      heap.check_invariants();

      // The spacer block is untouched and still addressable past the
      // merged+split region.
      ptr::write_bytes(spacer, 0x7, HEADER_SIZE);
      let slice = std::slice::from_raw_parts(spacer, HEADER_SIZE);
      assert!(slice.iter().all(|&byte| byte == 0x7));
    }
  }

  #[test]
  fn zalloc_zeroes_the_full_rounded_block() {
    let mut heap = h();
    unsafe {
      let ptr = heap.zalloc(4, HEADER_SIZE);
      assert!(!ptr.is_null());
      let block = header::header_of(ptr);
      let size = (*block).size as usize;
      assert_eq!(size, 4 * HEADER_SIZE);

      let bytes = std::slice::from_raw_parts(ptr, size);
      assert!(bytes.iter().all(|&b| b == 0));
    }
  }

  #[test]
  fn round_trip_distinct_tags() {
    let mut heap = h();
    unsafe {
      let mut ptrs = Vec::new();
      for tag in 0u8..16 {
        let p = heap.allocate(32);
        assert!(!p.is_null());
        ptr::write_bytes(p, tag, 32);
        ptrs.push((p, tag));
      }

      for (p, tag) in ptrs {
        let slice = std::slice::from_raw_parts(p, 32);
        assert!(slice.iter().all(|&b| b == tag));
      }
    }
  }

  #[test]
  fn realloc_same_size_is_idempotent() {
    let mut heap = h();
    unsafe {
      let p = heap.allocate(64);
      ptr::write_bytes(p, 0xAB, 64);

      let q = heap.reallocate(p, 64);
      assert_eq!(p, q);

      let slice = std::slice::from_raw_parts(q, 64);
      assert!(slice.iter().all(|&b| b == 0xAB));
    }
  }

  #[test]
  fn best_fit_picks_the_smaller_of_two_candidates() {
    let mut heap = h();
    unsafe {
      // Build two disjoint free blocks of different sizes by allocating a
      // spacer between them so they can't coalesce into one.
      let small = heap.allocate(HEADER_SIZE);
      let _spacer_1 = heap.allocate(HEADER_SIZE);
      let big = heap.allocate(3 * HEADER_SIZE);
      let _spacer_2 = heap.allocate(HEADER_SIZE);

      heap.deallocate(small);
      heap.deallocate(big);
      heap.check_invariants();

      let reused = heap.allocate(HEADER_SIZE);
      assert_eq!(reused, small, "best-fit should pick the smaller candidate");
    }
  }

  #[test]
  fn free_of_null_is_a_no_op() {
    let mut heap = h();
    unsafe {
      heap.deallocate(ptr::null_mut());
    }
  }

  #[test]
  fn realloc_of_null_behaves_as_allocate() {
    let mut heap = h();
    unsafe {
      let p = heap.reallocate(ptr::null_mut(), HEADER_SIZE);
      assert!(!p.is_null());
    }
  }

  #[test]
  fn realloc_to_zero_returns_null_without_freeing() {
    let mut heap = h();
    unsafe {
      let p = heap.allocate(HEADER_SIZE);
      ptr::write_bytes(p, 0x42, HEADER_SIZE);

      let result = heap.reallocate(p, 0);
      assert!(result.is_null());

      // p must still be valid and untouched.
      let slice = std::slice::from_raw_parts(p, HEADER_SIZE);
      assert!(slice.iter().all(|&b| b == 0x42));
    }
  }

  #[test]
  fn zalloc_overflow_returns_null() {
    let mut heap = h();
    unsafe {
      let p = heap.zalloc(usize::MAX, 2);
      assert!(p.is_null());
    }
  }

  #[test]
  fn allocate_zero_returns_non_null_stable_pointer() {
    let mut heap = h();
    unsafe {
      let p = heap.allocate(0);
      assert!(!p.is_null());
    }
  }
}

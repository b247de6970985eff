//! Component A: the region cursor.
//!
//! Tracks the boundary between the used prefix (header-managed blocks) and
//! the unclaimed suffix `[extra_start, extra_end)` that has already been
//! obtained from the OS via `sbrk` but not yet carved into any block.
//!
//! ```text
//!   ┌───────────────── used prefix ─────────────────┬──── unclaimed suffix ────┐
//!   │   block   block   block   block   ...          │                          │
//!   └─────────────────────────────────────────────────┴──────────────────────────┘
//!                                                      ▲                          ▲
//!                                                 extra_start                 extra_end
//!                                                                          (program break)
//! ```
//!
//! `Grow` carves off the head of the suffix and extends it via `sbrk` in
//! fixed-size chunks whenever the cursor would cross `extra_end`. `Shrink`
//! gives a block back to the suffix; it never asks the OS to release memory.

use libc::{c_void, intptr_t, sbrk};

use crate::round_up;

/// `sbrk` is asked to extend the break in multiples of this many bytes.
const CHUNK_SIZE: usize = 1024;

pub struct Region {
  extra_start: *mut u8,
  extra_end: *mut u8,
  ready: bool,
}

impl Region {
  pub const fn new() -> Self {
    Self {
      extra_start: std::ptr::null_mut(),
      extra_end: std::ptr::null_mut(),
      ready: false,
    }
  }

  fn ensure_ready(&mut self) {
    if !self.ready {
      let brk = unsafe { sbrk(0) } as *mut u8;
      self.extra_start = brk;
      self.extra_end = brk;
      self.ready = true;
    }
  }

  pub fn extra_start(&self) -> *mut u8 {
    self.extra_start
  }

  /// `Grow(n)`: returns the current `extra_start`, advances it by `n`, and
  /// extends the OS-backed suffix by whole chunks if that crosses
  /// `extra_end`. Returns `None` only if the underlying `sbrk` extension
  /// fails; the cursor is left unchanged in that case.
  pub fn grow(&mut self, n: usize) -> Option<*mut u8> {
    self.ensure_ready();

    let data = self.extra_start;
    let new_start = unsafe { self.extra_start.add(n) };

    if new_start > self.extra_end {
      let diff = unsafe { new_start.offset_from(self.extra_end) } as usize;
      let diff = round_up!(diff, CHUNK_SIZE);

      let result = unsafe { sbrk(diff as intptr_t) };
      if result as usize == usize::MAX || result == (-1isize) as *mut c_void {
        return None;
      }

      self.extra_end = unsafe { self.extra_end.add(diff) };
    }

    self.extra_start = new_start;
    Some(data)
  }

  /// `Shrink(p)`: returns a block to the unclaimed suffix. `p` must be the
  /// header address of the current last block. Cannot fail; the memory
  /// stays OS-backed and is reused by the next `grow`.
  pub fn shrink(&mut self, p: *mut u8) {
    debug_assert!(p <= self.extra_start);
    self.extra_start = p;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_grow_initializes_cursor_at_program_break() {
    let mut region = Region::new();
    assert!(!region.ready);

    let ptr = region.grow(8).expect("grow should succeed");
    assert!(!ptr.is_null());
    assert!(region.ready);
  }

  #[test]
  fn consecutive_grows_are_contiguous() {
    let mut region = Region::new();

    let a = region.grow(8).unwrap();
    let b = region.grow(16).unwrap();

    assert_eq!(unsafe { a.add(8) }, b);
  }

  #[test]
  fn shrink_moves_extra_start_back() {
    let mut region = Region::new();

    let a = region.grow(8).unwrap();
    region.grow(16).unwrap();

    region.shrink(a);
    assert_eq!(region.extra_start(), a);
  }

  #[test]
  fn grow_extends_in_whole_chunks() {
    let mut region = Region::new();

    // First grow is small; extra_end should now be >= extra_start by a
    // whole chunk, so a series of small grows should not call sbrk again
    // until the chunk is exhausted. We can't observe sbrk directly, but we
    // can confirm repeated small grows stay contiguous without panicking.
    let mut last = region.grow(8).unwrap();
    for _ in 0..200 {
      let next = region.grow(8).unwrap();
      assert_eq!(unsafe { last.add(8) }, next);
      last = next;
    }
  }
}

use std::mem;
use std::ptr;

use crate::round_up;

/// On-disk/in-memory block header: 8 bytes, placed immediately before every
/// block's payload. `next` is a self-relative offset in units of
/// `HEADER_SIZE`, not an absolute pointer, so the whole struct fits in two
/// `u32`s regardless of pointer width.
#[repr(C)]
pub struct Header {
  pub size: u32,
  pub next: u32,
}

pub const HEADER_SIZE: usize = mem::size_of::<Header>();
pub const MIN_BLOCK_SIZE: usize = HEADER_SIZE;

/// `HeaderOf`: the header immediately preceding a payload pointer.
pub unsafe fn header_of(payload: *mut u8) -> *mut Header {
  unsafe { payload.sub(HEADER_SIZE) as *mut Header }
}

/// `PayloadOf`: the payload immediately following a header.
pub unsafe fn payload_of(header: *mut Header) -> *mut u8 {
  unsafe { (header as *mut u8).add(HEADER_SIZE) }
}

/// `PhysicalNext`: the address where the next block (if any) would begin.
pub unsafe fn physical_next(header: *mut Header) -> *mut u8 {
  unsafe { (header as *mut u8).add(HEADER_SIZE + (*header).size as usize) }
}

/// `Adjacent`: true iff `b` begins exactly where `a` physically ends.
pub unsafe fn adjacent(a: *mut Header, b: *mut u8) -> bool {
  unsafe { physical_next(a) == b }
}

/// `RoundUp`: rounds a requested byte count up to a multiple of `HEADER_SIZE`.
///
/// `0` rounds to `0` (not to `MIN_BLOCK_SIZE`) — this mirrors the reference
/// implementation's `getBlockSize` exactly, and is what makes `allocate(0)`
/// produce a zero-payload block rather than a minimum-size one.
pub fn round_up_size(n: usize) -> usize {
  round_up!(n, HEADER_SIZE)
}

/// Reads the free-list successor encoded in `header.next`, or `None` at the
/// end of the list.
pub unsafe fn next_of(header: *mut Header) -> Option<*mut Header> {
  unsafe {
    let offset = (*header).next;
    if offset == 0 {
      None
    } else {
      Some((header as *mut u8).add(offset as usize * HEADER_SIZE) as *mut Header)
    }
  }
}

/// Encodes `next` as a self-relative offset into `header.next`.
pub unsafe fn set_next(header: *mut Header, next: Option<*mut Header>) {
  unsafe {
    (*header).next = match next {
      None => 0,
      Some(next) => {
        let delta = (next as *mut u8).offset_from(header as *mut u8);
        debug_assert!(delta > 0, "next must be strictly after header");
        (delta as usize / HEADER_SIZE) as u32
      }
    };
  }
}

/// Writes zero bytes over a header's whole payload (`size` bytes).
pub unsafe fn zero_payload(header: *mut Header) {
  unsafe {
    let size = (*header).size as usize;
    ptr::write_bytes(payload_of(header), 0, size);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_is_eight_bytes() {
    assert_eq!(HEADER_SIZE, 8);
    assert_eq!(MIN_BLOCK_SIZE, 8);
  }

  #[test]
  fn header_and_payload_round_trip() {
    let mut backing = [0u8; 64];
    let base = backing.as_mut_ptr();
    let header = base as *mut Header;

    unsafe {
      let payload = payload_of(header);
      assert_eq!(header_of(payload), header);
    }
  }

  #[test]
  fn next_offset_round_trips() {
    let mut backing = [0u8; 64];
    let base = backing.as_mut_ptr();

    unsafe {
      let a = base as *mut Header;
      (*a).size = 16;
      let b = base.add(HEADER_SIZE + 16) as *mut Header;
      (*b).size = 0;

      set_next(a, Some(b));
      assert_eq!(next_of(a), Some(b));

      set_next(a, None);
      assert_eq!(next_of(a), None);
    }
  }

  #[test]
  fn round_up_matches_reference_zero_case() {
    assert_eq!(round_up_size(0), 0);
    assert_eq!(round_up_size(1), 8);
    assert_eq!(round_up_size(8), 8);
    assert_eq!(round_up_size(9), 16);
  }
}

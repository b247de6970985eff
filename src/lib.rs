//! # rallocator - A best-fit, coalescing heap allocator
//!
//! This crate provides a single-threaded dynamic memory allocator that
//! implements `allocate` / `free` / `reallocate` / `zero-init allocate` on
//! top of one contiguous, monotonically-growable region of process memory
//! obtained from the OS via `sbrk(2)`.
//!
//! ## Overview
//!
//! The allocator owns one region that starts at the initial program break
//! and only ever grows upward:
//!
//! ```text
//!   ┌──────────────── used prefix ──────────────────┬──── unclaimed suffix ────┐
//!   │  [block] [block] [block] ...                   │     OS-backed, uncarved  │
//!   └─────────────────────────────────────────────────┴──────────────────────────┘
//!                                                    extra_start            extra_end
//!                                                                      (program break)
//! ```
//!
//! The used prefix is a mix of allocated and free blocks in address order.
//! Free blocks are kept in a singly linked, address-ordered free list so
//! that coalescing a freed block with its physical neighbors is a handful
//! of pointer comparisons rather than a scan.
//!
//! ## Crate structure
//!
//! ```text
//!   rallocator
//!   ├── align      - round_up! macro (pure arithmetic, generalized granularity)
//!   ├── header     - block header layout, header<->payload arithmetic (component B)
//!   ├── region     - the sbrk-backed cursor between used and unclaimed memory (component A)
//!   ├── free_list  - the address-ordered free list: locate/find-by-size/splice (component C)
//!   ├── heap       - coalescing insert, split/expand, and the 4 public entry points (D, E, F)
//!   └── global     - a process-wide Heap singleton for malloc-family usage
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rallocator::Heap;
//!
//! let mut heap = Heap::new();
//!
//! unsafe {
//!     let ptr = heap.allocate(64);
//!     ptr.write_bytes(0, 64);
//!     let ptr = heap.reallocate(ptr, 128);
//!     heap.deallocate(ptr);
//! }
//! ```
//!
//! Or, via the process-wide singleton:
//!
//! ```rust,ignore
//! use rallocator::global;
//!
//! unsafe {
//!     let ptr = global::allocate(64);
//!     global::free(ptr);
//! }
//! ```
//!
//! ## Allocation strategy
//!
//! `allocate` runs a best-fit search over the free list (smallest block
//! `>= ` the request, ties broken by earliest address, exact-fit short-
//! circuits) before falling back to carving a fresh block from the unclaimed
//! suffix. A reused block is never split at allocation time — any slack
//! stays inside the block until a later `free` or `reallocate` discovers it.
//!
//! ## Non-goals
//!
//! - **Thread safety**: every entry point mutates process-wide state without
//!   synchronization. Multi-threaded callers must hold an external mutex
//!   across every call.
//! - **Hardened security**: no guard pages, canaries, or randomization.
//! - **Multiple arenas or size classes**, and **returning memory to the OS**
//!   — the data segment only ever grows.
//! - **Alignment stronger than the block header's natural alignment.**
//!
//! ## Safety
//!
//! This crate is inherently unsafe: it deals with raw memory management, and
//! every allocation/deallocation/reallocation operation requires an `unsafe`
//! block from the caller.

pub mod align;
mod free_list;
mod header;
pub mod global;
mod heap;
mod region;

pub use header::{HEADER_SIZE, MIN_BLOCK_SIZE};
pub use heap::Heap;

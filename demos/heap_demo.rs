use std::io::Read;

use libc::sbrk;
use rallocator::Heap;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

/// Debug helper reporting what a call handed back and where the break sits.
unsafe fn print_alloc(label: &str, n: usize, addr: *mut u8) {
  println!(
    "[{}] requested {} bytes, got {:?}, program break (sbrk(0)) = {:?}",
    label,
    n,
    addr,
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Our heap. It owns:
  // - a region cursor (the sbrk-backed boundary between used and unclaimed memory)
  // - an address-ordered free list of blocks reclaimed by `deallocate`
  // and serves every `allocate`/`zalloc`/`reallocate` from the free list
  // before ever touching the region cursor.
  let mut heap = Heap::new();

  unsafe {
    // Initial heap state
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate 4 bytes (stand-in for a u32).
    // --------------------------------------------------------------------
    let first_block = heap.allocate(4);
    println!("\n[1] Allocate 4 bytes");
    print_alloc("1", 4, first_block);

    let first_ptr = first_block as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first_block = 0x{:X}", first_ptr.read());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate 12 bytes.
    //    This shows how the allocator handles "odd-sized" allocations —
    //    the header rounds the request up to a multiple of HEADER_SIZE.
    // --------------------------------------------------------------------
    let second_block = heap.allocate(12);
    println!("\n[2] Allocate 12 bytes");
    print_alloc("2", 12, second_block);

    std::ptr::write_bytes(second_block, 0xAB, 12);
    println!("[2] Initialized second block with 0xAB");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Allocate 8 bytes (stand-in for a u64).
    // --------------------------------------------------------------------
    let third_block = heap.allocate(8);
    println!("\n[3] Allocate 8 bytes");
    print_alloc("3", 8, third_block);

    let third_ptr = third_block as *mut u64;
    third_ptr.write(0x1122334455667788);
    println!("[3] Value written = 0x{:X}", third_ptr.read());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate 32 bytes (stand-in for [u16; 16]) to force more pointer
    //    movement.
    // --------------------------------------------------------------------
    let fourth_block = heap.allocate(32);
    println!("\n[4] Allocate 32 bytes");
    print_alloc("4", 32, fourth_block);

    let fourth_ptr = fourth_block as *mut u16;
    for i in 0..16 {
      fourth_ptr.add(i).write(i as u16);
    }
    println!("[4] Wrote 0..15 into the u16 array");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Deallocate the second block (a middle block). It joins the free
    //    list rather than shrinking the program break, since blocks 3 and
    //    4 still sit after it.
    // --------------------------------------------------------------------
    heap.deallocate(second_block);
    println!("\n[5] Deallocated second_block at {:?}", second_block);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Allocate 2 bytes to see if the allocator reuses the freed block
    //    via best fit instead of growing the region. The block is not
    //    split: the reused block keeps its original 16-byte size even
    //    though only 2 bytes were requested.
    // --------------------------------------------------------------------
    print_program_break("before reuse alloc");
    let fifth_block = heap.allocate(2);
    println!("\n[6] Allocate 2 bytes (check reuse of freed block)");
    print_alloc("6", 2, fifth_block);

    println!(
      "[6] fifth_block == second_block? {}",
      if fifth_block == second_block {
        "Yes, it reused the freed block (best fit, not split)"
      } else {
        "No, it allocated somewhere else"
      }
    );
    print_program_break("after reuse alloc");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 7) Deallocate block 4 (the last block) and then block 3. Freeing
    //    block 4 shrinks the region immediately. Freeing block 3 then
    //    finds itself newly adjacent to the shrunk region boundary, so it
    //    too takes the last-block path rather than joining the free list.
    // --------------------------------------------------------------------
    heap.deallocate(fourth_block);
    println!("\n[7a] Deallocated fourth_block (last block, region shrinks)");
    print_program_break("after freeing fourth_block");

    heap.deallocate(third_block);
    println!("[7b] Deallocated third_block (now the last block, region shrinks again)");
    print_program_break("after freeing third_block");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 8) Grow the last remaining block in place via `reallocate`.
    // --------------------------------------------------------------------
    let grown = heap.reallocate(first_block, 64);
    println!("\n[8] Reallocate first_block from 4 to 64 bytes");
    print_alloc("8", 64, grown);
    println!(
      "[8] grown == first_block? {} (last-block growth reuses the address)",
      grown == first_block
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 9) Allocate a zero-initialized block and confirm every byte reads 0.
    // --------------------------------------------------------------------
    let zeroed = heap.zalloc(16, 4);
    println!("\n[9] zalloc(16, 4) -> {:?}", zeroed);
    let all_zero = std::slice::from_raw_parts(zeroed, 64).iter().all(|&b| b == 0);
    println!("[9] every byte zero? {}", all_zero);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 10) Allocate a large block to observe region growth in whole chunks.
    //     This usually changes the result of `sbrk(0)` by more than the
    //     requested size.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");

    let big_block = heap.allocate(64 * 1024);
    println!("\n[10] Allocate a large 64 KiB block");
    print_alloc("10", 64 * 1024, big_block);

    print_program_break("after large alloc");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 11) End of demo.
    //
    //     Unlike a pure bump allocator, this heap reclaims memory as
    //     blocks are freed: trailing blocks shrink the program break
    //     immediately, and interior blocks join the free list to be
    //     coalesced or reused later.
    // --------------------------------------------------------------------
    heap.deallocate(big_block);
    heap.deallocate(grown);
    heap.deallocate(zeroed);
    println!("\n[11] End of example. Remaining blocks freed; process will exit.");
  }
}

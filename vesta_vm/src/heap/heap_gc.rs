// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The semispace copying collector.
//!
//! Collection copies every object reachable from the root registry into a
//! companion arena of equal capacity, leaves a forwarded header (followed by
//! the new position) at each source site, and then scans the companion
//! breadth-first, running each placed object's fixup so interior positions
//! follow the forwarding. Whatever was never forwarded is garbage; its
//! destructors run before the old arena is released.

use std::cell::Cell;
use std::ptr;
use std::rc::Rc;

use super::type_info::{self, FORWARDED};
use super::{Header, Heap, Slot};

/// Collection state handed to `fixup_after_move` implementations.
///
/// The only operation fixups need is [`GcContext::fixup_pos`]: rewriting an
/// embedded slot position to the object's place in the companion arena.
pub struct GcContext<'h> {
    from: &'h mut [Slot],
    to: *mut Slot,
    to_capacity: u32,
    to_free: u32,
    depth: u32,
    max_depth: u32,
}

impl GcContext<'_> {
    /// Rewrites `pos` to the referenced object's new position, following an
    /// existing forwarding or moving the object if it has not been moved
    /// yet. This is the only mechanism by which interior references are
    /// updated.
    pub fn fixup_pos(&mut self, pos: &mut u32) {
        *pos = self.forward(*pos);
    }

    fn forward(&mut self, pos: u32) -> u32 {
        debug_assert!(pos > 0 && (pos as usize) < self.from.len());
        let header = self.from[pos as usize - 1].header();
        if header.type_index == FORWARDED {
            return self.from[pos as usize].forwarded_to();
        }
        debug_assert!(header.is_active(), "forwarding through a dead header");
        let new_header_pos = self.to_free;
        debug_assert!(new_header_pos + header.size <= self.to_capacity);
        // Relocate header and object slots in one copy; the original type
        // index travels with the header.
        unsafe {
            ptr::copy_nonoverlapping(
                self.from.as_ptr().add(pos as usize - 1),
                self.to.add(new_header_pos as usize),
                header.size as usize,
            );
        }
        self.to_free += header.size;
        let new_pos = new_header_pos + 1;
        self.from[pos as usize - 1] = Slot::from_header(Header {
            size: header.size,
            type_index: FORWARDED,
        });
        self.from[pos as usize] = Slot::from_position(new_pos);
        new_pos
    }
}

impl Heap {
    /// Runs a full copying collection.
    ///
    /// Every registered root is rewritten to its object's position in the
    /// companion arena; unreachable objects are destroyed with the old
    /// arena. The caller must hold no borrows into the heap, which the
    /// `&mut self` receiver already guarantees.
    pub fn garbage_collect(&mut self) {
        let capacity = self.capacity();
        let mut to_space = vec![Slot::default(); capacity as usize];

        // Snapshot the registry after pruning released cells. Cells
        // registered past this mark while the collection runs are not part
        // of the root walk.
        let snapshot: Vec<Rc<Cell<u32>>> = {
            let mut roots = self.roots.borrow_mut();
            roots.prune();
            roots.cells().to_vec()
        };

        let mut gc = GcContext {
            from: &mut self.storage[..],
            to: to_space.as_mut_ptr(),
            to_capacity: capacity,
            to_free: 0,
            depth: 0,
            max_depth: 0,
        };

        for cell in &snapshot {
            let mut pos = cell.get();
            gc.fixup_pos(&mut pos);
            cell.set(pos);
        }

        // Breadth-first scan of the companion arena. Fixups may move
        // further objects, pushing the bump pointer ahead of the scan; the
        // scan terminates once it catches up.
        let mut scan = 0;
        while scan < gc.to_free {
            let header = unsafe { *gc.to.add(scan as usize) }.header();
            debug_assert!(header.is_active());
            if let Some(fixup_fn) = type_info::record(header.type_index).fixup_fn {
                gc.depth += 1;
                gc.max_depth = gc.max_depth.max(gc.depth);
                unsafe {
                    fixup_fn(gc.to.add(scan as usize + 1) as *mut u8, &mut gc);
                }
                gc.depth -= 1;
            }
            scan += header.size;
        }

        let to_free = gc.to_free;
        let max_depth = gc.max_depth;
        drop(gc);

        // Objects never forwarded are unreachable: run their destructors in
        // the old arena before it is released.
        let mut pos = 0;
        while pos < self.next_free {
            let header = self.storage[pos as usize].header();
            if header.is_active() {
                if let Some(drop_fn) = type_info::record(header.type_index).drop_fn {
                    unsafe {
                        drop_fn(self.storage.as_mut_ptr().add(pos as usize + 1) as *mut u8);
                    }
                }
            }
            pos += header.size;
        }

        self.storage = to_space.into_boxed_slice();
        self.next_free = to_free;
        self.last_collection_depth = max_depth;
    }
}

#[cfg(test)]
mod tests {
    use super::super::{HeapObject, RawRef, Root};
    use super::*;

    struct Word(u64);

    unsafe impl HeapObject for Word {
        const TYPE_NAME: &'static str = "word";
    }

    struct Pair {
        left: Option<RawRef<Word>>,
        right: Option<RawRef<Word>>,
    }

    unsafe impl HeapObject for Pair {
        const TYPE_NAME: &'static str = "pair";
        const NEEDS_FIXUP: bool = true;

        fn fixup_after_move(&mut self, gc: &mut GcContext<'_>) {
            if let Some(left) = &mut self.left {
                left.fixup_after_move(gc);
            }
            if let Some(right) = &mut self.right {
                right.fixup_after_move(gc);
            }
        }
    }

    #[test]
    fn collection_drops_unreachable() {
        let mut heap = Heap::new(64);
        let keep = heap.make(Word(1)).unwrap();
        for i in 0..8 {
            let _temp = heap.make(Word(i)).unwrap();
        }
        heap.garbage_collect();
        assert_eq!(heap.used_slots(), 2);
        assert_eq!(keep.get(&heap).0, 1);
    }

    #[test]
    fn interior_references_are_forwarded() {
        let mut heap = Heap::new(64);
        let left = heap.make(Word(10)).unwrap();
        let right = heap.make(Word(20)).unwrap();
        let pair: Root<Pair> = heap
            .make(Pair {
                left: Some(left.raw()),
                right: Some(right.raw()),
            })
            .unwrap();
        drop(left);
        drop(right);
        // A dead object between the roots forces relocation distances.
        let _ = heap.make(Word(0)).unwrap();
        heap.garbage_collect();
        let p = pair.get(&heap);
        let (left, right) = (p.left.unwrap(), p.right.unwrap());
        assert_eq!(left.get(&heap).0, 10);
        assert_eq!(right.get(&heap).0, 20);
    }

    #[test]
    fn shared_target_is_moved_once() {
        let mut heap = Heap::new(64);
        let word = heap.make(Word(5)).unwrap();
        let a = heap
            .make(Pair {
                left: Some(word.raw()),
                right: None,
            })
            .unwrap();
        let b = heap
            .make(Pair {
                left: Some(word.raw()),
                right: None,
            })
            .unwrap();
        drop(word);
        heap.garbage_collect();
        // word + two pairs, each 1 object slot + header
        assert_eq!(heap.used_slots(), 6);
        let left_a = a.get(&heap).left.unwrap();
        let left_b = b.get(&heap).left.unwrap();
        assert_eq!(left_a, left_b);
        assert_eq!(left_a.get(&heap).0, 5);
    }
}

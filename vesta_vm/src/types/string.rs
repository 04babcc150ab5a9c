// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heap-allocated strings: a length word followed by the UTF-8 bytes
//! inline in the same allocation.

use std::mem::size_of;
use std::ptr;
use std::slice;
use std::str;

use crate::heap::{Heap, HeapError, HeapObject, Root};

#[repr(C)]
pub struct StringData {
    len: u32,
}

unsafe impl HeapObject for StringData {
    const TYPE_NAME: &'static str = "string";
}

impl StringData {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: the allocation reserves `len` bytes directly after the
        // length word and `new_string` fills them with valid UTF-8.
        unsafe {
            let bytes = (self as *const StringData).add(1) as *const u8;
            str::from_utf8_unchecked(slice::from_raw_parts(bytes, self.len as usize))
        }
    }
}

impl Heap {
    pub fn new_string(&mut self, text: &str) -> Result<Root<StringData>, HeapError> {
        assert!(text.len() <= u32::MAX as usize);
        let root = self.make_with_extra(
            StringData {
                len: text.len() as u32,
            },
            text.len(),
        )?;
        unsafe {
            let bytes = self
                .object_bytes_mut(root.position())
                .add(size_of::<StringData>());
            ptr::copy_nonoverlapping(text.as_ptr(), bytes, text.len());
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_survives_allocation() {
        let mut heap = Heap::new(64);
        let s = heap.new_string("hello, heap").unwrap();
        assert_eq!(s.get(&heap).as_str(), "hello, heap");
        assert_eq!(s.get(&heap).len(), 11);
    }

    #[test]
    fn empty_string() {
        let mut heap = Heap::new(16);
        let s = heap.new_string("").unwrap();
        assert!(s.get(&heap).is_empty());
        assert_eq!(s.get(&heap).as_str(), "");
    }

    #[test]
    fn slot_accounting_includes_inline_bytes() {
        let mut heap = Heap::new(64);
        // 4 bytes of header word + 9 bytes of text: two object slots.
        let _s = heap.new_string("123456789").unwrap();
        assert_eq!(heap.used_slots(), 3);
    }
}

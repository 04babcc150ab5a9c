// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Array objects: an ordinary object extended with a length. Elements are
//! ordinary named properties on the base object; the evaluator maintains
//! the index-to-length relationship.

use crate::heap::{GcContext, Heap, HeapError, HeapObject, Root};
use crate::types::Object;

#[repr(C)]
pub struct ArrayObject {
    base: Object,
    length: u32,
}

unsafe impl HeapObject for ArrayObject {
    const TYPE_NAME: &'static str = "array";
    const IS_OBJECT: bool = true;
    const NEEDS_FIXUP: bool = true;

    fn fixup_after_move(&mut self, gc: &mut GcContext<'_>) {
        self.base.fixup_after_move(gc);
    }
}

impl ArrayObject {
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn set_length(&mut self, length: u32) {
        self.length = length;
    }

    pub fn as_object(&self) -> &Object {
        &self.base
    }
}

impl Root<ArrayObject> {
    /// Upcast to the dynamic object type; the array prefix is an
    /// [`Object`], so the same position serves both views.
    pub fn into_object(self) -> Root<Object> {
        self.retype()
    }
}

impl Heap {
    pub fn new_array(&mut self, length: u32) -> Result<Root<ArrayObject>, HeapError> {
        self.make(ArrayObject {
            base: Object::with_prototype(None),
            length,
        })
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The process-wide type registry.
//!
//! Every heap type is described by a [`TypeRecord`] appended to a global
//! list the first time the type is referenced. The record's index in that
//! list is what allocation headers carry, so indices must stay stable for
//! the lifetime of the process and identical across heaps.

use std::any::TypeId;
use std::mem;
use std::ptr;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use super::GcContext;
use crate::types::Object;

/// Header type index of a reservation that has not been constructed yet.
pub(crate) const UNALLOCATED: u32 = u32::MAX;
/// Header type index of an object relocated by the running collection.
pub(crate) const FORWARDED: u32 = u32::MAX - 1;

/// A type that can live on the slot heap.
///
/// # Safety
///
/// Implementations must uphold all of the following:
///
/// - `fixup_after_move` forwards every embedded [`RawRef`](super::RawRef)
///   and [`ValueRepr`](crate::types::ValueRepr), and `NEEDS_FIXUP` is `true`
///   whenever the type can embed one. A missed position keeps pointing into
///   the released arena after a collection.
/// - A type with `IS_OBJECT` set is `#[repr(C)]` and its first field is
///   [`Object`], so a handle typed as `Object` may alias its prefix.
/// - The type holds no references into its own heap other than through the
///   two forms above.
pub unsafe trait HeapObject: Sized + 'static {
    /// Name shown by [`Heap::debug_print`](crate::Heap::debug_print).
    const TYPE_NAME: &'static str;

    /// Participates in downcasts to and from the dynamic object type.
    const IS_OBJECT: bool = false;

    /// The type embeds heap positions that must be forwarded after a move.
    const NEEDS_FIXUP: bool = false;

    /// Rewrites embedded heap positions after the object has been moved to
    /// the companion arena. Called on the freshly-placed copy.
    fn fixup_after_move(&mut self, _gc: &mut GcContext<'_>) {}
}

#[derive(Clone, Copy)]
pub(crate) struct TypeRecord {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) drop_fn: Option<unsafe fn(*mut u8)>,
    pub(crate) fixup_fn: Option<unsafe fn(*mut u8, &mut GcContext<'_>)>,
    pub(crate) convertible_to_object: bool,
}

static TYPES: Lazy<Mutex<Vec<TypeRecord>>> = Lazy::new(|| Mutex::new(Vec::new()));

unsafe fn drop_value<T>(object: *mut u8) {
    ptr::drop_in_place(object as *mut T);
}

unsafe fn fixup_value<T: HeapObject>(object: *mut u8, gc: &mut GcContext<'_>) {
    T::fixup_after_move(&mut *(object as *mut T), gc);
}

/// The stable index of `T`, registering it on first reference.
pub(crate) fn index_of<T: HeapObject>() -> u32 {
    let mut types = TYPES.lock().unwrap();
    if let Some(index) = types.iter().position(|t| t.type_id == TypeId::of::<T>()) {
        return index as u32;
    }
    assert!((types.len() as u32) < FORWARDED);
    types.push(TypeRecord {
        type_id: TypeId::of::<T>(),
        name: T::TYPE_NAME,
        drop_fn: if mem::needs_drop::<T>() {
            Some(drop_value::<T>)
        } else {
            None
        },
        fixup_fn: if T::NEEDS_FIXUP {
            Some(fixup_value::<T>)
        } else {
            None
        },
        convertible_to_object: T::IS_OBJECT,
    });
    (types.len() - 1) as u32
}

/// Looks up a registered record. An unknown index is an impossible state.
pub(crate) fn record(index: u32) -> TypeRecord {
    TYPES.lock().unwrap()[index as usize]
}

/// The downcast predicate: a recorded type converts to `T` when it is `T`
/// itself, or when `T` is the dynamic object type and the recorded type is
/// an object.
pub(crate) fn is_convertible<T: HeapObject>(index: u32) -> bool {
    let record = record(index);
    record.type_id == TypeId::of::<T>()
        || (TypeId::of::<T>() == TypeId::of::<Object>() && record.convertible_to_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    unsafe impl HeapObject for Alpha {
        const TYPE_NAME: &'static str = "alpha";
    }

    unsafe impl HeapObject for Beta {
        const TYPE_NAME: &'static str = "beta";
    }

    #[test]
    fn indices_are_stable() {
        let alpha = index_of::<Alpha>();
        let beta = index_of::<Beta>();
        assert_ne!(alpha, beta);
        assert_eq!(index_of::<Alpha>(), alpha);
        assert_eq!(index_of::<Beta>(), beta);
        assert_eq!(record(alpha).name, "alpha");
    }

    #[test]
    fn exact_types_convert_only_to_themselves() {
        let alpha = index_of::<Alpha>();
        assert!(is_convertible::<Alpha>(alpha));
        assert!(!is_convertible::<Beta>(alpha));
        assert!(!is_convertible::<Object>(alpha));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime core of the Vesta engine: a relocating, precise garbage-collected
//! slot heap, typed handles, and the language value types stored in it.

pub mod heap;
pub mod types;

pub use heap::{GcContext, Heap, HeapError, HeapObject, RawRef, Root};
pub use types::{
    ArrayObject, NativeFunction, Object, PropertyTable, Reference, StringData, Value, ValueRepr,
};

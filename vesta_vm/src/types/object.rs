// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ordinary objects: a prototype link and a growable table of named
//! properties kept in creation order.
//!
//! Only own-property storage lives here; walking the prototype chain is the
//! evaluator's job.

use std::mem::size_of;
use std::ptr;
use std::slice;

use crate::heap::{GcContext, Heap, HeapError, HeapObject, RawRef, Root};
use crate::types::{StringData, Value, ValueRepr};

#[repr(C)]
pub struct Object {
    prototype: Option<RawRef<Object>>,
    properties: Option<RawRef<PropertyTable>>,
}

unsafe impl HeapObject for Object {
    const TYPE_NAME: &'static str = "object";
    const IS_OBJECT: bool = true;
    const NEEDS_FIXUP: bool = true;

    fn fixup_after_move(&mut self, gc: &mut GcContext<'_>) {
        if let Some(prototype) = &mut self.prototype {
            prototype.fixup_after_move(gc);
        }
        if let Some(properties) = &mut self.properties {
            properties.fixup_after_move(gc);
        }
    }
}

impl Object {
    pub(crate) fn with_prototype(prototype: Option<RawRef<Object>>) -> Object {
        Object {
            prototype,
            properties: None,
        }
    }

    pub fn prototype(&self) -> Option<RawRef<Object>> {
        self.prototype
    }

    /// Looks up an own property. `None` when the object has no property of
    /// that name.
    pub fn get(&self, heap: &Heap, key: &str) -> Option<Value> {
        let table = self.properties?.get(heap);
        table
            .entries()
            .iter()
            .find(|property| property.key.get(heap).as_str() == key)
            .map(|property| property.value.get_value(heap))
    }

    pub fn has(&self, heap: &Heap, key: &str) -> bool {
        match self.properties {
            Some(table) => table
                .get(heap)
                .entries()
                .iter()
                .any(|property| property.key.get(heap).as_str() == key),
            None => false,
        }
    }

    /// Own property names in creation order.
    pub fn own_keys<'h>(&self, heap: &'h Heap) -> Vec<&'h str> {
        match self.properties {
            Some(table) => table
                .get(heap)
                .entries()
                .iter()
                .map(|property| property.key.get(heap).as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// One named property: key string plus stored value form.
#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct Property {
    key: RawRef<StringData>,
    value: ValueRepr,
}

/// The object's property storage: a heap allocation with the entry array
/// inline after the two length words.
#[repr(C)]
pub struct PropertyTable {
    capacity: u32,
    len: u32,
}

unsafe impl HeapObject for PropertyTable {
    const TYPE_NAME: &'static str = "property_table";
    const NEEDS_FIXUP: bool = true;

    fn fixup_after_move(&mut self, gc: &mut GcContext<'_>) {
        for property in self.entries_mut() {
            property.key.fixup_after_move(gc);
            property.value.fixup_after_move(gc);
        }
    }
}

impl PropertyTable {
    fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    fn first_entry(&self) -> *const Property {
        // SAFETY: the allocation reserves `capacity` entries directly after
        // the two length words; tables start on a slot boundary so the
        // entries are 8-aligned.
        unsafe { (self as *const PropertyTable).add(1) as *const Property }
    }

    pub(crate) fn entries(&self) -> &[Property] {
        unsafe { slice::from_raw_parts(self.first_entry(), self.len as usize) }
    }

    fn entries_mut(&mut self) -> &mut [Property] {
        unsafe {
            slice::from_raw_parts_mut(self.first_entry() as *mut Property, self.len as usize)
        }
    }

    fn push(&mut self, property: Property) {
        debug_assert!(!self.is_full());
        unsafe {
            ptr::write(
                (self.first_entry() as *mut Property).add(self.len as usize),
                property,
            );
        }
        self.len += 1;
    }

    fn remove(&mut self, index: usize) {
        let len = self.len as usize;
        debug_assert!(index < len);
        unsafe {
            let base = self.first_entry() as *mut Property;
            ptr::copy(base.add(index + 1), base.add(index), len - index - 1);
        }
        self.len -= 1;
    }
}

impl Heap {
    pub fn new_object(
        &mut self,
        prototype: Option<&Root<Object>>,
    ) -> Result<Root<Object>, HeapError> {
        // Wire the prototype only after `make`: the allocation may collect
        // and an untracked position taken beforehand would go stale.
        let object = self.make(Object::with_prototype(None))?;
        if let Some(prototype) = prototype {
            object.get_mut(self).prototype = Some(prototype.raw());
        }
        Ok(object)
    }

    /// Creates or overwrites an own property. Growing the table and
    /// interning the key may both trigger a collection, so all state is
    /// re-read through handles after every allocation.
    pub fn put_property(
        &mut self,
        object: &Root<Object>,
        key: &str,
        value: &Value,
    ) -> Result<(), HeapError> {
        if let Some(table) = object.get(self).properties {
            let found = table
                .get(self)
                .entries()
                .iter()
                .position(|property| property.key.get(self).as_str() == key);
            if let Some(index) = found {
                table.get_mut(self).entries_mut()[index].value = ValueRepr::new(value);
                return Ok(());
            }
        }

        let key_root = self.new_string(key)?;

        let needs_grow = match object.get(self).properties {
            None => true,
            Some(table) => table.get(self).is_full(),
        };
        if needs_grow {
            let new_capacity = match object.get(self).properties {
                None => INITIAL_TABLE_CAPACITY,
                Some(table) => table.get(self).capacity * 2,
            };
            let new_table = self.new_table(new_capacity)?;
            if let Some(old_table) = object.get(self).properties {
                let entries: Vec<Property> = old_table.get(self).entries().to_vec();
                for property in entries {
                    new_table.get_mut(self).push(property);
                }
            }
            object.get_mut(self).properties = Some(new_table.raw());
        }

        // Encode the stored form only now: the allocations above may have
        // collected, and the encoding captures raw positions.
        let table = object
            .get(self)
            .properties
            .expect("property table installed above");
        table.get_mut(self).push(Property {
            key: key_root.raw(),
            value: ValueRepr::new(value),
        });
        Ok(())
    }

    /// Removes an own property, preserving the order of the rest. Returns
    /// whether the property existed.
    pub fn delete_property(&mut self, object: &Root<Object>, key: &str) -> bool {
        let Some(table) = object.get(self).properties else {
            return false;
        };
        let found = table
            .get(self)
            .entries()
            .iter()
            .position(|property| property.key.get(self).as_str() == key);
        match found {
            Some(index) => {
                table.get_mut(self).remove(index);
                true
            }
            None => false,
        }
    }

    fn new_table(&mut self, capacity: u32) -> Result<Root<PropertyTable>, HeapError> {
        self.make_with_extra(
            PropertyTable { capacity, len: 0 },
            capacity as usize * size_of::<Property>(),
        )
    }
}

const INITIAL_TABLE_CAPACITY: u32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let mut heap = Heap::new(256);
        let object = heap.new_object(None).unwrap();
        heap.put_property(&object, "a", &Value::Number(1.0)).unwrap();
        heap.put_property(&object, "b", &Value::Boolean(true)).unwrap();

        assert!(matches!(
            object.get(&heap).get(&heap, "a"),
            Some(Value::Number(n)) if n == 1.0
        ));
        assert!(object.get(&heap).has(&heap, "b"));
        assert!(object.get(&heap).get(&heap, "missing").is_none());

        assert!(heap.delete_property(&object, "a"));
        assert!(!heap.delete_property(&object, "a"));
        assert!(object.get(&heap).get(&heap, "a").is_none());
        assert!(object.get(&heap).has(&heap, "b"));
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let mut heap = Heap::new(256);
        let object = heap.new_object(None).unwrap();
        heap.put_property(&object, "x", &Value::Number(1.0)).unwrap();
        heap.put_property(&object, "x", &Value::Number(2.0)).unwrap();
        assert_eq!(object.get(&heap).own_keys(&heap), vec!["x"]);
        assert!(matches!(
            object.get(&heap).get(&heap, "x"),
            Some(Value::Number(n)) if n == 2.0
        ));
    }

    #[test]
    fn keys_stay_in_creation_order_across_growth() {
        let mut heap = Heap::new(1024);
        let object = heap.new_object(None).unwrap();
        let names = ["one", "two", "three", "four", "five", "six"];
        for (i, name) in names.iter().enumerate() {
            heap.put_property(&object, name, &Value::Number(i as f64))
                .unwrap();
        }
        assert_eq!(object.get(&heap).own_keys(&heap), names);
    }

    #[test]
    fn prototype_link() {
        let mut heap = Heap::new(256);
        let proto = heap.new_object(None).unwrap();
        let object = heap.new_object(Some(&proto)).unwrap();
        let raw = object.get(&heap).prototype().unwrap();
        assert_eq!(raw.position(), proto.position());
        assert!(proto.get(&heap).prototype().is_none());
    }
}

//! The three heap kinds (struct, array, class instances), stored behind
//! one shared id space the way a single `next_obj_id` counter hands out
//! object ids across all three in the original machine.

use tyro_util::error::{VMError, VMResult};
use tyro_util::{define_idx, FxHashMap, Idx, IndexVec};

use tyro_bc::Value;

define_idx!(ObjectId);

/// The id of the first object a fresh [`Heap`] allocates. Chosen to match
/// the original machine's starting counter; kept as a named constant
/// rather than a magic literal scattered through the interpreter.
pub const BASE_OBJECT_ID: i64 = 2023;

#[derive(Debug)]
enum HeapObject {
    Struct(FxHashMap<String, Value>),
    Array(Vec<Value>),
    Class(FxHashMap<String, Value>),
}

/// A single contiguous store backing all three allocation kinds. Giving
/// every allocation — struct, array, or class — the next slot in one
/// `IndexVec` reproduces the shared counter while still letting each
/// accessor assert it was handed the right kind of id.
#[derive(Debug, Default)]
pub struct Heap {
    objects: IndexVec<ObjectId, HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            objects: IndexVec::new(),
        }
    }

    fn to_index(&self, oid: i64) -> VMResult<ObjectId> {
        let raw = oid - BASE_OBJECT_ID;
        if raw < 0 || raw as usize >= self.objects.len() {
            return Err(VMError::new(format!("invalid object id {oid}")));
        }
        Ok(ObjectId::from_usize(raw as usize))
    }

    pub fn alloc_struct(&mut self) -> i64 {
        let id = self.objects.push(HeapObject::Struct(FxHashMap::default()));
        id.index() as i64 + BASE_OBJECT_ID
    }

    pub fn alloc_class(&mut self) -> i64 {
        let id = self.objects.push(HeapObject::Class(FxHashMap::default()));
        id.index() as i64 + BASE_OBJECT_ID
    }

    pub fn alloc_array(&mut self, size: usize, fill: Value) -> i64 {
        let id = self.objects.push(HeapObject::Array(vec![fill; size]));
        id.index() as i64 + BASE_OBJECT_ID
    }

    fn struct_fields_mut(&mut self, oid: i64) -> VMResult<&mut FxHashMap<String, Value>> {
        let idx = self.to_index(oid)?;
        match &mut self.objects[idx] {
            HeapObject::Struct(fields) => Ok(fields),
            _ => Err(VMError::new(format!("object {oid} is not a struct"))),
        }
    }

    fn class_members_mut(&mut self, oid: i64) -> VMResult<&mut FxHashMap<String, Value>> {
        let idx = self.to_index(oid)?;
        match &mut self.objects[idx] {
            HeapObject::Class(members) => Ok(members),
            _ => Err(VMError::new(format!("object {oid} is not a class instance"))),
        }
    }

    fn array_mut(&mut self, oid: i64) -> VMResult<&mut Vec<Value>> {
        let idx = self.to_index(oid)?;
        match &mut self.objects[idx] {
            HeapObject::Array(elems) => Ok(elems),
            _ => Err(VMError::new(format!("object {oid} is not an array"))),
        }
    }

    pub fn add_field(&mut self, oid: i64, name: &str) -> VMResult<()> {
        self.struct_fields_mut(oid)?.insert(name.to_string(), Value::Null);
        Ok(())
    }

    pub fn set_field(&mut self, oid: i64, name: &str, value: Value) -> VMResult<()> {
        self.struct_fields_mut(oid)?.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get_field(&mut self, oid: i64, name: &str) -> VMResult<Value> {
        Ok(self.struct_fields_mut(oid)?.get(name).cloned().unwrap_or(Value::Null))
    }

    pub fn add_member(&mut self, oid: i64, name: &str) -> VMResult<()> {
        self.class_members_mut(oid)?.insert(name.to_string(), Value::Null);
        Ok(())
    }

    pub fn set_member(&mut self, oid: i64, name: &str, value: Value) -> VMResult<()> {
        self.class_members_mut(oid)?.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get_member(&mut self, oid: i64, name: &str) -> VMResult<Value> {
        Ok(self.class_members_mut(oid)?.get(name).cloned().unwrap_or(Value::Null))
    }

    pub fn array_len(&mut self, oid: i64) -> VMResult<usize> {
        Ok(self.array_mut(oid)?.len())
    }

    pub fn get_index(&mut self, oid: i64, index: i64) -> VMResult<Value> {
        let elems = self.array_mut(oid)?;
        if index < 0 || index as usize >= elems.len() {
            return Err(VMError::new(format!(
                "out-of-bounds array index {index} of {}",
                elems.len()
            )));
        }
        Ok(elems[index as usize].clone())
    }

    pub fn set_index(&mut self, oid: i64, index: i64, value: Value) -> VMResult<()> {
        let elems = self.array_mut(oid)?;
        if index < 0 || index as usize >= elems.len() {
            return Err(VMError::new(format!(
                "out-of-bounds array index {index} of {}",
                elems.len()
            )));
        }
        elems[index as usize] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_start_at_the_named_base() {
        let mut heap = Heap::new();
        assert_eq!(heap.alloc_struct(), BASE_OBJECT_ID);
        assert_eq!(heap.alloc_class(), BASE_OBJECT_ID + 1);
    }

    #[test]
    fn struct_field_round_trips_through_add_set_get() {
        let mut heap = Heap::new();
        let oid = heap.alloc_struct();
        heap.add_field(oid, "x").unwrap();
        assert_eq!(heap.get_field(oid, "x").unwrap(), Value::Null);
        heap.set_field(oid, "x", Value::Int(7)).unwrap();
        assert_eq!(heap.get_field(oid, "x").unwrap(), Value::Int(7));
    }

    #[test]
    fn array_index_out_of_bounds_is_an_error() {
        let mut heap = Heap::new();
        let oid = heap.alloc_array(3, Value::Null);
        assert!(heap.get_index(oid, 3).is_err());
        assert!(heap.get_index(oid, -1).is_err());
        assert!(heap.get_index(oid, 0).is_ok());
    }

    #[test]
    fn accessing_the_wrong_heap_kind_is_an_error() {
        let mut heap = Heap::new();
        let oid = heap.alloc_struct();
        assert!(heap.array_len(oid).is_err());
    }
}

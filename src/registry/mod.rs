//! Type registry - describes aggregate layouts as field tables.
//!
//! Shared, passive metadata consumed identically by the tracing GC marker
//! (`crate::gc`) and the reference-counting cycle collector (`crate::rc`).
//! The registry never allocates or frees user objects; it only knows how to
//! name the outgoing managed pointers of an object given its type.

mod field;

pub use field::{ArrayElement, FieldDescriptor, FieldKind};

use crate::logging::trace;

/// Stable handle to a registered [`TypeDescriptor`].
///
/// Descriptors refer to each other (and to themselves, for recursive types)
/// by `TypeId` rather than by direct reference, since Rust cannot express a
/// self-referential static initializer the way a C struct literal can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

impl TypeId {
    /// Raw index into the registry's descriptor table. Exposed so headers
    /// (`crate::gc::header`, `crate::rc::object`) can store it compactly.
    pub fn index(self) -> usize {
        self.0
    }

    /// Reconstruct a `TypeId` from a previously-observed index.
    pub fn from_index(index: usize) -> Self {
        TypeId(index)
    }
}

/// Destructor invoked by a caller once a typed object's payload is about to
/// be reclaimed. Must not allocate or release other managed objects — see
/// "Destructor reentrancy" in `SPEC_FULL.md` §F.
pub type Destructor = unsafe fn(*mut u8);

/// Metadata for one aggregate type: a name, byte size, field table, and an
/// optional destructor.
pub struct TypeDescriptor {
    pub name: String,
    pub size: usize,
    pub fields: Vec<FieldDescriptor>,
    pub destructor: Option<Destructor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self { name: name.into(), size, fields: Vec::new(), destructor: None }
    }

    pub fn with_destructor(mut self, destructor: Destructor) -> Self {
        self.destructor = Some(destructor);
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Registry of all type descriptors known to the runtime.
///
/// Append-only: `register` never checks for duplicates (a caller bug is a
/// caller bug, per §4.1) and there is no removal API, since descriptors must
/// outlive every instance of their type (§9, "Type descriptor lifecycle").
#[derive(Default)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self { descriptors: Vec::new() }
    }

    /// Reserve a `TypeId` for a type whose field table isn't known yet.
    ///
    /// Needed to build self-referential or mutually-recursive descriptors:
    /// reserve the id, construct fields that point at it, then fill it in
    /// with [`TypeRegistry::define`].
    pub fn reserve(&mut self) -> TypeId {
        let id = TypeId(self.descriptors.len());
        self.descriptors.push(TypeDescriptor::new("<reserved>", 0));
        id
    }

    /// Fill in a descriptor previously reserved via [`TypeRegistry::reserve`].
    pub fn define(&mut self, id: TypeId, descriptor: TypeDescriptor) {
        self.descriptors[id.0] = descriptor;
    }

    /// Register a fully-built descriptor, returning its id.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> TypeId {
        trace!(type_name = %descriptor.name, "registering type descriptor");
        let id = TypeId(self.descriptors.len());
        self.descriptors.push(descriptor);
        id
    }

    /// Linear scan by exact name match; returns the *first* match.
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.descriptors
            .iter()
            .position(|d| d.name == name)
            .map(TypeId)
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.descriptors[id.0]
    }

    /// True if any field of this type produces an outgoing managed pointer.
    pub fn has_pointers(&self, id: TypeId) -> bool {
        self.get(id).fields.iter().any(|f| f.kind.has_pointers())
    }

    /// Number of outgoing managed references one instance of this type
    /// produces (arrays count their full element span).
    pub fn count_pointers(&self, id: TypeId) -> usize {
        let mut total = 0;
        for field in &self.get(id).fields {
            total += match field.kind {
                FieldKind::Pointer { .. } => 1,
                FieldKind::Array { count, element: ArrayElement::Pointer, .. } if count > 0 => count,
                FieldKind::Array { count, element: ArrayElement::Embedded(target), .. }
                    if count > 0 =>
                {
                    count * self.count_pointers(target)
                }
                FieldKind::Embedded { target } => self.count_pointers(target),
                _ => 0,
            };
        }
        total
    }

    /// Visit every outgoing managed pointer of the object at `base`.
    ///
    /// `visitor` is called as `(object_base, pointer_value)` once per
    /// non-null outgoing reference, per the traversal policy in §4.1:
    /// - `primitive`, `string`: skipped.
    /// - `pointer`: read the pointer at `base + offset`; visit if non-null.
    /// - `array` with a pointer-bearing element type and length N: N calls
    ///   over `base + offset + i * element_size`.
    /// - `embedded`: recurse into the embedded descriptor at `base + offset`.
    ///
    /// # Safety
    /// `base` must point to a live, fully-initialized instance of the type
    /// named by `id`.
    pub unsafe fn traverse(
        &self,
        id: TypeId,
        base: *mut u8,
        visitor: &mut dyn FnMut(*mut u8, *mut u8),
    ) {
        let descriptor = self.get(id);
        for field in &descriptor.fields {
            let field_base = base.add(field.offset);
            match &field.kind {
                FieldKind::Primitive | FieldKind::String => {}
                FieldKind::Pointer { .. } => {
                    let ptr = *(field_base as *const *mut u8);
                    if !ptr.is_null() {
                        visitor(base, ptr);
                    }
                }
                FieldKind::Array { element, count, element_size } => {
                    if *count == 0 || !element.has_pointers() {
                        continue;
                    }
                    for i in 0..*count {
                        let elem_base = field_base.add(i * element_size);
                        match element {
                            ArrayElement::Pointer => {
                                let ptr = *(elem_base as *const *mut u8);
                                if !ptr.is_null() {
                                    visitor(base, ptr);
                                }
                            }
                            ArrayElement::Embedded(target) => {
                                self.traverse(*target, elem_base, visitor);
                            }
                        }
                    }
                }
                FieldKind::Embedded { target } => {
                    self.traverse(*target, field_base, visitor);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_find() {
        let mut reg = TypeRegistry::new();
        let id = reg.register(TypeDescriptor::new("Point", 16));
        assert_eq!(reg.find("Point"), Some(id));
        assert_eq!(reg.find("Nope"), None);
    }

    #[test]
    fn has_pointers_reflects_field_kinds() {
        let mut reg = TypeRegistry::new();
        let leaf = reg.register(TypeDescriptor::new("Leaf", 8));
        assert!(!reg.has_pointers(leaf));

        let node = reg.register(
            TypeDescriptor::new("Node", 16).with_field(FieldDescriptor::pointer("next", 0, leaf)),
        );
        assert!(reg.has_pointers(node));
        assert_eq!(reg.count_pointers(node), 1);
    }

    #[test]
    fn self_referential_via_reserve() {
        let mut reg = TypeRegistry::new();
        let node_id = reg.reserve();
        let descriptor = TypeDescriptor::new("Node", 16)
            .with_field(FieldDescriptor::pointer("next", 0, node_id));
        reg.define(node_id, descriptor);

        assert!(reg.has_pointers(node_id));
        assert_eq!(reg.count_pointers(node_id), 1);
    }

    #[test]
    fn traverse_visits_pointer_field() {
        let mut reg = TypeRegistry::new();
        let leaf = reg.register(TypeDescriptor::new("Leaf", 8));
        let node = reg.register(
            TypeDescriptor::new("Node", 8).with_field(FieldDescriptor::pointer("next", 0, leaf)),
        );

        let mut target: u64 = 0;
        let target_ptr = &mut target as *mut u64 as *mut u8;
        let mut slot: *mut u8 = target_ptr;
        let base = &mut slot as *mut *mut u8 as *mut u8;

        let mut seen = Vec::new();
        unsafe {
            reg.traverse(node, base, &mut |obj, ptr| seen.push((obj, ptr)));
        }
        assert_eq!(seen, vec![(base, target_ptr)]);
    }

    #[test]
    fn traverse_skips_null_pointer() {
        let mut reg = TypeRegistry::new();
        let leaf = reg.register(TypeDescriptor::new("Leaf", 8));
        let node = reg.register(
            TypeDescriptor::new("Node", 8).with_field(FieldDescriptor::pointer("next", 0, leaf)),
        );

        let mut slot: *mut u8 = core::ptr::null_mut();
        let base = &mut slot as *mut *mut u8 as *mut u8;

        let mut seen = Vec::new();
        unsafe {
            reg.traverse(node, base, &mut |obj, ptr| seen.push((obj, ptr)));
        }
        assert!(seen.is_empty());
    }

    #[test]
    fn traverse_array_of_pointers() {
        let mut reg = TypeRegistry::new();
        let leaf = reg.register(TypeDescriptor::new("Leaf", 8));
        let list = reg.register(TypeDescriptor::new("List", 24).with_field(
            FieldDescriptor::array_of_pointers("items", 0, 8, 3, leaf),
        ));

        let mut a: u64 = 1;
        let mut b: u64 = 2;
        let mut slots: [*mut u8; 3] = [
            &mut a as *mut u64 as *mut u8,
            core::ptr::null_mut(),
            &mut b as *mut u64 as *mut u8,
        ];
        let base = slots.as_mut_ptr() as *mut u8;

        let mut seen = Vec::new();
        unsafe {
            reg.traverse(list, base, &mut |_, ptr| seen.push(ptr));
        }
        assert_eq!(seen, vec![slots[0], slots[2]]);
    }

    #[test]
    fn array_with_zero_count_is_not_traversed() {
        let mut reg = TypeRegistry::new();
        let leaf = reg.register(TypeDescriptor::new("Leaf", 8));
        let dynamic_list = reg.register(TypeDescriptor::new("DynList", 8).with_field(
            FieldDescriptor::array_of_pointers("items", 0, 8, 0, leaf),
        ));
        assert!(!reg.has_pointers(dynamic_list));
        assert_eq!(reg.count_pointers(dynamic_list), 0);
    }

    #[test]
    fn embedded_field_recurses() {
        let mut reg = TypeRegistry::new();
        let leaf = reg.register(TypeDescriptor::new("Leaf", 8));
        let inner = reg.register(
            TypeDescriptor::new("Inner", 8).with_field(FieldDescriptor::pointer("p", 0, leaf)),
        );
        let outer = reg.register(
            TypeDescriptor::new("Outer", 8).with_field(FieldDescriptor::embedded("inner", 0, inner)),
        );

        assert!(reg.has_pointers(outer));
        assert_eq!(reg.count_pointers(outer), 1);

        let mut target: u64 = 42;
        let mut slot: *mut u8 = &mut target as *mut u64 as *mut u8;
        let base = &mut slot as *mut *mut u8 as *mut u8;

        let mut seen = Vec::new();
        unsafe {
            reg.traverse(outer, base, &mut |_, ptr| seen.push(ptr));
        }
        assert_eq!(seen, vec![slot]);
    }
}

//! Field descriptors - the declarative vocabulary used to describe an
//! aggregate's layout to the registry.

use super::TypeId;

/// What an array field's elements are, for traversal purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayElement {
    /// Each element is itself a managed pointer.
    Pointer,
    /// Each element is an inline sub-aggregate of the named type.
    Embedded(TypeId),
}

impl ArrayElement {
    pub fn has_pointers(&self) -> bool {
        matches!(self, ArrayElement::Pointer)
            || matches!(self, ArrayElement::Embedded(_))
    }
}

/// The kind of one field within a [`super::TypeDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Opaque bytes; never traversed.
    Primitive,
    /// A single managed reference to another object. Expresses
    /// reachability only — it never owns the target's lifetime.
    Pointer { target: TypeId },
    /// A fixed-count inline array. `count == 0` means the array is
    /// dynamically sized and is never traversed.
    Array { element: ArrayElement, count: usize, element_size: usize },
    /// An opaque owned byte pointer (e.g. interned string data); not
    /// traversed as a managed reference.
    String,
    /// An inline sub-aggregate, traversed recursively.
    Embedded { target: TypeId },
}

impl FieldKind {
    pub fn has_pointers(&self) -> bool {
        match self {
            FieldKind::Primitive | FieldKind::String => false,
            FieldKind::Pointer { .. } => true,
            FieldKind::Array { element, count, .. } => *count > 0 && element.has_pointers(),
            FieldKind::Embedded { .. } => true,
        }
    }
}

/// One entry in a type's field table: a debug name, kind, byte offset, and
/// byte size.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub offset: usize,
    pub size: usize,
}

impl FieldDescriptor {
    pub fn primitive(name: impl Into<String>, offset: usize, size: usize) -> Self {
        Self { name: name.into(), kind: FieldKind::Primitive, offset, size }
    }

    pub fn pointer(name: impl Into<String>, offset: usize, target: TypeId) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Pointer { target },
            offset,
            size: core::mem::size_of::<*mut u8>(),
        }
    }

    pub fn string(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::String,
            offset,
            size: core::mem::size_of::<*mut u8>(),
        }
    }

    pub fn embedded(name: impl Into<String>, offset: usize, target: TypeId) -> Self {
        Self { name: name.into(), kind: FieldKind::Embedded { target }, offset, size: 0 }
    }

    pub fn array_of_pointers(
        name: impl Into<String>,
        offset: usize,
        element_size: usize,
        count: usize,
        _target: TypeId,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Array { element: ArrayElement::Pointer, count, element_size },
            offset,
            size: element_size * count,
        }
    }

    pub fn array_of_embedded(
        name: impl Into<String>,
        offset: usize,
        element_size: usize,
        count: usize,
        target: TypeId,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Array {
                element: ArrayElement::Embedded(target),
                count,
                element_size,
            },
            offset,
            size: element_size * count,
        }
    }
}

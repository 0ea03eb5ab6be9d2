//! RC object record: the standalone header every reference-counted
//! allocation carries ahead of its payload.

use crate::registry::{Destructor, TypeId};
use core::cell::Cell;
use core::ptr::NonNull;

/// Stamped at construction, cleared at destruction (§3, "RC-owned object").
/// Any word that doesn't match this is never treated as a live RC object.
pub(crate) const LIVE_MAGIC: u32 = 0x5243_4f42; // "RCOB"
const DEAD_MAGIC: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    White,
    Gray,
    Black,
}

/// One reference-counted object record. Never moved once constructed; all
/// mutable fields are `Cell` since mutation happens through shared
/// references the same way the GC header's fields do. `#[repr(C)]` so the
/// magic sentinel is guaranteed to sit at the object's base address, which
/// is what pointer validation reads (§4.3).
#[repr(C)]
pub(crate) struct RcObject {
    pub(crate) magic: Cell<u32>,
    pub(crate) strong: Cell<usize>,
    pub(crate) weak: Cell<usize>,
    pub(crate) internal_refs: Cell<usize>,
    pub(crate) type_id: Cell<Option<TypeId>>,
    pub(crate) color: Cell<Color>,
    pub(crate) scanned: Cell<bool>,
    pub(crate) in_buffer: Cell<bool>,
    pub(crate) buffer_next: Cell<*mut RcObject>,
    pub(crate) registry_next: Cell<*mut RcObject>,
    pub(crate) destructor: Option<Destructor>,
    pub(crate) payload: NonNull<u8>,
    pub(crate) payload_size: usize,
    pub(crate) payload_owned: bool,
}

impl RcObject {
    pub(crate) fn new(
        payload: NonNull<u8>,
        payload_size: usize,
        payload_owned: bool,
        type_id: Option<TypeId>,
        destructor: Option<Destructor>,
    ) -> Self {
        Self {
            magic: Cell::new(LIVE_MAGIC),
            strong: Cell::new(1),
            weak: Cell::new(0),
            internal_refs: Cell::new(0),
            type_id: Cell::new(type_id),
            color: Cell::new(Color::White),
            scanned: Cell::new(false),
            in_buffer: Cell::new(false),
            buffer_next: Cell::new(core::ptr::null_mut()),
            registry_next: Cell::new(core::ptr::null_mut()),
            destructor,
            payload,
            payload_size,
            payload_owned,
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.magic.get() == LIVE_MAGIC
    }

    pub(crate) fn mark_dead(&self) {
        self.magic.set(DEAD_MAGIC);
    }
}

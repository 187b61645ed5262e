//! Memory primops: `load`/`store`/
//! `enter`/`slot`/`alloc`/`global`/`map`/`unmap`/`lea`. These thread an
//! explicit `mem` operand through an otherwise-pure graph rather than
//! modeling memory as external mutable state.
//!
//! Grounded on `world.cpp`'s
//! `World::load`/`World::store`/`World::enter` bodies for the
//! forwarding/coalescing rules, and on `memmap_builtins.cpp` for the
//! device/address-space literal-or-diagnostic convention `map`/`unmap`
//! reuse here directly in the builder (the precedence bug itself lives
//! in the `memmap_builtins` *pass*, out of this kernel's scope —
//! `World::opt` just documents where it would sit in the pipeline).

use std::rc::Rc;

use if_chain::if_chain;
use log::warn;

use crate::def::{DefId, DefKind, Loc};
use crate::ty::{TypeId, TypeKind};
use crate::value::PrimBox;
use crate::world::World;

impl World {
    fn pointee_ty(&self, ptr: DefId) -> TypeId {
        match self.type_kind(self.ty_of(ptr)) {
            TypeKind::Pointer(referenced, _) => *referenced,
            other => panic!("expected a pointer operand, got {other:?}"),
        }
    }

    /// `load(mem, ptr)`. Result type is always
    /// `(Mem, pointee)` — the second element is the loaded value.
    pub fn load(&mut self, mem: DefId, ptr: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let pointee_ty = self.pointee_ty(ptr);
        let result_ty = self.intern_type(TypeKind::Tuple(vec![self.mem_ty(), pointee_ty]));

        if self.is_bottom(mem) || self.is_bottom(ptr) {
            return self.bottom(result_ty, loc, None);
        }

        // load(store(_, ptr, v), ptr) -> (store's input mem, v)
        if_chain! {
            if let DefKind::Store { mem: store_mem, ptr: store_ptr, val } = &self.def(mem).kind;
            if *store_ptr == ptr;
            then {
                let (store_mem, val) = (*store_mem, *val);
                return self.tuple(&[store_mem, val], loc, name);
            }
        }
        // an immutable global's pointer reads back its initializer.
        if let DefKind::Global { init, is_mutable: false } = &self.def(ptr).kind {
            let init = *init;
            return self.tuple(&[mem, init], loc, name);
        }

        // Repeated loads off the same (mem, ptr) coalesce for free:
        // `Load` is a `PureKey` variant, so `install` below already
        // returns the existing node.
        self.install(result_ty, DefKind::Load { mem, ptr }, loc, name.map(Rc::from))
    }

    /// `store(mem, ptr, v)`.
    pub fn store(&mut self, mem: DefId, ptr: DefId, val: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let mem_ty = self.mem_ty();
        if self.is_bottom(mem) || self.is_bottom(ptr) {
            return self.bottom(mem_ty, loc, None);
        }
        if self.is_bottom(val) {
            return mem;
        }

        // store(store(mem, ptr, _), ptr, val) -> store(mem, ptr, val):
        // the intervening store to the same location is dead.
        if_chain! {
            if let DefKind::Store { mem: inner_mem, ptr: inner_ptr, .. } = &self.def(mem).kind;
            if *inner_ptr == ptr;
            then {
                let inner_mem = *inner_mem;
                return self.store(inner_mem, ptr, val, loc, name);
            }
        }

        if let Some(id) = self.try_split_store_through_insert(mem, ptr, val, &loc, name) {
            return id;
        }

        // An identical re-store is just CSE: `Store` is a `PureKey`
        // variant, so `install` returns the existing def for free.
        self.install(mem_ty, DefKind::Store { mem, ptr, val }, loc, name.map(Rc::from))
    }

    /// If `val` is `insert(agg, idx, elem)` and the pointee type
    /// addresses its elements via `lea`, split the store of the whole
    /// aggregate into a store of the base aggregate plus a narrower
    /// store of just the changed element.
    fn try_split_store_through_insert(&mut self, mem: DefId, ptr: DefId, val: DefId, loc: &Loc, name: Option<&str>) -> Option<DefId> {
        let pointee_ty = self.pointee_ty(ptr);
        if_chain! {
            if matches!(
                self.type_kind(pointee_ty),
                TypeKind::Tuple(_) | TypeKind::Struct(..) | TypeKind::DefiniteArray(..) | TypeKind::IndefiniteArray(_)
            );
            if let DefKind::Insert { agg, idx, val: elem } = &self.def(val).kind;
            then {
                let (base_agg, idx, elem) = (*agg, *idx, *elem);
                let peeled = self.store(mem, ptr, base_agg, loc.clone(), None);
                let lea_ptr = self.lea(ptr, idx, loc.clone(), None);
                Some(self.store(peeled, lea_ptr, elem, loc.clone(), name))
            } else {
                None
            }
        }
    }

    /// `enter(mem)`: idempotent if `mem` already
    /// flows directly from an `Enter`.
    pub fn enter(&mut self, mem: DefId, loc: Loc, name: Option<&str>) -> DefId {
        if matches!(self.def(mem).kind, DefKind::Enter { .. }) {
            return mem;
        }
        let frame_ty = self.frame_ty();
        self.install(frame_ty, DefKind::Enter { mem }, loc, name.map(Rc::from))
    }

    /// `slot(type, frame, idx)`. No builder-side simplifications
    /// apply; distinct `idx`s on the same frame are distinct slots by
    /// construction.
    pub fn slot(&mut self, pointee_ty: TypeId, frame: DefId, idx: u32, loc: Loc, name: Option<&str>) -> DefId {
        let ty = self.ptr_ty(pointee_ty, 0);
        self.install(ty, DefKind::Slot { frame, idx }, loc, name.map(Rc::from))
    }

    /// `alloc(elem_ty, mem, extra)`: heap allocation, result type
    /// `(Mem, pointer-to-elem_ty)`.
    pub fn alloc(&mut self, elem_ty: TypeId, mem: DefId, extra: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let ptr_ty = self.ptr_ty(elem_ty, 0);
        let result_ty = self.intern_type(TypeKind::Tuple(vec![self.mem_ty(), ptr_ty]));
        if self.is_bottom(mem) {
            return self.bottom(result_ty, loc, None);
        }
        self.install(result_ty, DefKind::Alloc { mem, extra }, loc, name.map(Rc::from))
    }

    /// `global(init, is_mutable)`: a `Global`'s own type is a pointer
    /// to `init`'s type, so it can be used as a pointer directly.
    pub fn global(&mut self, init: DefId, is_mutable: bool, loc: Loc, name: Option<&str>) -> DefId {
        let init_ty = self.ty_of(init);
        let ty = self.ptr_ty(init_ty, 0);
        self.install(ty, DefKind::Global { init, is_mutable }, loc, name.map(Rc::from))
    }

    /// Convenience builder matching the original's
    /// `global_immutable_string`: interns the bytes as a `DefiniteArray`
    /// of `u8` literals (NUL-terminated) and wraps it in an immutable
    /// `global`.
    pub fn global_immutable_string(&mut self, s: &str, loc: Loc, name: Option<&str>) -> DefId {
        let bytes: Vec<DefId> = s.bytes()
            .chain(std::iter::once(0u8))
            .map(|b| self.literal(crate::value::BaseKind::U8, false, PrimBox::U8(b), loc.clone(), None))
            .collect();
        let arr = self.array(&bytes, loc.clone(), None);
        self.global(arr, false, loc, name)
    }

    fn coerce_literal_or_warn(&mut self, id: DefId, what: &str, loc: &Loc) -> DefId {
        if self.as_literal(id).is_some() {
            return id;
        }
        warn!(target: "thorin_ir::world", "{what} argument to map/unmap is not a literal; coercing to 0");
        self.literal(crate::value::BaseKind::U32, false, PrimBox::U32(0), loc.clone(), None)
    }

    /// `map(mem, ptr, device, addr_space, offset, size)`: a non-literal `device`/
    /// `addr_space` is logged and coerced rather than rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn map(&mut self, mem: DefId, ptr: DefId, device: DefId, addr_space: DefId, offset: DefId, size: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let device = self.coerce_literal_or_warn(device, "device", &loc);
        let addr_space = self.coerce_literal_or_warn(addr_space, "address-space", &loc);
        let pointee_ty = self.pointee_ty(ptr);
        let mapped_ptr_ty = self.ptr_ty(pointee_ty, 0);
        let result_ty = self.intern_type(TypeKind::Tuple(vec![self.mem_ty(), mapped_ptr_ty]));
        if self.is_bottom(mem) || self.is_bottom(ptr) {
            return self.bottom(result_ty, loc, None);
        }
        self.install(result_ty, DefKind::Map { mem, ptr, device, addr_space, offset, size }, loc, name.map(Rc::from))
    }

    /// `unmap(mem, ptr, device, addr_space)`.
    pub fn unmap(&mut self, mem: DefId, ptr: DefId, device: DefId, addr_space: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let device = self.coerce_literal_or_warn(device, "device", &loc);
        let addr_space = self.coerce_literal_or_warn(addr_space, "address-space", &loc);
        let mem_ty = self.mem_ty();
        if self.is_bottom(mem) || self.is_bottom(ptr) {
            return self.bottom(mem_ty, loc, None);
        }
        self.install(mem_ty, DefKind::Unmap { mem, ptr, device, addr_space }, loc, name.map(Rc::from))
    }

    fn lea_result_ty(&mut self, ptr: DefId, idx: DefId) -> TypeId {
        let pointee_ty = self.pointee_ty(ptr);
        let addr_space = match self.type_kind(self.ty_of(ptr)) {
            TypeKind::Pointer(_, addr_space) => *addr_space,
            _ => unreachable!("pointee_ty already asserted ptr is a Pointer"),
        };
        let elem_ty = match self.type_kind(pointee_ty) {
            TypeKind::Tuple(tys) => {
                let i = self.as_literal(idx).and_then(PrimBox::as_shift_amount)
                    .expect("lea into a tuple needs a literal index") as usize;
                tys[i]
            }
            TypeKind::Struct(_, tys) => {
                let i = self.as_literal(idx).and_then(PrimBox::as_shift_amount)
                    .expect("lea into a struct needs a literal index") as usize;
                tys[i]
            }
            TypeKind::DefiniteArray(elem, _) | TypeKind::IndefiniteArray(elem) => *elem,
            other => panic!("lea on a non-addressable pointee type {other:?}"),
        };
        self.ptr_ty(elem_ty, addr_space)
    }

    /// `lea(ptr, idx)` ("load effective address"): element-address
    /// arithmetic into an aggregate pointee, with no runtime memory
    /// effect of its own.
    pub fn lea(&mut self, ptr: DefId, idx: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let ty = self.lea_result_ty(ptr, idx);
        if self.is_bottom(ptr) {
            return self.bottom(ty, loc, None);
        }
        self.install(ty, DefKind::Lea { ptr, idx }, loc, name.map(Rc::from))
    }
}

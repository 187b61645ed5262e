//! Aggregate constructors and the partial-evaluation markers:
//! `tuple`/`array`/`vector`/`struct_agg`,
//! `extract`/`insert`/`select`, `run`/`hlt`.
//!
//! Grounded on `world.cpp`'s `World::extract`/`World::insert`/
//! `World::select` bodies, and on `memmap_builtins.cpp`'s use of
//! `extract_mem()`/`extract_mapped_ptr()` for the shape a tuple-typed
//! result ("mem, value" pairs) takes elsewhere in the builder.

use std::rc::Rc;

use crate::def::{DefId, DefKind, DefList, Loc};
use crate::ty::{StructTag, TypeId, TypeKind};
use crate::value::PrimBox;
use crate::world::World;

impl World {
    pub fn tuple(&mut self, elems: &[DefId], loc: Loc, name: Option<&str>) -> DefId {
        let tys: Vec<TypeId> = elems.iter().map(|&e| self.ty_of(e)).collect();
        let ty = self.intern_type(TypeKind::Tuple(tys));
        let elems: DefList = elems.iter().copied().collect();
        self.install(ty, DefKind::Tuple(elems), loc, name.map(Rc::from))
    }

    pub fn array(&mut self, elems: &[DefId], loc: Loc, name: Option<&str>) -> DefId {
        assert!(!elems.is_empty(), "array needs at least one element to infer its element type");
        let elem_ty = self.ty_of(elems[0]);
        let dim = u64::try_from(elems.len()).expect("array dimension overflow");
        let ty = self.intern_type(TypeKind::DefiniteArray(elem_ty, dim));
        let elems: DefList = elems.iter().copied().collect();
        self.install(ty, DefKind::Array(elems), loc, name.map(Rc::from))
    }

    pub fn vector_agg(&mut self, elems: &[DefId], loc: Loc, name: Option<&str>) -> DefId {
        assert!(!elems.is_empty(), "vector needs at least one lane");
        let elem_ty = self.ty_of(elems[0]);
        let len = u32::try_from(elems.len()).expect("vector length overflow");
        let ty = self.intern_type(TypeKind::Vector(elem_ty, len));
        let elems: DefList = elems.iter().copied().collect();
        self.install(ty, DefKind::VectorAgg(elems), loc, name.map(Rc::from))
    }

    pub fn struct_agg(&mut self, tag: StructTag, elems: &[DefId], loc: Loc, name: Option<&str>) -> DefId {
        let tys: Vec<TypeId> = elems.iter().map(|&e| self.ty_of(e)).collect();
        let ty = self.intern_type(TypeKind::Struct(tag.clone(), tys));
        let elems: DefList = elems.iter().copied().collect();
        self.install(ty, DefKind::StructAgg { tag, elems }, loc, name.map(Rc::from))
    }

    fn materialize_bottom_agg(&mut self, ty: TypeId, loc: &Loc) -> DefId {
        match self.type_kind(ty).clone() {
            TypeKind::Tuple(tys) => {
                let elems: Vec<DefId> = tys.iter().map(|&t| self.bottom(t, loc.clone(), None)).collect();
                self.tuple(&elems, loc.clone(), None)
            }
            TypeKind::Struct(tag, tys) => {
                let elems: Vec<DefId> = tys.iter().map(|&t| self.bottom(t, loc.clone(), None)).collect();
                self.struct_agg(tag, &elems, loc.clone(), None)
            }
            TypeKind::DefiniteArray(elem, dim) => {
                let elems: Vec<DefId> = (0..dim).map(|_| self.bottom(elem, loc.clone(), None)).collect();
                self.array(&elems, loc.clone(), None)
            }
            TypeKind::Vector(elem, len) => {
                let elems: Vec<DefId> = (0..len).map(|_| self.bottom(elem, loc.clone(), None)).collect();
                self.vector_agg(&elems, loc.clone(), None)
            }
            other => panic!("insert on a Bottom of non-aggregate type {other:?}"),
        }
    }

    fn extract_result_ty(&self, agg: DefId, idx: DefId) -> TypeId {
        match self.type_kind(self.ty_of(agg)) {
            TypeKind::Tuple(tys) => {
                let i = self.literal_index(idx).expect("extract from a tuple needs a literal index");
                tys[i]
            }
            TypeKind::Struct(_, tys) => {
                let i = self.literal_index(idx).expect("extract from a struct needs a literal index");
                tys[i]
            }
            TypeKind::DefiniteArray(elem, _) | TypeKind::IndefiniteArray(elem) | TypeKind::Vector(elem, _) => *elem,
            other => panic!("extract on non-aggregate type {other:?}"),
        }
    }

    fn literal_index(&self, idx: DefId) -> Option<usize> {
        self.as_literal(idx).and_then(PrimBox::as_shift_amount).map(|n| n as usize)
    }

    /// `extract(agg, idx)`.
    pub fn extract(&mut self, agg: DefId, idx: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let elem_ty = self.extract_result_ty(agg, idx);
        if self.is_bottom(agg) {
            return self.bottom(elem_ty, loc, None);
        }

        if let DefKind::Insert { agg: inner_agg, idx: inner_idx, val } = &self.def(agg).kind {
            let (inner_agg, inner_idx, val) = (*inner_agg, *inner_idx, *val);
            if let (Some(iv), Some(jv)) = (self.as_literal(inner_idx).copied(), self.as_literal(idx).copied()) {
                return if iv == jv { val } else { self.extract(inner_agg, idx, loc, name) };
            }
        }

        if let Some(i) = self.literal_index(idx) {
            let elems = match &self.def(agg).kind {
                DefKind::Tuple(e) | DefKind::Array(e) | DefKind::VectorAgg(e) => Some(e.clone()),
                DefKind::StructAgg { elems, .. } => Some(elems.clone()),
                _ => None,
            };
            if let Some(elems) = elems {
                if let Some(&e) = elems.get(i) {
                    return e;
                }
            }
        }

        self.install(elem_ty, DefKind::Extract { agg, idx }, loc, name.map(Rc::from))
    }

    /// `insert(agg, idx, v)`.
    pub fn insert(&mut self, agg: DefId, idx: DefId, val: DefId, loc: Loc, name: Option<&str>) -> DefId {
        if self.is_bottom(val) { return agg; }

        let agg_ty = self.ty_of(agg);
        let agg = if self.is_bottom(agg) { self.materialize_bottom_agg(agg_ty, &loc) } else { agg };

        if let Some(i) = self.literal_index(idx) {
            match self.def(agg).kind.clone() {
                DefKind::Tuple(mut elems) if i < elems.len() => { elems[i] = val; return self.install(agg_ty, DefKind::Tuple(elems), loc, name.map(Rc::from)); }
                DefKind::Array(mut elems) if i < elems.len() => { elems[i] = val; return self.install(agg_ty, DefKind::Array(elems), loc, name.map(Rc::from)); }
                DefKind::VectorAgg(mut elems) if i < elems.len() => { elems[i] = val; return self.install(agg_ty, DefKind::VectorAgg(elems), loc, name.map(Rc::from)); }
                DefKind::StructAgg { tag, mut elems } if i < elems.len() => { elems[i] = val; return self.install(agg_ty, DefKind::StructAgg { tag, elems }, loc, name.map(Rc::from)); }
                _ => {}
            }
        }

        self.install(agg_ty, DefKind::Insert { agg, idx, val }, loc, name.map(Rc::from))
    }

    fn as_not(&self, id: DefId) -> Option<DefId> {
        self.as_xor_allset(id).and_then(|(_, _, inner)| inner)
    }

    /// `select(c, a, b)`.
    pub fn select(&mut self, c: DefId, a: DefId, b: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let ty = self.ty_of(a);
        assert_eq!(ty, self.ty_of(b), "select arm type mismatch");

        if self.is_bottom(c) || self.is_bottom(a) || self.is_bottom(b) {
            return self.bottom(ty, loc, None);
        }
        if let Some(&cv) = self.as_literal(c) {
            return if cv.as_bool() { a } else { b };
        }
        if let Some(inner) = self.as_not(c) {
            return self.select(inner, b, a, loc, name);
        }
        if a == b { return a; }

        self.install(ty, DefKind::Select { c, a, b }, loc, name.map(Rc::from))
    }

    // ---- Partial-evaluation markers ------------------------------------

    /// `run(x)`: `run(hlt x) = hlt x`; `run(run x) = run x`.
    pub fn run(&mut self, x: DefId, loc: Loc, name: Option<&str>) -> DefId {
        if matches!(self.def(x).kind, DefKind::Hlt(_) | DefKind::Run(_)) { return x; }
        let ty = self.ty_of(x);
        self.install(ty, DefKind::Run(x), loc, name.map(Rc::from))
    }

    /// `hlt(x)`: dually, `hlt(run x) = run x`; `hlt(hlt x) = hlt x`.
    pub fn hlt(&mut self, x: DefId, loc: Loc, name: Option<&str>) -> DefId {
        if matches!(self.def(x).kind, DefKind::Hlt(_) | DefKind::Run(_)) { return x; }
        let ty = self.ty_of(x);
        self.install(ty, DefKind::Hlt(x), loc, name.map(Rc::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::ArithKind;
    use crate::value::{BaseKind, PrimKind};

    fn i32_lit(world: &mut World, n: i32) -> DefId {
        world.literal(BaseKind::I32, false, PrimBox::I32(n), Loc::unknown(), None)
    }

    #[test]
    fn s7_tuple_type_dedup_and_extract_index_zero() {
        let mut world = World::new("test");
        let a = i32_lit(&mut world, 1);
        let b = i32_lit(&mut world, 2);
        let t1 = world.tuple(&[a, b], Loc::unknown(), None);
        let t2 = world.tuple(&[a, b], Loc::unknown(), None);
        assert_eq!(t1, t2);

        let idx0 = i32_lit(&mut world, 0);
        let extracted = world.extract(t1, idx0, Loc::unknown(), None);
        assert_eq!(extracted, a);
    }

    #[test]
    fn extract_of_matching_insert_returns_the_inserted_value() {
        let mut world = World::new("test");
        let a = i32_lit(&mut world, 1);
        let b = i32_lit(&mut world, 2);
        let v = i32_lit(&mut world, 99);
        let idx0 = i32_lit(&mut world, 0);
        let t = world.tuple(&[a, b], Loc::unknown(), None);
        let inserted = world.insert(t, idx0, v, Loc::unknown(), None);
        let extracted = world.extract(inserted, idx0, Loc::unknown(), None);
        assert_eq!(extracted, v);
    }

    #[test]
    fn select_with_literal_condition_picks_an_arm() {
        let mut world = World::new("test");
        let a = i32_lit(&mut world, 1);
        let b = i32_lit(&mut world, 2);
        let bool_ty = world.prim_ty(PrimKind::precise(BaseKind::Bool), 1);
        let t = world.install(bool_ty, DefKind::Literal(PrimBox::Bool(true)), Loc::unknown(), None);
        let chosen = world.select(t, a, b, Loc::unknown(), None);
        assert_eq!(chosen, a);
    }

    #[test]
    fn select_same_arms_collapses() {
        let mut world = World::new("test");
        let a = i32_lit(&mut world, 1);
        let fn_ty = world.fn_ty(vec![]);
        let lambda = world.lambda(fn_ty, Loc::unknown(), Default::default(), Default::default(), None);
        let bool_ty = world.prim_ty(PrimKind::precise(BaseKind::Bool), 1);
        let c = world.param(bool_ty, lambda, 0, Loc::unknown(), None);
        let chosen = world.select(c, a, a, Loc::unknown(), None);
        assert_eq!(chosen, a);
    }

    #[test]
    fn run_of_hlt_collapses_to_hlt() {
        let mut world = World::new("test");
        let x = i32_lit(&mut world, 7);
        let h = world.hlt(x, Loc::unknown(), None);
        let r = world.run(h, Loc::unknown(), None);
        assert_eq!(r, h);
        assert!(matches!(world.def(r).kind, DefKind::Hlt(_)));
    }

    #[test]
    fn insert_of_a_bottom_value_into_a_bottom_agg_stays_bottom() {
        let mut world = World::new("test");
        let elem_ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        let tup_ty = world.intern_type(TypeKind::Tuple(vec![elem_ty, elem_ty]));
        let agg = world.bottom(tup_ty, Loc::unknown(), None);
        let idx0 = i32_lit(&mut world, 0);
        let val = world.bottom(elem_ty, Loc::unknown(), None);
        let result = world.insert(agg, idx0, val, Loc::unknown(), None);
        assert!(world.is_bottom(result));
    }

    #[test]
    fn insert_of_a_bottom_value_into_a_concrete_agg_returns_the_agg_unchanged() {
        let mut world = World::new("test");
        let a = i32_lit(&mut world, 1);
        let b = i32_lit(&mut world, 2);
        let t = world.tuple(&[a, b], Loc::unknown(), None);
        let idx0 = i32_lit(&mut world, 0);
        let elem_ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        let val = world.bottom(elem_ty, Loc::unknown(), None);
        let result = world.insert(t, idx0, val, Loc::unknown(), None);
        assert_eq!(result, t);
    }

    #[test]
    fn arith_kind_is_used() {
        // keeps the ArithKind import meaningful if agg-only tests drift
        assert!(ArithKind::Add.is_commutative());
    }
}

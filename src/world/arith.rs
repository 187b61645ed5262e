//! `arithop`, `cmp`, `cast`, `bitcast` — the arithmetic and comparison
//! rule families, the densest part of the builder.
//!
//! Grounded on `world.cpp`'s
//! `World::arithop`/`World::cmp`/`World::convert` bodies: same order
//! of attempts (splat, fold, commute, identities, associate, `cse`),
//! reproduced as one Rust function per attempt instead of one giant
//! `switch`.

use std::rc::Rc;

use crate::def::{ArithKind, CmpKind, DefId, DefKind, Loc};
use crate::ty::TypeKind;
use crate::value::PrimBox;
use crate::world::World;

impl World {
    /// `arithop(kind, a, b, type)`.
    pub fn arithop(&mut self, kind: ArithKind, a: DefId, b: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let ty = self.ty_of(a);
        assert_eq!(ty, self.ty_of(b), "arithop operand type mismatch");

        if let Some(id) = self.arith_vector_splat(kind, a, b, ty, &loc, name) {
            return id;
        }
        if let Some(id) = self.arith_fold(kind, a, b, ty) {
            return id;
        }
        let (a, b) = self.arith_commute(kind, a, b);
        if let Some(id) = self.arith_identities(kind, a, b, ty, &loc, name) {
            return id;
        }
        let (a, b) = self.arith_associate(kind, a, b, ty);

        self.install(ty, DefKind::ArithOp { kind, a, b }, loc, name.map(Rc::from))
    }

    fn arith_vector_splat(&mut self, kind: ArithKind, a: DefId, b: DefId, ty: TypeId, loc: &Loc, name: Option<&str>) -> Option<DefId> {
        let (a_elems, b_elems) = match (&self.def(a).kind, &self.def(b).kind) {
            (DefKind::VectorAgg(ae), DefKind::VectorAgg(be)) if ae.len() == be.len() => (ae.clone(), be.clone()),
            _ => return None,
        };
        let elems: Vec<DefId> = a_elems.iter().zip(b_elems.iter())
            .map(|(&ea, &eb)| self.arithop(kind, ea, eb, loc.clone(), name))
            .collect();
        Some(self.vector_agg(&elems, loc.clone(), name))
    }

    fn arith_fold(&mut self, kind: ArithKind, a: DefId, b: DefId, ty: TypeId) -> Option<DefId> {
        let (av, bv) = match (self.as_literal(a), self.as_literal(b)) {
            (Some(av), Some(bv)) => (*av, *bv),
            _ => return None,
        };
        // `shl`/`shr` by a literal shift amount at/over bitwidth is
        // `Bottom` unconditionally, so it is
        // checked here even though this function's other arms only
        // fire when *both* operands are literal — the general version
        // of that rule lives in `arith_identities`.
        let quick = matches!(self.type_kind(ty), TypeKind::Primitive(k, _) if k.quick);
        let result = match kind {
            ArithKind::Add => av.add(&bv, quick), ArithKind::Sub => av.sub(&bv, quick),
            ArithKind::Mul => av.mul(&bv, quick), ArithKind::Div => av.div(&bv, quick),
            ArithKind::Rem => av.rem(&bv, quick),
            ArithKind::And => Some(av.bitand(&bv)), ArithKind::Or => Some(av.bitor(&bv)), ArithKind::Xor => Some(av.bitxor(&bv)),
            ArithKind::Shl => av.shl(&bv), ArithKind::Shr => av.shr(&bv),
            ArithKind::FAdd => Some(av.fadd(&bv)), ArithKind::FSub => Some(av.fsub(&bv)),
            ArithKind::FMul => Some(av.fmul(&bv)), ArithKind::FDiv => Some(av.fdiv(&bv)),
        };
        Some(match result {
            Some(v) => self.install(ty, DefKind::Literal(v), Loc::unknown(), None),
            None => self.install(ty, DefKind::Bottom, Loc::unknown(), None),
        })
    }

    /// Step 3: for commutative ops, canonicalize so a literal/vector
    /// right operand moves to the left.
    fn arith_commute(&self, kind: ArithKind, a: DefId, b: DefId) -> (DefId, DefId) {
        if !kind.is_commutative() { return (a, b); }
        if self.is_literal_or_vector(b) && !self.is_literal_or_vector(a) { (b, a) } else { (a, b) }
    }

    fn is_literal_or_vector(&self, id: DefId) -> bool {
        matches!(self.def(id).kind, DefKind::Literal(_) | DefKind::VectorAgg(_))
    }

    #[allow(clippy::too_many_lines)]
    fn arith_identities(&mut self, kind: ArithKind, a: DefId, b: DefId, ty: TypeId, loc: &Loc, name: Option<&str>) -> Option<DefId> {
        if kind.is_float() { return None; }
        let base = match self.type_kind(ty) { TypeKind::Primitive(k, _) => k.base, _ => return None };

        // `shl`/`shr` with a literal shift amount >= bitwidth is Bottom
        // regardless of whether `a` is a literal.
        if matches!(kind, ArithKind::Shl | ArithKind::Shr) {
            if let Some(shift) = self.as_literal(b).and_then(PrimBox::as_shift_amount) {
                if shift >= u64::from(base.bits()) {
                    return Some(self.install(ty, DefKind::Bottom, loc.clone(), None));
                }
            }
        }

        if a == b {
            return match kind {
                ArithKind::Add => Some(self.mul_by_two(a, ty, loc, name)),
                ArithKind::Sub | ArithKind::Xor => Some(self.zero_literal(base, ty, loc, name)),
                ArithKind::And | ArithKind::Or => Some(a),
                ArithKind::Div => Some(if self.is_zero_def(a) { self.bottom(ty, loc.clone(), None) } else { self.one_literal(base, ty, loc, name) }),
                ArithKind::Rem => Some(if self.is_zero_def(a) { self.bottom(ty, loc.clone(), None) } else { self.zero_literal(base, ty, loc, name) }),
                _ => None,
            };
        }

        if self.is_zero_def(a) {
            return match kind {
                ArithKind::Mul | ArithKind::Div | ArithKind::Rem | ArithKind::And | ArithKind::Shl | ArithKind::Shr => Some(self.zero_literal(base, ty, loc, name)),
                ArithKind::Add | ArithKind::Or | ArithKind::Xor => Some(b),
                _ => None,
            };
        }
        if self.is_one_def(a) && kind == ArithKind::Mul { return Some(b); }
        if self.is_allset_def(a) {
            return match kind { ArithKind::And => Some(b), ArithKind::Or => Some(a), _ => None };
        }
        if self.is_zero_def(b) {
            return match kind {
                ArithKind::Div | ArithKind::Rem => Some(self.bottom(ty, loc.clone(), None)),
                ArithKind::Shl | ArithKind::Shr => Some(a),
                _ => None,
            };
        }
        if self.is_one_def(b) {
            return match kind {
                ArithKind::Mul | ArithKind::Div => Some(a),
                ArithKind::Rem => Some(self.zero_literal(base, ty, loc, name)),
                _ => None,
            };
        }

        // `xor(allset, x)` is logical "not".
        if kind == ArithKind::Xor && self.is_allset_def(a) {
            if let Some((inner_kind, inner_a, inner_b)) = self.as_xor_allset(b) {
                let _ = inner_kind;
                return Some(inner_b.unwrap_or(inner_a)); // not(not x) -> x
            }
            if let DefKind::Cmp { kind: ck, a: ca, b: cb } = &self.def(b).kind {
                let (neg, swap) = ck.negate();
                let (na, nb) = if swap { (*cb, *ca) } else { (*ca, *cb) };
                return Some(self.cmp(neg, na, nb, loc.clone(), name));
            }
            return None;
        }

        if let (ArithKind::Or | ArithKind::And, true) = (kind, self.is_complementary_cmp_pair(a, b)) {
            let is_true = kind == ArithKind::Or;
            return Some(self.bool_literal(is_true, loc, name));
        }

        if let Some(id) = self.arith_distribute(kind, a, b, loc, name) {
            return Some(id);
        }
        if let Some(id) = self.arith_absorb(kind, a, b) {
            return Some(id);
        }
        if let Some(id) = self.arith_merge_siblings(kind, a, b, loc, name) {
            return Some(id);
        }

        None
    }

    /// Recognizes `id` as `ArithOp { kind, a, b }` for the given `kind`
    /// and returns its two operands.
    fn as_arith(&self, id: DefId, kind: ArithKind) -> Option<(DefId, DefId)> {
        match &self.def(id).kind {
            DefKind::ArithOp { kind: k, a, b } if *k == kind => Some((*a, *b)),
            _ => None,
        }
    }

    /// `(a∧b)∨(a∧c) → a∧(b∨c)`, dually `(a∨b)∧(a∨c) → a∨(b∧c)`.
    fn arith_distribute(&mut self, kind: ArithKind, a: DefId, b: DefId, loc: &Loc, name: Option<&str>) -> Option<DefId> {
        let (inner, outer) = match kind {
            ArithKind::Or => (ArithKind::And, ArithKind::Or),
            ArithKind::And => (ArithKind::Or, ArithKind::And),
            _ => return None,
        };
        let (la, lb) = self.as_arith(a, inner)?;
        let (ra, rb) = self.as_arith(b, inner)?;
        if la == ra {
            let merged = self.arithop(outer, lb, rb, loc.clone(), name);
            return Some(self.arithop(inner, la, merged, loc.clone(), name));
        }
        if lb == rb {
            let merged = self.arithop(outer, la, ra, loc.clone(), name);
            return Some(self.arithop(inner, lb, merged, loc.clone(), name));
        }
        None
    }

    /// `a∧(a∨b) → a`; `a∨(a∧b) → a`.
    fn arith_absorb(&self, kind: ArithKind, a: DefId, b: DefId) -> Option<DefId> {
        let inner = match kind {
            ArithKind::And => ArithKind::Or,
            ArithKind::Or => ArithKind::And,
            _ => return None,
        };
        if let Some((x, y)) = self.as_arith(b, inner) {
            if a == x || a == y { return Some(a); }
        }
        if let Some((x, y)) = self.as_arith(a, inner) {
            if b == x || b == y { return Some(b); }
        }
        None
    }

    /// Same commutative op on both sides sharing an operand:
    /// `(x∨y)∨(x∨z) → x∨(y∨z)`, dually for `∧`.
    fn arith_merge_siblings(&mut self, kind: ArithKind, a: DefId, b: DefId, loc: &Loc, name: Option<&str>) -> Option<DefId> {
        if !matches!(kind, ArithKind::And | ArithKind::Or) { return None; }
        let (la, lb) = self.as_arith(a, kind)?;
        let (ra, rb) = self.as_arith(b, kind)?;
        if la == ra {
            let merged = self.arithop(kind, lb, rb, loc.clone(), name);
            return Some(self.arithop(kind, la, merged, loc.clone(), name));
        }
        if lb == rb {
            let merged = self.arithop(kind, la, ra, loc.clone(), name);
            return Some(self.arithop(kind, lb, merged, loc.clone(), name));
        }
        None
    }

    /// Recognizes `b` as `xor(allset, inner)` and returns `inner`
    /// wrapped so the caller can special-case a direct double-not.
    /// `pub(crate)`: also used by `world::agg`'s `select` to recognize
    /// `select(not c, a, b) = select(c, b, a)`.
    pub(crate) fn as_xor_allset(&self, id: DefId) -> Option<(ArithKind, DefId, Option<DefId>)> {
        match &self.def(id).kind {
            DefKind::ArithOp { kind: ArithKind::Xor, a, b } if self.is_allset_def(*a) => Some((ArithKind::Xor, *a, Some(*b))),
            DefKind::ArithOp { kind: ArithKind::Xor, a, b } if self.is_allset_def(*b) => Some((ArithKind::Xor, *b, Some(*a))),
            _ => None,
        }
    }

    fn is_complementary_cmp_pair(&self, a: DefId, b: DefId) -> bool {
        let (DefKind::Cmp { kind: ka, a: xa, b: ya }, DefKind::Cmp { kind: kb, a: xb, b: yb }) = (&self.def(a).kind, &self.def(b).kind) else { return false };
        let (neg, swap) = ka.negate();
        if neg != *kb { return false; }
        if swap { *xa == *yb && *ya == *xb } else { *xa == *xb && *ya == *yb }
    }

    /// Step 5: for associative integer ops, if `b` is itself the same
    /// op with a literal leaf, fold that leaf into `a` eagerly so
    /// chained constant arithmetic converges to one canonical literal
    /// plus a symbolic remainder (e.g. `3 + (4 + x) -> 7 + x`).
    fn arith_associate(&mut self, kind: ArithKind, a: DefId, b: DefId, ty: TypeId) -> (DefId, DefId) {
        if !kind.is_integer_associative() { return (a, b); }
        let Some(av) = self.as_literal(a).copied() else { return (a, b) };
        let (bk, ba, bb) = match &self.def(b).kind {
            DefKind::ArithOp { kind: bk, a: ba, b: bb } => (*bk, *ba, *bb),
            _ => return (a, b),
        };
        if bk != kind { return (a, b); }
        if let Some(bav) = self.as_literal(ba).copied() {
            let folded = self.fold_same_op(kind, av, bav, ty);
            return (folded, bb);
        }
        (a, b)
    }

    fn fold_same_op(&mut self, kind: ArithKind, av: PrimBox, bv: PrimBox, ty: TypeId) -> DefId {
        let quick = matches!(self.type_kind(ty), TypeKind::Primitive(k, _) if k.quick);
        let result = match kind {
            ArithKind::Add => av.add(&bv, quick), ArithKind::Mul => av.mul(&bv, quick),
            ArithKind::And => Some(av.bitand(&bv)), ArithKind::Or => Some(av.bitor(&bv)), ArithKind::Xor => Some(av.bitxor(&bv)),
            _ => unreachable!("fold_same_op only called for integer-associative kinds"),
        };
        match result {
            Some(v) => self.install(ty, DefKind::Literal(v), Loc::unknown(), None),
            None => self.install(ty, DefKind::Bottom, Loc::unknown(), None),
        }
    }

    fn is_zero_def(&self, id: DefId) -> bool { self.as_literal(id).is_some_and(PrimBox::is_zero) }
    fn is_one_def(&self, id: DefId) -> bool { self.as_literal(id).is_some_and(PrimBox::is_one) }
    fn is_allset_def(&self, id: DefId) -> bool { self.as_literal(id).is_some_and(PrimBox::is_allset) }

    fn zero_literal(&mut self, base: crate::value::BaseKind, ty: TypeId, loc: &Loc, name: Option<&str>) -> DefId {
        self.install(ty, DefKind::Literal(PrimBox::zero_of(base)), loc.clone(), name.map(Rc::from))
    }
    fn one_literal(&mut self, base: crate::value::BaseKind, ty: TypeId, loc: &Loc, name: Option<&str>) -> DefId {
        self.install(ty, DefKind::Literal(PrimBox::one_of(base)), loc.clone(), name.map(Rc::from))
    }
    fn mul_by_two(&mut self, a: DefId, ty: TypeId, loc: &Loc, name: Option<&str>) -> DefId {
        let base = match self.type_kind(ty) { TypeKind::Primitive(k, _) => k.base, _ => unreachable!() };
        let two = self.install(ty, DefKind::Literal(PrimBox::one_of(base).add(&PrimBox::one_of(base), true).unwrap()), Loc::unknown(), None);
        self.arithop(ArithKind::Mul, two, a, loc.clone(), name)
    }
    fn bool_literal(&mut self, v: bool, loc: &Loc, name: Option<&str>) -> DefId {
        let bool_ty = self.prim_ty(crate::value::PrimKind::precise(crate::value::BaseKind::Bool), 1);
        self.install(bool_ty, DefKind::Literal(PrimBox::Bool(v)), loc.clone(), name.map(Rc::from))
    }

    // ---- Compare -------------------------------------------------------

    /// `cmp(kind, a, b)`. `>`/`≥` are normalized to `<`/`≤` with
    /// swapped operands first, so a [`Def`] never stores anything but
    /// `Eq`/`Ne`/`Lt`/`Le`.
    pub fn cmp(&mut self, kind: CmpKind, a: DefId, b: DefId, loc: Loc, name: Option<&str>) -> DefId {
        let (kind, swap) = kind.normalize();
        let (a, b) = if swap { (b, a) } else { (a, b) };

        let bool_ty = self.prim_ty(crate::value::PrimKind::precise(crate::value::BaseKind::Bool), 1);
        assert_eq!(self.ty_of(a), self.ty_of(b), "cmp operand type mismatch");

        if let (DefKind::VectorAgg(ae), DefKind::VectorAgg(be)) = (&self.def(a).kind, &self.def(b).kind) {
            if ae.len() == be.len() {
                let (ae, be) = (ae.clone(), be.clone());
                let elems: Vec<DefId> = ae.iter().zip(be.iter()).map(|(&x, &y)| self.cmp(kind, x, y, loc.clone(), name)).collect();
                return self.vector_agg(&elems, loc, name);
            }
        }

        if let (Some(av), Some(bv)) = (self.as_literal(a).copied(), self.as_literal(b).copied()) {
            let v = match kind {
                CmpKind::Eq => av.eq(&bv), CmpKind::Ne => av.ne(&bv),
                CmpKind::Lt => av.lt(&bv), CmpKind::Le => av.le(&bv),
                CmpKind::Gt | CmpKind::Ge => unreachable!("normalize() already folds Gt/Ge away"),
            };
            return self.install(bool_ty, DefKind::Literal(PrimBox::Bool(v)), loc, name.map(Rc::from));
        }

        if a == b {
            let v = matches!(kind, CmpKind::Le | CmpKind::Eq);
            return self.install(bool_ty, DefKind::Literal(PrimBox::Bool(v)), loc, name.map(Rc::from));
        }

        self.install(bool_ty, DefKind::Cmp { kind, a, b }, loc, name.map(Rc::from))
    }

    // ---- Cast / Bitcast -------------------------------------------------

    pub fn cast(&mut self, target_ty: TypeId, x: DefId, loc: Loc, name: Option<&str>) -> DefId {
        if let DefKind::VectorAgg(elems) = &self.def(x).kind {
            let elems = elems.clone();
            let target_elem = match self.type_kind(target_ty) {
                TypeKind::Vector(target_elem, _) => *target_elem,
                _ => return self.install(target_ty, DefKind::Cast { x }, loc, name.map(Rc::from)),
            };
            let casted: Vec<DefId> = elems.iter().map(|&e| self.cast(target_elem, e, loc.clone(), name)).collect();
            return self.vector_agg(&casted, loc, name);
        }
        if let Some(&lit) = self.as_literal(x) {
            let target_kind = match self.type_kind(target_ty) {
                TypeKind::Primitive(target_kind, _) => *target_kind,
                _ => return self.install(target_ty, DefKind::Cast { x }, loc, name.map(Rc::from)),
            };
            let casted = lit.cast_to(target_kind.base);
            return self.install(target_ty, DefKind::Literal(casted), loc, name.map(Rc::from));
        }
        self.install(target_ty, DefKind::Cast { x }, loc, name.map(Rc::from))
    }

    pub fn bitcast(&mut self, target_ty: TypeId, x: DefId, loc: Loc, name: Option<&str>) -> DefId {
        // Same-typed `bitcast` of a `bitcast` collapses.
        if let DefKind::Bitcast { x: inner } = &self.def(x).kind {
            let inner = *inner;
            if self.ty_of(inner) == target_ty {
                return inner;
            }
        }
        let is_ptr_to_ptr = matches!(self.type_kind(target_ty), TypeKind::Pointer(..)) && matches!(self.type_kind(self.ty_of(x)), TypeKind::Pointer(..));
        if !is_ptr_to_ptr {
            // Everything else that isn't pointer<->pointer goes
            // through the numeric `cast` path instead.
            return self.cast(target_ty, x, loc, name);
        }
        self.install(target_ty, DefKind::Bitcast { x }, loc, name.map(Rc::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{CallingConv, Intrinsic};
    use crate::value::{BaseKind, PrimKind};

    fn i32_world() -> (World, TypeId) {
        let mut world = World::new("test");
        let ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        (world, ty)
    }

    #[test]
    fn s1_add_zero_is_identity() {
        let (mut world, ty) = i32_world();
        let x = world.install(ty, DefKind::Param { lambda: DefId::from_u32(999), index: 0 }, Loc::unknown(), None);
        let zero = world.literal(BaseKind::I32, false, PrimBox::I32(0), Loc::unknown(), None);
        let sum = world.arithop(ArithKind::Add, x, zero, Loc::unknown(), None);
        assert_eq!(sum, x);
    }

    #[test]
    fn s2_nested_literal_arith_is_one_literal() {
        let (mut world, ty) = i32_world();
        let _ = ty;
        let three = world.literal(BaseKind::I32, false, PrimBox::I32(3), Loc::unknown(), None);
        let four = world.literal(BaseKind::I32, false, PrimBox::I32(4), Loc::unknown(), None);
        let two = world.literal(BaseKind::I32, false, PrimBox::I32(2), Loc::unknown(), None);
        let five = world.literal(BaseKind::I32, false, PrimBox::I32(5), Loc::unknown(), None);
        let lhs = world.arithop(ArithKind::Add, three, four, Loc::unknown(), None);
        let rhs = world.arithop(ArithKind::Add, two, five, Loc::unknown(), None);
        let prod = world.arithop(ArithKind::Mul, lhs, rhs, Loc::unknown(), None);
        assert_eq!(world.as_literal(prod), Some(&PrimBox::I32(49)));
        assert!(world.iter_defs().all(|d| !matches!(d.kind, DefKind::ArithOp { .. })));
    }

    #[test]
    fn s3_div_by_literal_zero_is_bottom() {
        let (mut world, ty) = i32_world();
        let y = world.install(ty, DefKind::Param { lambda: DefId::from_u32(999), index: 1 }, Loc::unknown(), None);
        let zero = world.literal(BaseKind::I32, false, PrimBox::I32(0), Loc::unknown(), None);
        let result = world.arithop(ArithKind::Div, y, zero, Loc::unknown(), None);
        assert!(world.is_bottom(result));
    }

    #[test]
    fn s4_swapped_cmp_gt_lt_share_a_handle() {
        let (mut world, ty) = i32_world();
        let a = world.install(ty, DefKind::Param { lambda: DefId::from_u32(998), index: 0 }, Loc::unknown(), None);
        let b = world.install(ty, DefKind::Param { lambda: DefId::from_u32(998), index: 1 }, Loc::unknown(), None);
        // cmp(Gt, a, b) normalizes to cmp(Lt, b, a) internally.
        let gt_as_lt = world.cmp(CmpKind::Gt, a, b, Loc::unknown(), None);
        let lt = world.cmp(CmpKind::Lt, b, a, Loc::unknown(), None);
        assert_eq!(gt_as_lt, lt);
    }

    #[test]
    fn not_not_x_is_x() {
        let (mut world, ty) = i32_world();
        let x = world.install(ty, DefKind::Param { lambda: DefId::from_u32(997), index: 0 }, Loc::unknown(), None);
        let allset = world.literal(BaseKind::I32, false, PrimBox::allset_of(BaseKind::I32), Loc::unknown(), None);
        let not_x = world.arithop(ArithKind::Xor, allset, x, Loc::unknown(), None);
        let not_not_x = world.arithop(ArithKind::Xor, allset, not_x, Loc::unknown(), None);
        assert_eq!(not_not_x, x);
    }

    #[test]
    fn distributes_and_over_or_on_shared_operand() {
        let (mut world, ty) = i32_world();
        let a = world.install(ty, DefKind::Param { lambda: DefId::from_u32(996), index: 0 }, Loc::unknown(), None);
        let b = world.install(ty, DefKind::Param { lambda: DefId::from_u32(996), index: 1 }, Loc::unknown(), None);
        let c = world.install(ty, DefKind::Param { lambda: DefId::from_u32(996), index: 2 }, Loc::unknown(), None);
        let a_and_b = world.arithop(ArithKind::And, a, b, Loc::unknown(), None);
        let a_and_c = world.arithop(ArithKind::And, a, c, Loc::unknown(), None);
        let got = world.arithop(ArithKind::Or, a_and_b, a_and_c, Loc::unknown(), None);

        let b_or_c = world.arithop(ArithKind::Or, b, c, Loc::unknown(), None);
        let want = world.arithop(ArithKind::And, a, b_or_c, Loc::unknown(), None);
        assert_eq!(got, want);
    }

    #[test]
    fn absorbs_a_and_a_or_b_into_a() {
        let (mut world, ty) = i32_world();
        let a = world.install(ty, DefKind::Param { lambda: DefId::from_u32(995), index: 0 }, Loc::unknown(), None);
        let b = world.install(ty, DefKind::Param { lambda: DefId::from_u32(995), index: 1 }, Loc::unknown(), None);
        let a_or_b = world.arithop(ArithKind::Or, a, b, Loc::unknown(), None);
        let got = world.arithop(ArithKind::And, a, a_or_b, Loc::unknown(), None);
        assert_eq!(got, a);
    }

    #[test]
    fn merges_same_op_siblings_keeping_the_shared_operand() {
        let (mut world, ty) = i32_world();
        let x = world.install(ty, DefKind::Param { lambda: DefId::from_u32(994), index: 0 }, Loc::unknown(), None);
        let y = world.install(ty, DefKind::Param { lambda: DefId::from_u32(994), index: 1 }, Loc::unknown(), None);
        let z = world.install(ty, DefKind::Param { lambda: DefId::from_u32(994), index: 2 }, Loc::unknown(), None);
        let x_or_y = world.arithop(ArithKind::Or, x, y, Loc::unknown(), None);
        let x_or_z = world.arithop(ArithKind::Or, x, z, Loc::unknown(), None);
        let got = world.arithop(ArithKind::Or, x_or_y, x_or_z, Loc::unknown(), None);

        let y_or_z = world.arithop(ArithKind::Or, y, z, Loc::unknown(), None);
        let want = world.arithop(ArithKind::Or, x, y_or_z, Loc::unknown(), None);
        assert_eq!(got, want);
    }

    #[test]
    fn lambda_smoke_for_cc_and_intrinsic_plumbing() {
        let (mut world, ty) = i32_world();
        let fn_ty = world.fn_ty(vec![ty]);
        let l = world.lambda(fn_ty, Loc::unknown(), CallingConv::C, Intrinsic::BRANCH, Some("br"));
        assert!(world.def(l).as_lambda().unwrap().intrinsic.contains(Intrinsic::BRANCH));
    }
}

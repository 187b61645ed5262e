//! Structural hashing/equality for pure primops:
//! the `cse` half of "unification and CSE". The `unify` half lives in
//! [`crate::ty::TypeInterner`]; this is kept separate because pure
//! defs also need use-list bookkeeping and mark-sweep cleanup that
//! types never do.
//!
//! Grounded the same way `build_vcode.rs` keys its `VReg`
//! deduplication maps off of a struct mirroring the operand shape
//! rather than the whole instruction: [`PureKey`] copies just the
//! `(kind, type, operand-gids…)` tuple the canonical set is hashed by,
//! leaving [`crate::def::Def`] itself free of any `Hash`/`Eq` bound (it
//! owns a use-list and a `Loc`, neither of which is part of the key).

use hashbrown::HashMap;

use crate::def::{ArithKind, CmpKind, Def, DefId, DefKind, DefList};
use crate::ty::{StructTag, TypeId};
use crate::value::PrimBox;

/// The `(kind, type, operand-gids…)` tuple pure defs are deduplicated
/// on. `Lambda` and `Param` have no [`PureKey`] — they are excluded
/// from invariant 1 and managed by identity / by their
/// owning lambda's parameter list instead.
#[derive(Clone, PartialEq, Eq, Hash)]
enum PureKey {
    Literal(TypeId, PrimBox),
    Bottom(TypeId),
    ArithOp(TypeId, ArithKind, DefId, DefId),
    Cmp(TypeId, CmpKind, DefId, DefId),
    Cast(TypeId, DefId),
    Bitcast(TypeId, DefId),
    Extract(TypeId, DefId, DefId),
    Insert(TypeId, DefId, DefId, DefId),
    Select(TypeId, DefId, DefId, DefId),
    Tuple(TypeId, DefList),
    VectorAgg(TypeId, DefList),
    Array(TypeId, DefList),
    StructAgg(TypeId, StructTag, DefList),
    Run(TypeId, DefId),
    Hlt(TypeId, DefId),
    Load(TypeId, DefId, DefId),
    Store(TypeId, DefId, DefId, DefId),
    Enter(TypeId, DefId),
    Slot(TypeId, DefId, u32),
    Alloc(TypeId, DefId, DefId),
    Global(TypeId, DefId, bool),
    Map(TypeId, DefId, DefId, DefId, DefId, DefId, DefId),
    Unmap(TypeId, DefId, DefId, DefId, DefId),
    Lea(TypeId, DefId, DefId),
}

impl PureKey {
    fn from_kind(ty: TypeId, kind: &DefKind) -> Option<Self> {
        Some(match *kind {
            DefKind::Literal(b) => PureKey::Literal(ty, b),
            DefKind::Bottom => PureKey::Bottom(ty),
            DefKind::Param { .. } | DefKind::Lambda(_) => return None,
            DefKind::ArithOp { kind, a, b } => PureKey::ArithOp(ty, kind, a, b),
            DefKind::Cmp { kind, a, b } => PureKey::Cmp(ty, kind, a, b),
            DefKind::Cast { x } => PureKey::Cast(ty, x),
            DefKind::Bitcast { x } => PureKey::Bitcast(ty, x),
            DefKind::Extract { agg, idx } => PureKey::Extract(ty, agg, idx),
            DefKind::Insert { agg, idx, val } => PureKey::Insert(ty, agg, idx, val),
            DefKind::Select { c, a, b } => PureKey::Select(ty, c, a, b),
            DefKind::Tuple(ref elems) => PureKey::Tuple(ty, elems.clone()),
            DefKind::VectorAgg(ref elems) => PureKey::VectorAgg(ty, elems.clone()),
            DefKind::Array(ref elems) => PureKey::Array(ty, elems.clone()),
            DefKind::StructAgg { ref tag, ref elems } => PureKey::StructAgg(ty, tag.clone(), elems.clone()),
            DefKind::Run(x) => PureKey::Run(ty, x),
            DefKind::Hlt(x) => PureKey::Hlt(ty, x),
            DefKind::Load { mem, ptr } => PureKey::Load(ty, mem, ptr),
            DefKind::Store { mem, ptr, val } => PureKey::Store(ty, mem, ptr, val),
            DefKind::Enter { mem } => PureKey::Enter(ty, mem),
            DefKind::Slot { frame, idx } => PureKey::Slot(ty, frame, idx),
            DefKind::Alloc { mem, extra } => PureKey::Alloc(ty, mem, extra),
            DefKind::Global { init, is_mutable } => PureKey::Global(ty, init, is_mutable),
            DefKind::Map { mem, ptr, device, addr_space, offset, size } => PureKey::Map(ty, mem, ptr, device, addr_space, offset, size),
            DefKind::Unmap { mem, ptr, device, addr_space } => PureKey::Unmap(ty, mem, ptr, device, addr_space),
            DefKind::Lea { ptr, idx } => PureKey::Lea(ty, ptr, idx),
        })
    }
}

/// The canonical set of pure defs, keyed by [`PureKey`].
#[derive(Default)]
pub struct Interner {
    canon: HashMap<PureKey, DefId>,
}

impl Interner {
    #[must_use] pub fn new() -> Self { Self::default() }

    /// Probe the canonical set for an equal def without building
    /// anything, so a rejected candidate is never even built:
    /// `World::install` only constructs the node, wires its use-list
    /// entries, and assigns a gid after this returns `None`.
    ///
    /// Always returns `None` for `Lambda`/`Param` kinds — they have no
    /// [`PureKey`] and are not subject to CSE at all.
    #[must_use] pub fn lookup(&self, ty: TypeId, kind: &DefKind) -> Option<DefId> {
        PureKey::from_kind(ty, kind).and_then(|key| self.canon.get(&key).copied())
    }

    /// Register a newly-accepted def as the canonical representative
    /// of its `(kind, type, operands)`. No-op for `Lambda`/`Param`.
    pub fn register(&mut self, ty: TypeId, kind: &DefKind, id: DefId) {
        if let Some(key) = PureKey::from_kind(ty, kind) {
            self.canon.insert(key, id);
        }
    }

    /// Remove the entry for an already-canonical def, e.g. when
    /// cleanup deletes it.
    pub fn remove(&mut self, def: &Def) {
        if let Some(key) = PureKey::from_kind(def.ty, &def.kind) {
            self.canon.remove(&key);
        }
    }

    #[must_use] pub fn len(&self) -> usize { self.canon.len() }
    #[must_use] pub fn is_empty(&self) -> bool { self.canon.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{Loc};
    use hashbrown::HashSet as HbHashSet;

    fn dummy_def(id: u32, ty: TypeId, kind: DefKind) -> Def {
        Def { id: DefId::from_u32(id), ty, kind, loc: Loc::unknown(), name: None, uses: HbHashSet::new() }
    }

    #[test]
    fn equal_pure_defs_collide() {
        let mut interner = Interner::new();
        let ty = TypeId::from_u32(0);
        let a = DefId::from_u32(1);
        let b = DefId::from_u32(2);

        let first = dummy_def(10, ty, DefKind::ArithOp { kind: ArithKind::Add, a, b });
        assert!(interner.lookup(ty, &first.kind).is_none());
        interner.register(ty, &first.kind, first.id);

        let second_kind = DefKind::ArithOp { kind: ArithKind::Add, a, b };
        assert_eq!(interner.lookup(ty, &second_kind), Some(first.id));
    }

    #[test]
    fn lambdas_and_params_are_never_cse_keys() {
        let interner = Interner::new();
        let ty = TypeId::from_u32(0);
        let lambda = DefId::from_u32(5);
        let p0 = DefKind::Param { lambda, index: 0 };
        assert!(interner.lookup(ty, &p0).is_none());
    }
}

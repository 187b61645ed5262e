//! Structural type graph: interned shapes that
//! every [`crate::def::Def`] points at.
//!
//! `mmcc`'s `ty::Ty<'a>` (a `&'a TyKind<'a>` arena reference, see
//! `build_mir.rs`) is lifetime-parameterized because it builds its IR
//! against a borrowed arena handed in from outside. This crate's
//! `World::new(name)` owns everything it produces, so types are
//! addressed by a dense [`TypeId`] into a `World`-owned table instead
//! — the index-based sibling of the same idea.
//!
//! "A type may be interned only when every transitive component is
//! already interned" holds here for free: a [`TypeKind`]'s fields are
//! themselves [`TypeId`]s, and the only way to obtain one is from a
//! prior successful [`TypeInterner::intern`]. There is no runtime
//! "unified" bit to check, unlike `world.cpp`; the type system makes
//! the unclosed state unrepresentable.

use std::rc::Rc;

use hashbrown::HashMap;

use crate::idx::{mk_idx, Idx, IdxVec};
use crate::value::PrimKind;

mk_idx! {
    /// A canonical, interned type handle.
    pub struct TypeId;
}

/// An interned struct-type tag, shared by `Struct(tag, elems…)`.
/// Cheaply clonable since several struct instantiations of the same
/// nominal struct share one tag.
pub type StructTag = Rc<str>;

/// The shape of a structural type. Two [`TypeKind`]s are equal iff
/// their variant and component [`TypeId`]s match — components are
/// already-canonical ids, so this `#[derive(PartialEq, Eq, Hash)]`
/// *is* the structural-equality rule this graph needs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A primitive numeric type; `1` for a scalar, `>1` for a vector
    /// of that many lanes.
    Primitive(PrimKind, u32),
    Pointer(TypeId, u32),
    Tuple(Vec<TypeId>),
    Function(Vec<TypeId>),
    Memory,
    Frame,
    DefiniteArray(TypeId, u64),
    IndefiniteArray(TypeId),
    Struct(StructTag, Vec<TypeId>),
    /// A homogeneous SIMD-style vector of a (possibly non-primitive)
    /// element type, distinct from a primitive's own vector-length
    /// field.
    Vector(TypeId, u32),
    /// An as-yet-unbound type variable, identified by a small index
    /// local to the binder that introduces it.
    TypeVar(u32),
}

impl TypeKind {
    #[must_use] pub fn is_memory(&self) -> bool { matches!(self, TypeKind::Memory) }
    #[must_use] pub fn is_frame(&self) -> bool { matches!(self, TypeKind::Frame) }

    #[must_use] pub fn vector_length(&self) -> u32 {
        match self {
            TypeKind::Primitive(_, len) | TypeKind::Vector(_, len) => *len,
            _ => 1,
        }
    }
}

/// The structural type table owned by a [`crate::world::World`].
///
/// Mirrors the `cse`/`unify` split this kernel draws between types
/// and pure primops: this is the `unify` half, kept in its own table
/// since types never participate in use-list bookkeeping or cleanup
/// the way [`crate::def::Def`]s do — they are immortal for the life of
/// the world.
#[derive(Default)]
pub struct TypeInterner {
    types: IdxVec<TypeId, TypeKind>,
    canon: HashMap<TypeKind, TypeId>,
}

impl TypeInterner {
    #[must_use] pub fn new() -> Self { Self::default() }

    /// Returns the canonical handle
    /// for `kind`, installing it as its own representative the first
    /// time it is seen.
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.canon.get(&kind) {
            return id;
        }
        let id = self.types.push(kind.clone());
        self.canon.insert(kind, id);
        id
    }

    #[must_use] pub fn kind(&self, id: TypeId) -> &TypeKind {
        self.types.get(id).expect("TypeId from a different World")
    }

    #[must_use] pub fn len(&self) -> usize { self.types.len() }
    #[must_use] pub fn is_empty(&self) -> bool { self.types.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BaseKind;

    #[test]
    fn equal_shape_types_are_identical_handles() {
        let mut interner = TypeInterner::new();
        let i32_a = interner.intern(TypeKind::Primitive(PrimKind::precise(BaseKind::I32), 1));
        let i32_b = interner.intern(TypeKind::Primitive(PrimKind::precise(BaseKind::I32), 1));
        assert_eq!(i32_a, i32_b);

        let tup_a = interner.intern(TypeKind::Tuple(vec![i32_a, i32_b]));
        let tup_b = interner.intern(TypeKind::Tuple(vec![i32_a, i32_b]));
        assert_eq!(tup_a, tup_b);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn distinct_shapes_get_distinct_handles() {
        let mut interner = TypeInterner::new();
        let i32_t = interner.intern(TypeKind::Primitive(PrimKind::precise(BaseKind::I32), 1));
        let i64_t = interner.intern(TypeKind::Primitive(PrimKind::precise(BaseKind::I64), 1));
        assert_ne!(i32_t, i64_t);
    }

    #[test]
    fn struct_tags_distinguish_otherwise_identical_shapes() {
        let mut interner = TypeInterner::new();
        let i32_t = interner.intern(TypeKind::Primitive(PrimKind::precise(BaseKind::I32), 1));
        let foo: StructTag = Rc::from("Foo");
        let bar: StructTag = Rc::from("Bar");
        let s1 = interner.intern(TypeKind::Struct(foo, vec![i32_t]));
        let s2 = interner.intern(TypeKind::Struct(bar, vec![i32_t]));
        assert_ne!(s1, s2);
    }
}

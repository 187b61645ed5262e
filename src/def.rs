//! The node graph: [`Def`], the single node type
//! for literals, `Bottom`, params, lambdas, and every primop.
//!
//! Laid out the way `mmcc`'s `build_mir.rs` lays out its `Rvalue`/
//! `Operand` enums: one flat enum carrying each variant's payload
//! inline, operands named positionally rather than through an
//! indirection table. Operand lists that are genuinely small and
//! fixed-arity (binary ops, `select`) are plain fields; genuinely
//! variadic ones (`Tuple`, `StructAgg`, a lambda's call arguments) use
//! `SmallVec` the way `mmcc`'s vcode builder does for register
//! lists, since most of them hold a handful of elements.

use std::rc::Rc;

use bit_set::BitSet;
use bitflags::bitflags;
use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::idx::{mk_idx, Idx};
use crate::ty::{StructTag, TypeId};
use crate::value::PrimBox;

mk_idx! {
    /// A stable global id, assigned only at successful interning —
    /// the thing the "operand-before-parent gid order" invariant is
    /// stated in terms of.
    pub struct DefId;
}

/// Small inline operand/argument list. Most nodes have 0-4 operands;
/// this keeps those on the stack while still supporting arbitrary
/// tuples and call arities.
pub type DefList = SmallVec<[DefId; 4]>;

/// Source location, printed by `stream.rs` as
/// `file:line col col - file:line col col` with right-elision.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Loc {
    pub file: Rc<str>,
    pub begin_line: u32,
    pub begin_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Loc {
    #[must_use] pub fn unknown() -> Self {
        Self { file: Rc::from("<unknown>"), begin_line: 0, begin_col: 0, end_line: 0, end_col: 0 }
    }
}

/// Integer/bitwise/float arithmetic op tags for [`DefKind::ArithOp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithKind { Add, Sub, Mul, Div, Rem, And, Or, Xor, Shl, Shr, FAdd, FSub, FMul, FDiv }

impl ArithKind {
    #[must_use] pub fn is_commutative(self) -> bool {
        matches!(self, ArithKind::Add | ArithKind::Mul | ArithKind::And | ArithKind::Or | ArithKind::Xor)
    }

    /// Associative *and* integer-only ("if kind is associative and
    /// integer") — float addition/multiplication are commutative but
    /// not associative under IEEE 754 rounding.
    #[must_use] pub fn is_integer_associative(self) -> bool {
        matches!(self, ArithKind::Add | ArithKind::Mul | ArithKind::And | ArithKind::Or | ArithKind::Xor)
    }

    #[must_use] pub fn is_float(self) -> bool {
        matches!(self, ArithKind::FAdd | ArithKind::FSub | ArithKind::FMul | ArithKind::FDiv)
    }
}

/// Comparison op tags. `Gt`/`Ge` are accepted at the [`crate::world::World::cmp`]
/// call boundary only: that builder normalizes them to `<`/`≤` with
/// swapped operands before a [`Def`] is ever constructed, so only
/// `Eq`/`Ne`/`Lt`/`Le` survive into one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpKind { Eq, Ne, Lt, Le, Gt, Ge }

impl CmpKind {
    /// `not(cmp k, a, b) → cmp(negate k, a, b)`. `Lt`/`Le` (and their
    /// unnormalized `Gt`/`Ge` siblings) negate with operands swapped
    /// (`not(a<b) == b<=a`), reported via the bool.
    #[must_use] pub fn negate(self) -> (CmpKind, bool) {
        match self {
            CmpKind::Eq => (CmpKind::Ne, false),
            CmpKind::Ne => (CmpKind::Eq, false),
            CmpKind::Lt => (CmpKind::Le, true),
            CmpKind::Le => (CmpKind::Lt, true),
            CmpKind::Gt => (CmpKind::Le, false),
            CmpKind::Ge => (CmpKind::Lt, false),
        }
    }

    /// `>`/`≥` normalize to `<`/`≤` with swapped operands; the other
    /// four kinds pass through unchanged.
    #[must_use] pub fn normalize(self) -> (CmpKind, bool) {
        match self {
            CmpKind::Gt => (CmpKind::Lt, true),
            CmpKind::Ge => (CmpKind::Le, true),
            other => (other, false),
        }
    }
}

bitflags! {
    /// Well-known lambda roles the kernel itself cares about.
    /// Anything else is opaque to the kernel.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Intrinsic: u32 {
        const NONE      = 0;
        const BRANCH    = 1 << 0;
        const END_SCOPE = 1 << 1;
        const MMAP      = 1 << 2;
        const MUNMAP    = 1 << 3;
    }
}

impl Default for Intrinsic {
    fn default() -> Self { Intrinsic::NONE }
}

/// Calling-convention tag; only `C` is meaningful to the kernel,
/// everything else is opaque.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallingConv {
    #[default]
    Thorin,
    C,
    Device,
}

/// A lambda's body: `(to, args…)`, laid out operand-0-is-callee the
/// way `anydsl`'s `Goto`/`Args` puts `to` before the call arguments
/// (`jump.h`).
#[derive(Clone, Debug)]
pub struct Jump {
    pub to: DefId,
    pub args: DefList,
}

/// The mutable, identity-based payload of a `Lambda` [`Def`]. Never
/// hash-consed — two lambdas are always distinct regardless of
/// whether their bodies happen to match.
#[derive(Clone, Debug)]
pub struct LambdaData {
    pub params: Vec<DefId>,
    pub body: Option<Jump>,
    pub intrinsic: Intrinsic,
    pub cc: CallingConv,
    pub is_basicblock: bool,
}

impl LambdaData {
    #[must_use] pub fn new(is_basicblock: bool) -> Self {
        Self { params: Vec::new(), body: None, intrinsic: Intrinsic::NONE, cc: CallingConv::default(), is_basicblock }
    }

    #[must_use] pub fn is_empty(&self) -> bool { self.body.is_none() }
    #[must_use] pub fn is_returning(&self) -> bool { !self.intrinsic.intersects(Intrinsic::BRANCH | Intrinsic::END_SCOPE) }
}

/// The node-kind tag plus inline payload for every [`Def`] variant.
#[derive(Clone, Debug)]
pub enum DefKind {
    Literal(PrimBox),
    Bottom,
    Param { lambda: DefId, index: u32 },
    Lambda(LambdaData),

    ArithOp { kind: ArithKind, a: DefId, b: DefId },
    Cmp { kind: CmpKind, a: DefId, b: DefId },
    Cast { x: DefId },
    Bitcast { x: DefId },
    Extract { agg: DefId, idx: DefId },
    Insert { agg: DefId, idx: DefId, val: DefId },
    Select { c: DefId, a: DefId, b: DefId },
    Tuple(DefList),
    VectorAgg(DefList),
    Array(DefList),
    StructAgg { tag: StructTag, elems: DefList },
    Run(DefId),
    Hlt(DefId),

    Load { mem: DefId, ptr: DefId },
    Store { mem: DefId, ptr: DefId, val: DefId },
    Enter { mem: DefId },
    Slot { frame: DefId, idx: u32 },
    Alloc { mem: DefId, extra: DefId },
    Global { init: DefId, is_mutable: bool },
    Map { mem: DefId, ptr: DefId, device: DefId, addr_space: DefId, offset: DefId, size: DefId },
    Unmap { mem: DefId, ptr: DefId, device: DefId, addr_space: DefId },
    Lea { ptr: DefId, idx: DefId },
}

impl DefKind {
    #[must_use] pub fn name(&self) -> &'static str {
        match self {
            DefKind::Literal(_) => "literal", DefKind::Bottom => "bottom",
            DefKind::Param { .. } => "param", DefKind::Lambda(_) => "lambda",
            DefKind::ArithOp { .. } => "arithop", DefKind::Cmp { .. } => "cmp",
            DefKind::Cast { .. } => "cast", DefKind::Bitcast { .. } => "bitcast",
            DefKind::Extract { .. } => "extract", DefKind::Insert { .. } => "insert",
            DefKind::Select { .. } => "select", DefKind::Tuple(_) => "tuple",
            DefKind::VectorAgg(_) => "vector", DefKind::Array(_) => "array",
            DefKind::StructAgg { .. } => "struct_agg", DefKind::Run(_) => "run",
            DefKind::Hlt(_) => "hlt", DefKind::Load { .. } => "load",
            DefKind::Store { .. } => "store", DefKind::Enter { .. } => "enter",
            DefKind::Slot { .. } => "slot", DefKind::Alloc { .. } => "alloc",
            DefKind::Global { .. } => "global", DefKind::Map { .. } => "map",
            DefKind::Unmap { .. } => "unmap", DefKind::Lea { .. } => "lea",
        }
    }

    /// This node's operands, in the exact order hashed/equated by
    /// [`crate::intern::Interner`] and printed by the textual dump.
    #[must_use] pub fn operands(&self) -> DefList {
        match self {
            DefKind::Literal(_) | DefKind::Bottom => DefList::new(),
            DefKind::Param { .. } => DefList::new(),
            DefKind::Lambda(data) => match &data.body {
                Some(jump) => {
                    let mut ops = DefList::with_capacity(1 + jump.args.len());
                    ops.push(jump.to);
                    ops.extend(jump.args.iter().copied());
                    ops
                }
                None => DefList::new(),
            },
            DefKind::ArithOp { a, b, .. } | DefKind::Cmp { a, b, .. } => DefList::from_slice(&[*a, *b]),
            DefKind::Cast { x } | DefKind::Bitcast { x } | DefKind::Run(x) | DefKind::Hlt(x) => DefList::from_slice(&[*x]),
            DefKind::Extract { agg, idx } => DefList::from_slice(&[*agg, *idx]),
            DefKind::Insert { agg, idx, val } => DefList::from_slice(&[*agg, *idx, *val]),
            DefKind::Select { c, a, b } => DefList::from_slice(&[*c, *a, *b]),
            DefKind::Tuple(elems) | DefKind::VectorAgg(elems) | DefKind::Array(elems) => elems.clone(),
            DefKind::StructAgg { elems, .. } => elems.clone(),
            DefKind::Load { mem, ptr } => DefList::from_slice(&[*mem, *ptr]),
            DefKind::Store { mem, ptr, val } => DefList::from_slice(&[*mem, *ptr, *val]),
            DefKind::Enter { mem } => DefList::from_slice(&[*mem]),
            DefKind::Slot { frame, .. } => DefList::from_slice(&[*frame]),
            DefKind::Alloc { mem, extra } => DefList::from_slice(&[*mem, *extra]),
            DefKind::Global { init, .. } => DefList::from_slice(&[*init]),
            DefKind::Map { mem, ptr, device, addr_space, offset, size } => DefList::from_slice(&[*mem, *ptr, *device, *addr_space, *offset, *size]),
            DefKind::Unmap { mem, ptr, device, addr_space } => DefList::from_slice(&[*mem, *ptr, *device, *addr_space]),
            DefKind::Lea { ptr, idx } => DefList::from_slice(&[*ptr, *idx]),
        }
    }

    #[must_use] pub fn as_lambda(&self) -> Option<&LambdaData> {
        match self { DefKind::Lambda(data) => Some(data), _ => None }
    }
    #[must_use] pub fn as_lambda_mut(&mut self) -> Option<&mut LambdaData> {
        match self { DefKind::Lambda(data) => Some(data), _ => None }
    }
    #[must_use] pub fn as_literal(&self) -> Option<&PrimBox> {
        match self { DefKind::Literal(b) => Some(b), _ => None }
    }
    #[must_use] pub fn is_bottom(&self) -> bool { matches!(self, DefKind::Bottom) }
}

/// A node in the graph: the tag/payload plus the bookkeeping
/// every node carries regardless of kind.
#[derive(Clone, Debug)]
pub struct Def {
    pub id: DefId,
    pub ty: TypeId,
    pub kind: DefKind,
    pub loc: Loc,
    pub name: Option<Rc<str>>,
    /// `(user, operand-index)` back edges; invariant 4
    /// ties this to `kind.operands()` on every member of `uses`.
    pub uses: HashSet<(DefId, u32)>,
}

impl Def {
    #[must_use] pub fn operands(&self) -> DefList { self.kind.operands() }

    #[must_use] pub fn is_lambda(&self) -> bool { matches!(self.kind, DefKind::Lambda(_)) }
    #[must_use] pub fn is_param(&self) -> bool { matches!(self.kind, DefKind::Param { .. }) }

    #[must_use] pub fn as_lambda(&self) -> Option<&LambdaData> { self.kind.as_lambda() }
    #[must_use] pub fn as_lambda_mut(&mut self) -> Option<&mut LambdaData> { self.kind.as_lambda_mut() }
}

/// Scratch mark set used by `cleanup.rs`'s two DFS passes, kept here
/// since it is sized by [`DefId`] the same way [`crate::idx::IdxVec`]
/// is, but a bitset is the appropriate container for a flag-per-node
/// rather than a value-per-node.
#[must_use] pub fn new_mark_set(capacity: usize) -> BitSet { BitSet::with_capacity(capacity) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmp_negate_lt_swaps_operands() {
        let (k, swap) = CmpKind::Lt.negate();
        assert_eq!(k, CmpKind::Le);
        assert!(swap);
    }

    #[test]
    fn cmp_negate_eq_does_not_swap() {
        let (k, swap) = CmpKind::Eq.negate();
        assert_eq!(k, CmpKind::Ne);
        assert!(!swap);
    }

    #[test]
    fn cmp_normalize_swaps_gt_into_lt() {
        let (k, swap) = CmpKind::Gt.normalize();
        assert_eq!(k, CmpKind::Lt);
        assert!(swap);
    }

    #[test]
    fn cmp_normalize_leaves_le_alone() {
        let (k, swap) = CmpKind::Le.normalize();
        assert_eq!(k, CmpKind::Le);
        assert!(!swap);
    }

    #[test]
    fn lambda_operands_put_callee_first() {
        let mut data = LambdaData::new(false);
        let to = DefId::from_u32(0);
        let a = DefId::from_u32(1);
        data.body = Some(Jump { to, args: DefList::from_slice(&[a]) });
        let kind = DefKind::Lambda(data);
        let ops = kind.operands();
        assert_eq!(ops.as_slice(), &[to, a]);
    }
}

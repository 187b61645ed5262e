//! The builder/simplifier and the `World` that owns every
//! [`crate::ty::TypeKind`]/[`crate::def::Def`] in a graph.
//!
//! Laid out the way `mmcc` owns its MIR: one top-level struct holding
//! dense, index-addressed tables (`build_mir.rs`'s `Mir`/`CodeHash`
//! maps), with the smart-constructor ruleset broken out into sibling
//! files the way `mmcc` splits `build_mir.rs` from `build_vcode.rs`
//! from `codegen.rs` — one file per concern instead of one file per
//! node kind.

use std::marker::PhantomData;
use std::path::Path;
use std::rc::Rc;

use hashbrown::HashSet;
use log::{debug, trace};

use crate::cleanup;
use crate::error::ThorinError;
use crate::idx::{Idx, IdxVec};
use crate::def::{CallingConv, Def, DefId, DefKind, DefList, Intrinsic, Jump, LambdaData, Loc};
use crate::ty::{TypeId, TypeInterner, TypeKind};
use crate::intern::Interner;
use crate::value::{BaseKind, PrimBox, PrimKind};

pub mod arith;
pub mod agg;
pub mod mem;

/// Construction-time knobs ("debug breakpoints" on gid construction).
/// Carried as an explicit, client-supplied struct instead of a global
/// singleton: the `World` must stay the only global-like object.
#[derive(Clone, Debug, Default)]
pub struct WorldConfig {
    /// Construction of a Def whose gid matches one of these triggers a
    /// debug trap (`std::process::abort`) rather than silently
    /// continuing (`world.cpp` uses an inline-asm breakpoint; a debug
    /// build here aborts instead).
    pub break_on_gid: HashSet<u32>,
}

/// The owning arena for one compilation's worth of IR. Not
/// `Send`/`Sync`: the concurrency model is single-threaded
/// cooperative, and every mutation below assumes exclusive access.
pub struct World {
    name: String,
    config: WorldConfig,
    pub(crate) types: TypeInterner,
    pub(crate) defs: IdxVec<DefId, Option<Def>>,
    pub(crate) interner: Interner,

    // Pre-interned constants every graph needs, built once in `new`.
    pub(crate) unit_ty: TypeId,
    pub(crate) mem_ty: TypeId,
    pub(crate) frame_ty: TypeId,

    // Built-in intrinsic lambdas every graph gets for free, mirroring
    // `World::World`'s `branch_`/`end_scope_` members in `world.cpp`.
    branch: DefId,
    end_scope: DefId,

    _not_send_sync: PhantomData<*const ()>,
}

impl World {
    /// `World::new(name)` — the kernel's entry point. Pre-interns the
    /// handful of types every graph needs regardless of client code,
    /// matching `world.cpp`'s `World::World` constructor body.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, WorldConfig::default())
    }

    #[must_use]
    pub fn with_config(name: impl Into<String>, config: WorldConfig) -> Self {
        let name = name.into();
        debug!(target: "thorin_ir::world", "creating world '{name}'");
        let mut types = TypeInterner::new();
        let unit_ty = types.intern(TypeKind::Tuple(Vec::new()));
        let mem_ty = types.intern(TypeKind::Memory);
        let frame_ty = types.intern(TypeKind::Frame);
        // Placeholder until the two built-in lambdas below are created;
        // `Lambda` defs never go through `install`/CSE, so gid 0 is
        // always a real, distinct lambda by the time callers see it.
        let placeholder = DefId::from_u32(0);
        let mut world = World {
            name,
            config,
            types,
            defs: IdxVec::new(),
            interner: Interner::new(),
            unit_ty,
            mem_ty,
            frame_ty,
            branch: placeholder,
            end_scope: placeholder,
            _not_send_sync: PhantomData,
        };

        // `branch_`/`end_scope_`, from `World::World` in `world.cpp`:
        // built-in control-flow intrinsic lambdas every graph carries.
        let bool_ty = world.prim_ty(PrimKind::precise(BaseKind::Bool), 1);
        let nullary_cont = world.fn_ty(Vec::new());
        let branch_ty = world.fn_ty(vec![bool_ty, nullary_cont, nullary_cont]);
        world.branch = world.lambda_raw(branch_ty, Loc::unknown(), CallingConv::Thorin, Intrinsic::BRANCH, Some("branch"));
        let end_scope_ty = world.fn_ty(Vec::new());
        world.end_scope = world.lambda_raw(end_scope_ty, Loc::unknown(), CallingConv::Thorin, Intrinsic::END_SCOPE, Some("end_scope"));

        world
    }

    /// The built-in branch intrinsic, `fn(bool, fn(), fn()) -> !`.
    #[must_use] pub fn branch(&self) -> DefId { self.branch }

    /// The built-in end-of-scope intrinsic.
    #[must_use] pub fn end_scope(&self) -> DefId { self.end_scope }

    #[must_use] pub fn name(&self) -> &str { &self.name }
    #[must_use] pub fn unit_ty(&self) -> TypeId { self.unit_ty }
    #[must_use] pub fn mem_ty(&self) -> TypeId { self.mem_ty }
    #[must_use] pub fn frame_ty(&self) -> TypeId { self.frame_ty }

    // ---- Types -----------------------------------------------------

    pub fn intern_type(&mut self, kind: TypeKind) -> TypeId { self.types.intern(kind) }
    #[must_use] pub fn type_kind(&self, id: TypeId) -> &TypeKind { self.types.kind(id) }

    pub fn prim_ty(&mut self, kind: PrimKind, vector_len: u32) -> TypeId {
        self.intern_type(TypeKind::Primitive(kind, vector_len))
    }

    pub fn ptr_ty(&mut self, referenced: TypeId, addr_space: u32) -> TypeId {
        self.intern_type(TypeKind::Pointer(referenced, addr_space))
    }

    pub fn fn_ty(&mut self, params: Vec<TypeId>) -> TypeId {
        self.intern_type(TypeKind::Function(params))
    }

    // ---- Def access --------------------------------------------------

    #[must_use] pub fn def(&self, id: DefId) -> &Def {
        self.defs.get(id).and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("{id:?} has been destroyed or never existed"))
    }

    pub(crate) fn def_mut(&mut self, id: DefId) -> &mut Def {
        self.defs.get_mut(id).and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("{id:?} has been destroyed or never existed"))
    }

    #[must_use] pub fn ty_of(&self, id: DefId) -> TypeId { self.def(id).ty }

    #[must_use] pub fn is_bottom(&self, id: DefId) -> bool { self.def(id).kind.is_bottom() }

    #[must_use] pub fn as_literal(&self, id: DefId) -> Option<&PrimBox> { self.def(id).kind.as_literal() }

    /// Iterate all live (non-deleted) defs.
    pub fn iter_defs(&self) -> impl Iterator<Item = &Def> { self.defs.iter().filter_map(Option::as_ref) }

    // ---- Installation (C4 integration) --------------------------------

    /// Check-before-build CSE (see [`Interner::lookup`]): probe the
    /// canonical set first, and
    /// only if nothing matches do we wire use-list entries and assign
    /// a gid. `Lambda` defs always take the "assign a fresh gid"
    /// branch since [`Interner::lookup`] never matches them.
    pub(crate) fn install(&mut self, ty: TypeId, kind: DefKind, loc: Loc, name: Option<Rc<str>>) -> DefId {
        if let Some(existing) = self.interner.lookup(ty, &kind) {
            trace!(target: "thorin_ir::world", "cse hit for a {}", kind.name());
            return existing;
        }
        let operands = kind.operands();
        let id = DefId::from_usize(self.defs.len());
        for (i, op) in operands.iter().enumerate() {
            self.def_mut(*op).uses.insert((id, u32::try_from(i).expect("operand index overflow")));
        }
        self.interner.register(ty, &kind, id);
        let def = Def { id, ty, kind, loc, name, uses: HashSet::new() };
        self.defs.push(Some(def));
        self.maybe_break(id);
        id
    }

    fn maybe_break(&self, id: DefId) {
        if self.config.break_on_gid.contains(&id.as_u32()) {
            std::process::abort();
        }
    }

    // ---- Literals, Bottom, Param ---------------------------------------

    pub fn literal(&mut self, base: BaseKind, quick: bool, box_: PrimBox, loc: Loc, name: Option<&str>) -> DefId {
        debug_assert_eq!(box_.base(), base, "literal payload must match the requested kind");
        let ty = self.prim_ty(PrimKind::new(base, quick), 1);
        self.install(ty, DefKind::Literal(box_), loc, name.map(Rc::from))
    }

    pub fn bottom(&mut self, ty: TypeId, loc: Loc, name: Option<&str>) -> DefId {
        self.install(ty, DefKind::Bottom, loc, name.map(Rc::from))
    }

    /// `splat(arg, length)` (`World::splat` in `world.cpp`): broadcast
    /// a scalar Def to a `length`-wide vector, identity when
    /// `length == 1`. Used by `literal`'s vector
    /// construction and by the folding paths in `world::arith` that
    /// need to rebuild a vector result element-by-element.
    pub fn splat(&mut self, arg: DefId, length: u32, loc: Loc, name: Option<&str>) -> DefId {
        if length == 1 {
            return arg;
        }
        let elems = vec![arg; length as usize];
        self.vector_agg(&elems, loc, name)
    }

    /// `param(type, λ, idx)`. Params are uniquely owned
    /// by their lambda's parameter vector, so this
    /// bypasses `install`/CSE entirely and just indexes (or lazily
    /// grows) that vector.
    pub fn param(&mut self, ty: TypeId, lambda: DefId, idx: u32, loc: Loc, name: Option<&str>) -> DefId {
        let index = idx;
        let id = DefId::from_usize(self.defs.len());
        let def = Def { id, ty, kind: DefKind::Param { lambda, index }, loc, name: name.map(Rc::from), uses: HashSet::new() };
        self.defs.push(Some(def));
        let lambda_params = &mut self.def_mut(lambda).as_lambda_mut()
            .unwrap_or_else(|| panic!("param owner {lambda:?} is not a lambda")).params;
        let idx = index as usize;
        if lambda_params.len() <= idx {
            lambda_params.resize(idx + 1, id);
        } else {
            lambda_params[idx] = id;
        }
        self.maybe_break(id);
        id
    }

    // ---- Lambdas -----------------------------------------------------

    /// `lambda(fn_type, loc, cc, intrinsic?, name)`.
    /// Never goes through `install`/CSE — lambdas are identity-based.
    pub fn lambda(&mut self, fn_type: TypeId, loc: Loc, cc: CallingConv, intrinsic: Intrinsic, name: Option<&str>) -> DefId {
        let id = self.lambda_raw(fn_type, loc, cc, intrinsic, name);
        self.maybe_break(id);
        id
    }

    /// Bootstrap path for `World::new`'s built-in `branch`/`end_scope`
    /// lambdas: skips the breakpoint check, since those two gids are
    /// always assigned during construction and are not the user-built
    /// defs `WorldConfig::break_on_gid` is meant to trap.
    fn lambda_raw(&mut self, fn_type: TypeId, loc: Loc, cc: CallingConv, intrinsic: Intrinsic, name: Option<&str>) -> DefId {
        let id = DefId::from_usize(self.defs.len());
        let mut data = LambdaData::new(false);
        data.cc = cc;
        data.intrinsic = intrinsic;
        let def = Def { id, ty: fn_type, kind: DefKind::Lambda(data), loc, name: name.map(Rc::from), uses: HashSet::new() };
        self.defs.push(Some(def));
        id
    }

    /// `basicblock(loc, name)`: a lambda with no
    /// meaningful return type, tagged so `is_basicblock()` and the
    /// textual dump can tell it apart from a function lambda.
    pub fn basicblock(&mut self, loc: Loc, name: Option<&str>) -> DefId {
        let fn_type = self.fn_ty(Vec::new());
        let id = self.lambda(fn_type, loc, CallingConv::default(), Intrinsic::NONE, name);
        self.def_mut(id).as_lambda_mut().expect("just created").is_basicblock = true;
        id
    }

    /// `meta_lambda(fn_type)` (`World::meta_lambda` in `world.cpp`):
    /// a placeholder callee whose
    /// body jumps straight to `Bottom` of its own function type, used
    /// by clients that need some concrete lambda to stand in before
    /// the real target is known.
    pub fn meta_lambda(&mut self, fn_type: TypeId, loc: Loc, name: Option<&str>) -> DefId {
        let id = self.lambda(fn_type, loc.clone(), CallingConv::default(), Intrinsic::NONE, name);
        let bot = self.bottom(fn_type, loc, None);
        self.set_body(id, bot, &[]);
        id
    }

    pub fn set_body(&mut self, lambda: DefId, to: DefId, args: &[DefId]) {
        let args_list: DefList = args.iter().copied().collect();
        for (i, &op) in std::iter::once(&to).chain(args.iter()).enumerate() {
            self.def_mut(op).uses.insert((lambda, u32::try_from(i).expect("arg index overflow")));
        }
        let data = self.def_mut(lambda).as_lambda_mut().unwrap_or_else(|| panic!("{lambda:?} is not a lambda"));
        assert!(data.body.is_none(), "set_body on a lambda that already has a body");
        data.body = Some(Jump { to, args: args_list });
    }

    pub fn destroy_body(&mut self, lambda: DefId) {
        let old = {
            let data = self.def_mut(lambda).as_lambda_mut().unwrap_or_else(|| panic!("{lambda:?} is not a lambda"));
            data.body.take()
        };
        if let Some(jump) = old {
            for (i, op) in std::iter::once(jump.to).chain(jump.args.iter().copied()).enumerate() {
                self.def_mut(op).uses.remove(&(lambda, u32::try_from(i).expect("arg index overflow")));
            }
        }
    }

    pub fn update_to(&mut self, lambda: DefId, new_to: DefId) {
        let old_to = {
            let data = self.def_mut(lambda).as_lambda_mut().unwrap_or_else(|| panic!("{lambda:?} is not a lambda"));
            let jump = data.body.as_mut().unwrap_or_else(|| panic!("{lambda:?} has no body"));
            std::mem::replace(&mut jump.to, new_to)
        };
        self.def_mut(old_to).uses.remove(&(lambda, 0));
        self.def_mut(new_to).uses.insert((lambda, 0));
    }

    /// Fail-stop if `lambda` is referenced anywhere — callers must run
    /// `cleanup` first to confirm it is actually dead.
    pub fn destroy(&mut self, lambda: DefId) {
        self.destroy_body(lambda);
        let def = self.defs.get(lambda).and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("{lambda:?} already destroyed"));
        assert!(def.uses.is_empty(), "destroying a lambda that is still in use");
        self.defs[lambda] = None;
    }

    // ---- Cleanup / opt / dump -------------------------------------------

    /// `cleanup()`: mark-sweep DCE+UCE from the
    /// supplied reachable-lambda and live-def roots.
    pub fn cleanup(&mut self, reachable_roots: &[DefId], live_roots: &[DefId]) {
        cleanup::cleanup(self, reachable_roots, live_roots);
    }

    /// `opt()`: the kernel only owns `cleanup`; every
    /// other named pass (partial-eval, `lower2cff`, `mem2reg`,
    /// `memmap_builtins`, the inliner, `dead_load_opt`, …) is an
    /// external client of this kernel by design. `opt` here runs the
    /// one stage the kernel itself owns and documents the rest of the
    /// pipeline it would sit inside.
    pub fn opt(&mut self, reachable_roots: &[DefId], live_roots: &[DefId]) {
        self.cleanup(reachable_roots, live_roots);
    }

    pub fn stream(&self, out: &mut dyn std::fmt::Write, roots: &[DefId]) -> std::fmt::Result {
        crate::stream::stream(self, out, roots)
    }

    /// `write(path)` — the kernel's one fallible edge.
    pub fn write(&self, path: impl AsRef<Path>, roots: &[DefId]) -> Result<(), ThorinError> {
        let path = path.as_ref();
        let mut out = String::new();
        self.stream(&mut out, roots).expect("formatting to a String cannot fail");
        std::fs::write(path, out).map_err(|source| ThorinError::Io { path: path.to_path_buf(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BaseKind;

    #[test]
    fn new_world_preinterns_unit_memory_frame() {
        let world = World::new("test");
        assert!(matches!(world.type_kind(world.unit_ty()), TypeKind::Tuple(v) if v.is_empty()));
        assert!(world.type_kind(world.mem_ty()).is_memory());
        assert!(world.type_kind(world.frame_ty()).is_frame());
    }

    #[test]
    fn literal_install_is_deduplicated() {
        let mut world = World::new("test");
        let a = world.literal(BaseKind::I32, false, PrimBox::I32(49), Loc::unknown(), None);
        let b = world.literal(BaseKind::I32, false, PrimBox::I32(49), Loc::unknown(), None);
        assert_eq!(a, b);
    }

    #[test]
    fn param_identity_is_by_lambda_and_index() {
        let mut world = World::new("test");
        let i32_ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        let fn_ty = world.fn_ty(vec![i32_ty]);
        let lambda = world.lambda(fn_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("L"));
        let p0 = world.param(i32_ty, lambda, 0, Loc::unknown(), None);
        assert_eq!(world.def(lambda).as_lambda().unwrap().params, vec![p0]);
    }

    #[test]
    fn debug_breakpoint_aborts_in_process() {
        // Not executed here (would abort the test process); this just
        // checks the config plumbing is reachable. Gid 0 is taken by
        // the bootstrap `branch` lambda, which bypasses the breakpoint
        // check, so constructing `World` with `break_on_gid = {0}`
        // must not itself abort.
        let mut cfg = WorldConfig::default();
        cfg.break_on_gid.insert(0);
        let world = World::with_config("test", cfg);
        assert_eq!(world.name(), "test");
    }

    #[test]
    fn branch_and_end_scope_are_distinct_builtin_lambdas() {
        let world = World::new("test");
        assert_ne!(world.branch(), world.end_scope());
        assert!(world.def(world.branch()).as_lambda().unwrap().intrinsic.contains(Intrinsic::BRANCH));
        assert!(world.def(world.end_scope()).as_lambda().unwrap().intrinsic.contains(Intrinsic::END_SCOPE));
    }

    #[test]
    fn splat_of_length_one_is_identity() {
        let mut world = World::new("test");
        let x = world.literal(BaseKind::I32, false, PrimBox::I32(7), Loc::unknown(), None);
        assert_eq!(world.splat(x, 1, Loc::unknown(), None), x);
    }

    #[test]
    fn splat_broadcasts_a_scalar_into_a_vector() {
        let mut world = World::new("test");
        let x = world.literal(BaseKind::I32, false, PrimBox::I32(7), Loc::unknown(), None);
        let v = world.splat(x, 4, Loc::unknown(), None);
        match &world.def(v).kind {
            DefKind::VectorAgg(elems) => assert!(elems.iter().all(|&e| e == x)),
            other => panic!("expected a VectorAgg, got {other:?}"),
        }
    }

    #[test]
    fn meta_lambda_bodies_jump_to_bottom_of_its_own_type() {
        let mut world = World::new("test");
        let fn_ty = world.fn_ty(Vec::new());
        let m = world.meta_lambda(fn_ty, Loc::unknown(), Some("placeholder"));
        let jump = world.def(m).as_lambda().unwrap().body.as_ref().unwrap();
        assert!(world.is_bottom(jump.to));
        assert_eq!(world.ty_of(jump.to), fn_ty);
    }
}

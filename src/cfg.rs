//! Control-flow views over a [`crate::scope::Scope`]: `Cfg`'s
//! forward/backward RPO numbering, and `cfa()`'s parameter-flow
//! fixpoint.
//!
//! The dominator tree, the post-dominator tree, and the loop tree are
//! out of the kernel itself — they are described only as clients that
//! consume scopes and CFGs, with the CFG merely caching them. So this
//! module gives `domtree()`/`postdomtree()`/`looptree()` a lazy,
//! externally-computed cache slot each rather than an algorithm:
//! whatever external pass computes a dominator tree stores it once,
//! and every later caller gets the same `&T` back. `cfa()` is not one
//! of those — it is a concrete, kernel-owned operation with a specific
//! (and specifically preserved) fixpoint rule, grounded below.

use std::any::Any;
use std::cell::OnceCell;

use hashbrown::{HashMap, HashSet};

use crate::def::{DefId, DefKind};
use crate::scope::Scope;
use crate::world::World;

/// One direction's reverse-postorder numbering over a [`Scope`]'s
/// members.
pub struct CfgView<const FORWARD: bool> {
    rpo: Vec<DefId>,
    sid: HashMap<DefId, usize>,
}

impl<const FORWARD: bool> CfgView<FORWARD> {
    #[must_use] pub fn nodes(&self) -> &[DefId] { &self.rpo }
    #[must_use] pub fn sid(&self, l: DefId) -> Option<usize> { self.sid.get(&l).copied() }
}

/// A [`Scope`]'s control-flow graph: the intra-scope jump edges, plus
/// lazily-built forward/backward views and externally-cached analyses.
pub struct Cfg {
    entry: DefId,
    members: HashSet<DefId>,
    succs: HashMap<DefId, Vec<DefId>>,
    preds: HashMap<DefId, Vec<DefId>>,
    f_view: OnceCell<CfgView<true>>,
    b_view: OnceCell<CfgView<false>>,
    domtree: OnceCell<Box<dyn Any>>,
    postdomtree: OnceCell<Box<dyn Any>>,
    looptree: OnceCell<Box<dyn Any>>,
}

impl Cfg {
    /// `Cfg::new(scope)`. Edges are restricted to
    /// `scope`'s own members — a jump leaving the scope has no target
    /// node to number, matching `Scope::new`'s own successor rule
    /// (`crate::scope`).
    #[must_use]
    pub fn new(world: &World, scope: &Scope) -> Self {
        let members: HashSet<DefId> = scope.lambdas().iter().copied().collect();
        let mut succs: HashMap<DefId, Vec<DefId>> = HashMap::new();
        let mut preds: HashMap<DefId, Vec<DefId>> = HashMap::new();
        for &l in scope.lambdas() {
            succs.entry(l).or_default();
            preds.entry(l).or_default();
        }
        for &l in scope.lambdas() {
            for succ in jump_target(world, l) {
                if members.contains(&succ) {
                    succs.get_mut(&l).unwrap().push(succ);
                    preds.get_mut(&succ).unwrap().push(l);
                }
            }
        }
        Cfg {
            entry: scope.entry(),
            members,
            succs,
            preds,
            f_view: OnceCell::new(),
            b_view: OnceCell::new(),
            domtree: OnceCell::new(),
            postdomtree: OnceCell::new(),
            looptree: OnceCell::new(),
        }
    }

    #[must_use] pub fn nodes(&self) -> impl Iterator<Item = DefId> + '_ { self.members.iter().copied() }

    /// Exit nodes: members whose jump never lands on another member —
    /// the roots for `b_cfg`'s reverse-postorder DFS, avoiding any
    /// single virtual-exit sentinel (the original's `sid(nullptr)`
    /// collision this sidesteps by construction: there is no node
    /// whose id is "null", only a DFS seeded from possibly-many roots).
    fn exit_nodes(&self) -> Vec<DefId> {
        self.succs.iter().filter(|entry| entry.1.is_empty()).map(|entry| *entry.0).collect()
    }

    #[must_use] pub fn f_cfg(&self) -> &CfgView<true> {
        self.f_view.get_or_init(|| rpo_view(&self.succs, &[self.entry]))
    }

    #[must_use] pub fn b_cfg(&self) -> &CfgView<false> {
        self.b_view.get_or_init(|| rpo_view(&self.preds, &self.exit_nodes()))
    }

    /// Lazy externally-computed slot: the first
    /// caller's `compute` wins and every later caller, even with a
    /// different closure, sees that same result.
    pub fn domtree<T: 'static>(&self, compute: impl FnOnce() -> T) -> &T {
        self.domtree.get_or_init(|| Box::new(compute())).downcast_ref().expect("domtree requested at a different type than it was first cached with")
    }
    pub fn postdomtree<T: 'static>(&self, compute: impl FnOnce() -> T) -> &T {
        self.postdomtree.get_or_init(|| Box::new(compute())).downcast_ref().expect("postdomtree requested at a different type than it was first cached with")
    }
    pub fn looptree<T: 'static>(&self, compute: impl FnOnce() -> T) -> &T {
        self.looptree.get_or_init(|| Box::new(compute())).downcast_ref().expect("looptree requested at a different type than it was first cached with")
    }

    /// `cfa()`: the set of lambdas that may flow
    /// into each `Param` of a function-typed parameter, by direct
    /// call-site assignment plus a restricted fixpoint.
    ///
    /// Preserves an observed quirk rather than "fixing" it: only
    /// direct-lambda arguments at
    /// a statically-known call site seed a `Param`'s flow set; once
    /// seeded, the fixpoint propagates *only* along edges where the
    /// argument position is itself another `Param` (never re-scanning
    /// call sites for additional direct-lambda contributions after the
    /// first pass). A parameter with no caller inside the scope — e.g.
    /// an entry lambda nobody in the scope jumps to — ends up with an
    /// empty flow set, which is the documented behavior rather than an
    /// error.
    #[must_use]
    pub fn cfa(&self, world: &World) -> Cfa {
        let mut flow: HashMap<DefId, HashSet<DefId>> = HashMap::new();
        let mut param_edges: Vec<(DefId, DefId)> = Vec::new();

        for &l in &self.members {
            let Some(data) = world.def(l).as_lambda() else { continue };
            let Some(jump) = &data.body else { continue };
            let Some(callee_data) = world.def(jump.to).as_lambda() else { continue };
            for (&formal, &actual) in callee_data.params.iter().zip(jump.args.iter()) {
                match &world.def(actual).kind {
                    DefKind::Lambda(_) => { flow.entry(formal).or_default().insert(actual); }
                    DefKind::Param { .. } => param_edges.push((actual, formal)),
                    _ => {}
                }
            }
        }

        loop {
            let mut changed = false;
            for &(from, to) in &param_edges {
                let from_set = flow.get(&from).cloned().unwrap_or_default();
                let to_set = flow.entry(to).or_default();
                for l in from_set {
                    changed |= to_set.insert(l);
                }
            }
            if !changed {
                break;
            }
        }

        Cfa { flow }
    }
}

/// The result of [`Cfg::cfa`]: which lambdas may reach each `Param`.
pub struct Cfa {
    flow: HashMap<DefId, HashSet<DefId>>,
}

impl Cfa {
    #[must_use] pub fn flow_set(&self, param: DefId) -> HashSet<DefId> {
        self.flow.get(&param).cloned().unwrap_or_default()
    }
}

fn jump_target(world: &World, l: DefId) -> Option<DefId> {
    world.def(l).as_lambda().and_then(|data| data.body.as_ref()).map(|jump| jump.to)
}

fn rpo_view<const FORWARD: bool>(adj: &HashMap<DefId, Vec<DefId>>, roots: &[DefId]) -> CfgView<FORWARD> {
    // Direction is encoded entirely by which adjacency map (`succs` or
    // `preds`) the caller passes in; the const parameter only tags the
    // resulting view's type so `f_cfg`/`b_cfg` can't be confused.
    let mut visited: HashSet<DefId> = HashSet::new();
    let mut postorder: Vec<DefId> = Vec::new();
    for &root in roots {
        if visited.contains(&root) {
            continue;
        }
        dfs_postorder(adj, root, &mut visited, &mut postorder);
    }
    postorder.reverse();
    let sid = postorder.iter().enumerate().map(|(i, &l)| (l, i)).collect();
    CfgView { rpo: postorder, sid }
}

fn dfs_postorder(adj: &HashMap<DefId, Vec<DefId>>, node: DefId, visited: &mut HashSet<DefId>, out: &mut Vec<DefId>) {
    visited.insert(node);
    if let Some(succs) = adj.get(&node) {
        for &succ in succs {
            if !visited.contains(&succ) {
                dfs_postorder(adj, succ, visited, out);
            }
        }
    }
    out.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ArithKind, CallingConv, Intrinsic, Loc};
    use crate::value::{BaseKind, PrimBox, PrimKind};

    fn isolated_lambda_world() -> (World, DefId, DefId) {
        let mut world = World::new("test");
        let i32_ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        let k_ty = world.fn_ty(vec![i32_ty]);
        let fn_ty = world.fn_ty(vec![i32_ty, k_ty]);
        let l = world.lambda(fn_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("L"));
        let p = world.param(i32_ty, l, 0, Loc::unknown(), Some("p"));
        let k = world.param(k_ty, l, 1, Loc::unknown(), Some("k"));
        let one = world.literal(BaseKind::I32, false, PrimBox::I32(1), Loc::unknown(), None);
        let p_plus_1 = world.arithop(ArithKind::Add, p, one, Loc::unknown(), None);
        world.set_body(l, k, &[p_plus_1]);
        (world, l, p)
    }

    #[test]
    fn s5_single_node_scope_has_a_one_node_f_cfg() {
        let (world, l, _p) = isolated_lambda_world();
        let scope = Scope::new(&world, l);
        let cfg = Cfg::new(&world, &scope);
        let view = cfg.f_cfg();
        assert_eq!(view.nodes(), &[l]);
        assert_eq!(view.sid(l), Some(0));
    }

    #[test]
    fn s5_cfa_with_no_callers_leaves_the_param_flow_set_empty() {
        let (world, l, p) = isolated_lambda_world();
        let scope = Scope::new(&world, l);
        let cfg = Cfg::new(&world, &scope);
        let cfa = cfg.cfa(&world);
        assert!(cfa.flow_set(p).is_empty());
    }

    #[test]
    fn s8_cfa_fixpoint_propagates_a_lambda_across_two_param_hops() {
        let mut world = World::new("test");
        let i32_ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        let cont_ty = world.fn_ty(vec![i32_ty]);
        let relay_ty = world.fn_ty(vec![cont_ty]);
        let entry_ty = world.fn_ty(Vec::new());

        let sink = world.lambda(cont_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("sink"));
        let s = world.param(cont_ty, sink, 0, Loc::unknown(), Some("s"));
        let zero = world.literal(BaseKind::I32, false, PrimBox::I32(0), Loc::unknown(), None);
        world.set_body(sink, s, &[zero]);

        let relay2 = world.lambda(relay_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("relay2"));
        let r2 = world.param(cont_ty, relay2, 0, Loc::unknown(), Some("r2"));
        world.set_body(relay2, sink, &[r2]);

        let relay1 = world.lambda(relay_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("relay1"));
        let r1 = world.param(cont_ty, relay1, 0, Loc::unknown(), Some("r1"));
        world.set_body(relay1, relay2, &[r1]);

        let entry = world.lambda(entry_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("entry"));
        let k = world.lambda(cont_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("k"));
        world.set_body(entry, relay1, &[k]);

        let scope = Scope::new(&world, entry);
        assert_eq!(scope.size(), 4);
        let cfg = Cfg::new(&world, &scope);
        let cfa = cfg.cfa(&world);

        assert_eq!(cfa.flow_set(r1), [k].into_iter().collect());
        assert_eq!(cfa.flow_set(s), [k].into_iter().collect());
    }

    #[test]
    fn domtree_cache_returns_the_same_value_on_every_call() {
        let (world, l, _p) = isolated_lambda_world();
        let scope = Scope::new(&world, l);
        let cfg = Cfg::new(&world, &scope);
        let first = *cfg.domtree(|| 7usize);
        let second = *cfg.domtree(|| 99usize);
        assert_eq!(first, 7);
        assert_eq!(second, 7);
    }
}

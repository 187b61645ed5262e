//! Scopes: the set of lambdas reachable from an
//! entry continuation through jumps, closed under the free-variable
//! rule ("every Param used inside belongs to a scope member").
//!
//! Grounded on `build_vcode.rs`'s block-worklist traversal (the same
//! `VecDeque` + `seen`-set BFS shape used there to walk basic blocks
//! reachable from a function's entry) generalized from "successor
//! block" to "successor lambda, plus whoever owns a free Param".

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use crate::def::{DefId, DefKind};
use crate::world::World;

/// A reachable-lambda closure rooted at one entry.
pub struct Scope {
    entry: DefId,
    members: Vec<DefId>,
    index: HashMap<DefId, usize>,
}

impl Scope {
    /// `Scope::new(entry)`. Takes `world` explicitly rather than
    /// borrowing it for the `Scope`'s lifetime — every later query re-supplies it.
    #[must_use]
    pub fn new(world: &World, entry: DefId) -> Self {
        assert!(world.def(entry).is_lambda(), "Scope::new needs a lambda entry");

        let mut members = Vec::new();
        let mut index = HashMap::new();
        let mut seen: HashSet<DefId> = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(entry);
        queue.push_back(entry);

        while let Some(l) = queue.pop_front() {
            index.insert(l, members.len());
            members.push(l);

            for succ in successors(world, l) {
                if seen.insert(succ) {
                    queue.push_back(succ);
                }
            }
            for owner in free_param_owners(world, l) {
                if seen.insert(owner) {
                    queue.push_back(owner);
                }
            }
        }

        Scope { entry, members, index }
    }

    #[must_use] pub fn entry(&self) -> DefId { self.entry }
    #[must_use] pub fn size(&self) -> usize { self.members.len() }
    #[must_use] pub fn contains(&self, l: DefId) -> bool { self.index.contains_key(&l) }
    #[must_use] pub fn lambdas(&self) -> &[DefId] { &self.members }

    /// `for_each<top_level>(world, f)`: visit every
    /// member; when `TOP_LEVEL` is set, skip members that are
    /// themselves nested inside another member's free-variable closure
    /// (approximated here as "every member but the entry", since this
    /// kernel doesn't model nested scopes as a tree).
    pub fn for_each<const TOP_LEVEL: bool>(&self, mut f: impl FnMut(DefId)) {
        for &l in &self.members {
            if TOP_LEVEL && l != self.entry {
                continue;
            }
            f(l);
        }
    }
}

impl std::ops::Index<usize> for Scope {
    type Output = DefId;
    fn index(&self, i: usize) -> &DefId { &self.members[i] }
}

/// Direct jump successors: only a statically-known `Lambda` callee
/// counts (a callee reached only through a `Param` is resolved by
/// [`crate::cfg::cfa`], not by scope construction).
fn successors(world: &World, l: DefId) -> Vec<DefId> {
    let Some(data) = world.def(l).as_lambda() else { return Vec::new() };
    match &data.body {
        Some(jump) if world.def(jump.to).is_lambda() => vec![jump.to],
        _ => Vec::new(),
    }
}

/// Every lambda that owns a `Param` reachable from `l`'s body through
/// pure operands (not descending into other lambdas' bodies).
fn free_param_owners(world: &World, l: DefId) -> HashSet<DefId> {
    let mut owners = HashSet::new();
    let Some(data) = world.def(l).as_lambda() else { return owners };
    let Some(jump) = &data.body else { return owners };

    let mut visited = HashSet::new();
    let mut stack: Vec<DefId> = std::iter::once(jump.to).chain(jump.args.iter().copied()).collect();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        match &world.def(id).kind {
            DefKind::Param { lambda, .. } => {
                if *lambda != l {
                    owners.insert(*lambda);
                }
            }
            DefKind::Lambda(_) => {} // a lambda value itself isn't descended into here
            kind => stack.extend(kind.operands()),
        }
    }
    owners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{CallingConv, Intrinsic, Loc};
    use crate::value::{BaseKind, PrimKind};

    #[test]
    fn s5_scope_around_an_isolated_lambda_has_one_member() {
        let mut world = World::new("test");
        let i32_ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        let k_ty = world.fn_ty(vec![i32_ty]);
        let fn_ty = world.fn_ty(vec![i32_ty, k_ty]);
        let l = world.lambda(fn_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("L"));
        let p = world.param(i32_ty, l, 0, Loc::unknown(), Some("p"));
        let k = world.param(k_ty, l, 1, Loc::unknown(), Some("k"));
        let one = world.literal(BaseKind::I32, false, crate::value::PrimBox::I32(1), Loc::unknown(), None);
        let p_plus_1 = world.arithop(crate::def::ArithKind::Add, p, one, Loc::unknown(), None);
        world.set_body(l, k, &[p_plus_1]);

        let scope = Scope::new(&world, l);
        assert_eq!(scope.size(), 1);
        assert!(scope.contains(l));
        assert_eq!(scope.entry(), l);
    }
}

//! Mark-sweep cleanup: unreachable-code
//! elimination over lambdas, then dead-code elimination over the
//! remaining operand graph.
//!
//! Grounded on `build_mir.rs`'s post-pass liveness sweep (clear a
//! bitset, DFS from the roots, delete what wasn't touched) generalized
//! into a two-phase shape: one DFS over lambda successor edges, then a
//! second over the pure operand graph with the Param/caller special
//! case.

use hashbrown::HashSet;

use crate::def::{new_mark_set, DefId, DefKind};
use crate::idx::Idx;
use crate::world::World;

/// `cleanup()` / `opt()`.
///
/// `reachable_roots` seeds step 2's lambda-reachability DFS (typically
/// a module's external/exported lambdas); `live_roots` seeds step 4's
/// def-liveness DFS (typically the same lambdas, since a lambda that
/// survives UCE is live, plus anything a client wants kept regardless
/// of reachability, e.g. debug-only globals).
pub fn cleanup(world: &mut World, reachable_roots: &[DefId], live_roots: &[DefId]) {
    let capacity = world.defs.len();

    // The built-in `branch`/`end_scope` intrinsics
    // are always kept, the way the original's constructor-owned
    // `branch_`/`end_scope_` members never go through the ordinary
    // reachability sweep: a caller should not need to remember to
    // re-list them on every `cleanup` call.
    let builtins = [world.branch(), world.end_scope()];

    // Steps 1-3: unreachable-code elimination over lambdas.
    let mut reached = new_mark_set(capacity);
    let mut queue: Vec<DefId> = reachable_roots.iter().copied().chain(builtins).collect();
    for &r in reachable_roots.iter().chain(builtins.iter()) {
        reached.insert(r.as_u32() as usize);
    }
    while let Some(l) = queue.pop() {
        for succ in lambda_successors(world, l) {
            if reached.insert(succ.as_u32() as usize) {
                queue.push(succ);
            }
        }
    }
    let dead_lambdas: Vec<DefId> = world.iter_defs()
        .filter(|d| d.is_lambda() && !reached.contains(d.id.as_u32() as usize))
        .map(|d| d.id)
        .collect();
    destroy_lambdas(world, &dead_lambdas);

    // Steps 4-5: dead-code elimination over the remaining operand graph.
    let capacity = world.defs.len();
    let mut live = new_mark_set(capacity);
    let mut queue: Vec<DefId> = live_roots.iter().copied().chain(builtins).collect();
    for &r in live_roots.iter().chain(builtins.iter()) {
        live.insert(r.as_u32() as usize);
    }
    while let Some(id) = queue.pop() {
        if !world.defs.get(id).map_or(false, Option::is_some) {
            continue;
        }
        for op in world.def(id).operands() {
            if live.insert(op.as_u32() as usize) {
                queue.push(op);
            }
        }
        if let DefKind::Param { lambda, .. } = &world.def(id).kind {
            let lambda = *lambda;
            if live.insert(lambda.as_u32() as usize) {
                queue.push(lambda);
            }
            mark_phi_callers(world, lambda, &mut live, &mut queue);
        }
    }

    let dead: Vec<DefId> = world.iter_defs()
        .filter(|d| !live.contains(d.id.as_u32() as usize))
        .map(|d| d.id)
        .collect();
    let (dead_lambdas, dead_pure): (Vec<DefId>, Vec<DefId>) = dead.into_iter().partition(|&id| world.def(id).is_lambda());
    destroy_lambdas(world, &dead_lambdas);
    for id in dead_pure {
        force_delete_pure(world, id);
    }
}

/// Tear down a batch of mutually-dead lambdas. `destroy_body` runs on
/// all of them first so every edge they contribute to each other's
/// use-lists is gone before `World::destroy`'s empty-use-list assert
/// runs on any one of them, regardless of which order they're visited
/// in.
fn destroy_lambdas(world: &mut World, lambdas: &[DefId]) {
    for &l in lambdas {
        world.destroy_body(l);
    }
    for &l in lambdas {
        world.destroy(l);
    }
}

fn lambda_successors(world: &World, l: DefId) -> Vec<DefId> {
    match world.defs.get(l).and_then(Option::as_ref).and_then(|d| d.as_lambda()) {
        Some(data) => match &data.body {
            Some(jump) if world.defs.get(jump.to).and_then(Option::as_ref).is_some_and(crate::def::Def::is_lambda) => vec![jump.to],
            _ => Vec::new(),
        },
        None => Vec::new(),
    }
}

/// Step 4's special case: when a live `Param` of `lambda` is found,
/// every caller that jumps to `lambda` is phi-like and must be marked
/// too, since `lambda`'s params are only ever bound by its callers'
/// jump arguments.
fn mark_phi_callers(world: &World, lambda: DefId, live: &mut bit_set::BitSet, queue: &mut Vec<DefId>) {
    let callers: HashSet<DefId> = world.def(lambda).uses.iter()
        .map(|&(user, _)| user)
        .filter(|&user| world.defs.get(user).and_then(Option::as_ref).is_some_and(crate::def::Def::is_lambda))
        .filter(|&user| world.def(user).as_lambda().and_then(|d| d.body.as_ref()).is_some_and(|j| j.to == lambda))
        .collect();
    for caller in callers {
        if live.insert(caller.as_u32() as usize) {
            queue.push(caller);
        }
    }
}

/// Remove a dead pure/param def directly (it is never CSE-registered
/// twice, and nothing still live references it by construction of the
/// liveness DFS above), unregistering it from the interner and from
/// its operands' use-lists.
fn force_delete_pure(world: &mut World, id: DefId) {
    let operands = world.def(id).operands();
    for (i, op) in operands.iter().enumerate() {
        if let Some(def) = world.defs.get_mut(*op).and_then(Option::as_mut) {
            def.uses.remove(&(id, u32::try_from(i).expect("operand index overflow")));
        }
    }
    if let Some(def) = world.defs.get(id).and_then(Option::as_ref) {
        world.interner.remove(def);
    }
    world.defs[id] = None;
}

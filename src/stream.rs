//! Textual dump, a thin client of the kernel rather than a client of
//! the core def/type graph itself: `module '<name>'` header, one block
//! per scope, `λ_<gid>(params) = to(args)` lambda lines,
//! literal-with-type-suffix rendering, and the right-elided
//! `file:line col col - file:line col col` location format.
//!
//! Grounded on `build_mir.rs`'s `Display`-style dumper: one line per
//! definition, operands printed inline when cheap (literals) and by
//! reference otherwise, the same shape this module follows for defs.

use std::fmt::{self, Write};

use hashbrown::HashSet;
use itertools::Itertools;

use crate::def::{DefId, DefKind, Loc};
use crate::scope::Scope;
use crate::ty::{TypeId, TypeKind};
use crate::value::PrimBox;
use crate::world::World;

/// `World::stream(out, roots)`.
pub fn stream(world: &World, out: &mut dyn Write, roots: &[DefId]) -> fmt::Result {
    writeln!(out, "module '{}'", world.name())?;
    let mut printed: HashSet<DefId> = HashSet::new();

    for &root in roots {
        writeln!(out)?;
        let scope = Scope::new(world, root);
        for &l in scope.lambdas() {
            if printed.insert(l) {
                write_lambda(world, out, l)?;
            }
        }
    }

    let globals: Vec<DefId> = world.iter_defs()
        .filter(|d| matches!(d.kind, DefKind::Global { .. }) && !printed.contains(&d.id))
        .map(|d| d.id)
        .collect();
    if !globals.is_empty() {
        writeln!(out)?;
    }
    for g in globals {
        writeln!(out, "{} = {} {}", operand_ref(world, g), format_kind(world, g), format_loc(&world.def(g).loc))?;
        printed.insert(g);
    }

    Ok(())
}

fn write_lambda(world: &World, out: &mut dyn Write, l: DefId) -> fmt::Result {
    let data = world.def(l).as_lambda().expect("scope member must be a lambda");
    let params = data.params.iter()
        .map(|&p| format!("{}: {}", operand_ref(world, p), type_name(world, world.ty_of(p))))
        .join(", ");
    let body = match &data.body {
        Some(jump) => {
            let args = jump.args.iter().map(|&a| operand_ref(world, a)).join(", ");
            format!("{}({args})", operand_ref(world, jump.to))
        }
        None => "<no body>".to_string(),
    };
    writeln!(out, "{}({params}) = {body} {}", lambda_ref(l), format_loc(&world.def(l).loc))
}

fn format_kind(world: &World, id: DefId) -> String {
    match &world.def(id).kind {
        DefKind::Global { init, is_mutable } => {
            let kw = if *is_mutable { "global" } else { "global const" };
            format!("{kw} {}", operand_ref(world, *init))
        }
        other => other.name().to_string(),
    }
}

/// A literal prints as `value:type`; every other def is referred to by
/// its gid, `λ_<gid>` if it happens to be a lambda.
fn operand_ref(world: &World, id: DefId) -> String {
    match &world.def(id).kind {
        DefKind::Literal(v) => format!("{}:{}", format_literal(v), type_name(world, world.ty_of(id))),
        DefKind::Lambda(_) => lambda_ref(id),
        _ => format!("%{}", gid(id)),
    }
}

fn lambda_ref(id: DefId) -> String { format!("λ_{}", gid(id)) }

fn gid(id: DefId) -> u32 { id.as_u32() }

fn format_literal(v: &PrimBox) -> String {
    match *v {
        PrimBox::I8(n) => n.to_string(), PrimBox::I16(n) => n.to_string(),
        PrimBox::I32(n) => n.to_string(), PrimBox::I64(n) => n.to_string(),
        PrimBox::U8(n) => n.to_string(), PrimBox::U16(n) => n.to_string(),
        PrimBox::U32(n) => n.to_string(), PrimBox::U64(n) => n.to_string(),
        PrimBox::F32(n) => n.to_string(), PrimBox::F64(n) => n.to_string(),
        PrimBox::Bool(b) => b.to_string(),
    }
}

fn type_name(world: &World, ty: TypeId) -> String {
    match world.type_kind(ty) {
        TypeKind::Primitive(k, 1) => base_name(k.base).to_string(),
        TypeKind::Primitive(k, n) => format!("{}x{n}", base_name(k.base)),
        TypeKind::Pointer(inner, addr_space) => format!("ptr({}, {addr_space})", type_name(world, *inner)),
        TypeKind::Tuple(elems) => format!("({})", elems.iter().map(|&t| type_name(world, t)).join(", ")),
        TypeKind::Function(params) => format!("fn({})", params.iter().map(|&t| type_name(world, t)).join(", ")),
        TypeKind::Memory => "mem".to_string(),
        TypeKind::Frame => "frame".to_string(),
        TypeKind::DefiniteArray(elem, dim) => format!("[{} x {dim}]", type_name(world, *elem)),
        TypeKind::IndefiniteArray(elem) => format!("[{}]", type_name(world, *elem)),
        TypeKind::Struct(tag, _) => tag.to_string(),
        TypeKind::Vector(elem, len) => format!("{}x{len}", type_name(world, *elem)),
        TypeKind::TypeVar(n) => format!("'t{n}"),
    }
}

fn base_name(base: crate::value::BaseKind) -> &'static str {
    use crate::value::BaseKind;
    match base {
        BaseKind::I8 => "i8", BaseKind::I16 => "i16", BaseKind::I32 => "i32", BaseKind::I64 => "i64",
        BaseKind::U8 => "u8", BaseKind::U16 => "u16", BaseKind::U32 => "u32", BaseKind::U64 => "u64",
        BaseKind::F32 => "f32", BaseKind::F64 => "f64", BaseKind::Bool => "bool",
    }
}

/// `file:line col col - file:line col col`, right-elided when the end
/// coincides with the start: same line drops the repeated file/line,
/// same column drops the repeated range.
fn format_loc(loc: &Loc) -> String {
    if loc.begin_line == loc.end_line {
        if loc.begin_col == loc.end_col {
            format!("@ {}:{} {}", loc.file, loc.begin_line, loc.begin_col)
        } else {
            format!("@ {}:{} {} {}", loc.file, loc.begin_line, loc.begin_col, loc.end_col)
        }
    } else {
        format!("@ {}:{} {} - {}:{} {}", loc.file, loc.begin_line, loc.begin_col, loc.end_line, loc.end_col, loc.begin_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ArithKind, CallingConv, Intrinsic};
    use crate::value::{BaseKind, PrimKind};

    #[test]
    fn streams_a_module_header_and_one_lambda_line() {
        let mut world = World::new("demo");
        let i32_ty = world.prim_ty(PrimKind::precise(BaseKind::I32), 1);
        let k_ty = world.fn_ty(vec![i32_ty]);
        let fn_ty = world.fn_ty(vec![i32_ty, k_ty]);
        let l = world.lambda(fn_ty, Loc::unknown(), CallingConv::default(), Intrinsic::NONE, Some("L"));
        let p = world.param(i32_ty, l, 0, Loc::unknown(), Some("p"));
        let k = world.param(k_ty, l, 1, Loc::unknown(), Some("k"));
        let one = world.literal(BaseKind::I32, false, PrimBox::I32(1), Loc::unknown(), None);
        let p_plus_1 = world.arithop(ArithKind::Add, p, one, Loc::unknown(), None);
        world.set_body(l, k, &[p_plus_1]);

        let mut out = String::new();
        stream(&world, &mut out, &[l]).unwrap();

        assert!(out.starts_with("module 'demo'"));
        assert!(out.contains("λ_"));
        assert!(out.contains("1:i32"));
    }

    #[test]
    fn location_with_matching_line_elides_the_file_repeat() {
        let loc = Loc { file: std::rc::Rc::from("a.thorin"), begin_line: 3, begin_col: 1, end_line: 3, end_col: 9 };
        let formatted = format_loc(&loc);
        assert_eq!(formatted, "@ a.thorin:3 1 9");
    }
}

//! Primitive value model: a tagged box over the IR's numeric primitive
//! kinds, plus the native operations that constant folding dispatches
//! on.
//!
//! `world.cpp` expands a per-op, per-kind `#include
//! "thorin/tables/primtypetable.h"` X-macro roughly ten times over (once
//! per arithmetic operator, once per comparison, once per cast
//! direction). Here a handful of macros generate one match arm per kind
//! instead of one file inclusion per kind per operator.

use std::hash::{Hash, Hasher};

/// The primitive numeric kinds the box can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseKind {
    I8, I16, I32, I64,
    U8, U16, U32, U64,
    F32, F64,
    Bool,
}

impl BaseKind {
    pub const ALL: [BaseKind; 11] = [
        BaseKind::I8, BaseKind::I16, BaseKind::I32, BaseKind::I64,
        BaseKind::U8, BaseKind::U16, BaseKind::U32, BaseKind::U64,
        BaseKind::F32, BaseKind::F64, BaseKind::Bool,
    ];

    #[must_use] pub fn is_float(self) -> bool { matches!(self, BaseKind::F32 | BaseKind::F64) }
    #[must_use] pub fn is_int(self) -> bool { !self.is_float() }

    #[must_use] pub fn bits(self) -> u32 {
        match self {
            BaseKind::I8 | BaseKind::U8 => 8,
            BaseKind::I16 | BaseKind::U16 => 16,
            BaseKind::I32 | BaseKind::U32 | BaseKind::F32 => 32,
            BaseKind::I64 | BaseKind::U64 | BaseKind::F64 => 64,
            BaseKind::Bool => 1,
        }
    }
}

/// A primitive kind together with the precise/quick overflow-strictness
/// hint. The two flavors are semantically identical as far as the
/// *value* is concerned; `quick` only changes
/// what the builder does when a native op would overflow: quick wraps,
/// precise materializes `Bottom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrimKind {
    pub base: BaseKind,
    pub quick: bool,
}

impl PrimKind {
    #[must_use] pub const fn new(base: BaseKind, quick: bool) -> Self { Self { base, quick } }
    #[must_use] pub const fn precise(base: BaseKind) -> Self { Self::new(base, false) }
    #[must_use] pub const fn quick(base: BaseKind) -> Self { Self::new(base, true) }
}

/// A tagged primitive literal value.
#[derive(Clone, Copy, Debug)]
pub enum PrimBox {
    I8(i8), I16(i16), I32(i32), I64(i64),
    U8(u8), U16(u16), U32(u32), U64(u64),
    F32(f32), F64(f64),
    Bool(bool),
}

impl PrimBox {
    #[must_use] pub fn base(&self) -> BaseKind {
        match self {
            PrimBox::I8(_) => BaseKind::I8, PrimBox::I16(_) => BaseKind::I16,
            PrimBox::I32(_) => BaseKind::I32, PrimBox::I64(_) => BaseKind::I64,
            PrimBox::U8(_) => BaseKind::U8, PrimBox::U16(_) => BaseKind::U16,
            PrimBox::U32(_) => BaseKind::U32, PrimBox::U64(_) => BaseKind::U64,
            PrimBox::F32(_) => BaseKind::F32, PrimBox::F64(_) => BaseKind::F64,
            PrimBox::Bool(_) => BaseKind::Bool,
        }
    }

    #[must_use] pub fn is_zero(&self) -> bool {
        match *self {
            PrimBox::I8(n) => n == 0, PrimBox::I16(n) => n == 0,
            PrimBox::I32(n) => n == 0, PrimBox::I64(n) => n == 0,
            PrimBox::U8(n) => n == 0, PrimBox::U16(n) => n == 0,
            PrimBox::U32(n) => n == 0, PrimBox::U64(n) => n == 0,
            PrimBox::F32(n) => n == 0.0, PrimBox::F64(n) => n == 0.0,
            PrimBox::Bool(b) => !b,
        }
    }

    #[must_use] pub fn is_one(&self) -> bool {
        match *self {
            PrimBox::I8(n) => n == 1, PrimBox::I16(n) => n == 1,
            PrimBox::I32(n) => n == 1, PrimBox::I64(n) => n == 1,
            PrimBox::U8(n) => n == 1, PrimBox::U16(n) => n == 1,
            PrimBox::U32(n) => n == 1, PrimBox::U64(n) => n == 1,
            PrimBox::F32(n) => n == 1.0, PrimBox::F64(n) => n == 1.0,
            PrimBox::Bool(b) => b,
        }
    }

    /// True iff every bit of this (integer) value is set ("allset").
    #[must_use] pub fn is_allset(&self) -> bool {
        match *self {
            PrimBox::I8(n) => n == -1, PrimBox::I16(n) => n == -1,
            PrimBox::I32(n) => n == -1, PrimBox::I64(n) => n == -1,
            PrimBox::U8(n) => n == u8::MAX, PrimBox::U16(n) => n == u16::MAX,
            PrimBox::U32(n) => n == u32::MAX, PrimBox::U64(n) => n == u64::MAX,
            PrimBox::Bool(b) => b,
            PrimBox::F32(_) | PrimBox::F64(_) => false,
        }
    }

    /// Construct the zero / one / allset literal of a given int kind.
    #[must_use] pub fn zero_of(base: BaseKind) -> Self { Self::int_const(base, 0) }
    #[must_use] pub fn one_of(base: BaseKind) -> Self { Self::int_const(base, 1) }
    #[must_use] pub fn allset_of(base: BaseKind) -> Self {
        match base {
            BaseKind::I8 => PrimBox::I8(-1), BaseKind::I16 => PrimBox::I16(-1),
            BaseKind::I32 => PrimBox::I32(-1), BaseKind::I64 => PrimBox::I64(-1),
            BaseKind::U8 => PrimBox::U8(u8::MAX), BaseKind::U16 => PrimBox::U16(u16::MAX),
            BaseKind::U32 => PrimBox::U32(u32::MAX), BaseKind::U64 => PrimBox::U64(u64::MAX),
            BaseKind::Bool => PrimBox::Bool(true),
            BaseKind::F32 | BaseKind::F64 => panic!("allset is only defined for integer kinds"),
        }
    }

    fn int_const(base: BaseKind, n: i64) -> Self {
        match base {
            BaseKind::I8 => PrimBox::I8(n as i8), BaseKind::I16 => PrimBox::I16(n as i16),
            BaseKind::I32 => PrimBox::I32(n as i32), BaseKind::I64 => PrimBox::I64(n),
            BaseKind::U8 => PrimBox::U8(n as u8), BaseKind::U16 => PrimBox::U16(n as u16),
            BaseKind::U32 => PrimBox::U32(n as u32), BaseKind::U64 => PrimBox::U64(n as u64),
            BaseKind::Bool => PrimBox::Bool(n != 0),
            BaseKind::F32 | BaseKind::F64 => panic!("int_const on a float kind"),
        }
    }

    /// The value as a `u64` shift amount, for the shl/shr bitwidth check.
    #[must_use] pub fn as_shift_amount(&self) -> Option<u64> {
        match *self {
            PrimBox::I8(n) => u64::try_from(n).ok(), PrimBox::I16(n) => u64::try_from(n).ok(),
            PrimBox::I32(n) => u64::try_from(n).ok(), PrimBox::I64(n) => u64::try_from(n).ok(),
            PrimBox::U8(n) => Some(u64::from(n)), PrimBox::U16(n) => Some(u64::from(n)),
            PrimBox::U32(n) => Some(u64::from(n)), PrimBox::U64(n) => Some(n),
            _ => None,
        }
    }

    #[must_use] pub fn as_bool(&self) -> bool {
        match *self { PrimBox::Bool(b) => b, _ => panic!("as_bool on a non-boolean box") }
    }

    /// Bit-pattern used for hashing/equality: NaN payloads and signs are
    /// distinguished (two `PrimBox` literals are only CSE-equal if they
    /// have the exact same bit pattern), matching "structural uniqueness
    /// of pure defs" without special-casing float `NaN`.
    fn bit_key(&self) -> (u8, u64) {
        match *self {
            PrimBox::I8(n) => (0, n as u8 as u64), PrimBox::I16(n) => (1, n as u16 as u64),
            PrimBox::I32(n) => (2, n as u32 as u64), PrimBox::I64(n) => (3, n as u64),
            PrimBox::U8(n) => (4, u64::from(n)), PrimBox::U16(n) => (5, u64::from(n)),
            PrimBox::U32(n) => (6, u64::from(n)), PrimBox::U64(n) => (7, n),
            PrimBox::F32(n) => (8, u64::from(n.to_bits())), PrimBox::F64(n) => (9, n.to_bits()),
            PrimBox::Bool(b) => (10, u64::from(b)),
        }
    }
}

impl PartialEq for PrimBox {
    fn eq(&self, other: &Self) -> bool { self.bit_key() == other.bit_key() }
}
impl Eq for PrimBox {}
impl Hash for PrimBox {
    fn hash<H: Hasher>(&self, state: &mut H) { self.bit_key().hash(state); }
}

/// Generates one match arm per integer [`BaseKind`] for a checked/wrapping
/// pair of operations, honoring the precise/quick hint. Division and
/// shift need their own zero/bitwidth checks on top of this, so they
/// are not built from this macro.
macro_rules! int_binop {
    ($a:expr, $b:expr, $quick:expr, $checked:ident, $wrapping:ident) => {
        match ($a, $b) {
            (PrimBox::I8(a), PrimBox::I8(b)) => Some(if $quick { PrimBox::I8(a.$wrapping(*b)) } else { PrimBox::I8(a.$checked(*b)?) }),
            (PrimBox::I16(a), PrimBox::I16(b)) => Some(if $quick { PrimBox::I16(a.$wrapping(*b)) } else { PrimBox::I16(a.$checked(*b)?) }),
            (PrimBox::I32(a), PrimBox::I32(b)) => Some(if $quick { PrimBox::I32(a.$wrapping(*b)) } else { PrimBox::I32(a.$checked(*b)?) }),
            (PrimBox::I64(a), PrimBox::I64(b)) => Some(if $quick { PrimBox::I64(a.$wrapping(*b)) } else { PrimBox::I64(a.$checked(*b)?) }),
            (PrimBox::U8(a), PrimBox::U8(b)) => Some(if $quick { PrimBox::U8(a.$wrapping(*b)) } else { PrimBox::U8(a.$checked(*b)?) }),
            (PrimBox::U16(a), PrimBox::U16(b)) => Some(if $quick { PrimBox::U16(a.$wrapping(*b)) } else { PrimBox::U16(a.$checked(*b)?) }),
            (PrimBox::U32(a), PrimBox::U32(b)) => Some(if $quick { PrimBox::U32(a.$wrapping(*b)) } else { PrimBox::U32(a.$checked(*b)?) }),
            (PrimBox::U64(a), PrimBox::U64(b)) => Some(if $quick { PrimBox::U64(a.$wrapping(*b)) } else { PrimBox::U64(a.$checked(*b)?) }),
            _ => unreachable!("int_binop on non-integer or mismatched PrimBox kinds"),
        }
    };
}

/// Generates a match arm per [`BaseKind`] (integer and boolean) for a
/// no-overflow bitwise op.
macro_rules! bitwise_binop {
    ($a:expr, $b:expr, $op:tt) => {
        match ($a, $b) {
            (PrimBox::I8(a), PrimBox::I8(b)) => PrimBox::I8(a $op b),
            (PrimBox::I16(a), PrimBox::I16(b)) => PrimBox::I16(a $op b),
            (PrimBox::I32(a), PrimBox::I32(b)) => PrimBox::I32(a $op b),
            (PrimBox::I64(a), PrimBox::I64(b)) => PrimBox::I64(a $op b),
            (PrimBox::U8(a), PrimBox::U8(b)) => PrimBox::U8(a $op b),
            (PrimBox::U16(a), PrimBox::U16(b)) => PrimBox::U16(a $op b),
            (PrimBox::U32(a), PrimBox::U32(b)) => PrimBox::U32(a $op b),
            (PrimBox::U64(a), PrimBox::U64(b)) => PrimBox::U64(a $op b),
            (PrimBox::Bool(a), PrimBox::Bool(b)) => PrimBox::Bool(a $op b),
            _ => unreachable!("bitwise_binop on mismatched PrimBox kinds"),
        }
    };
}

/// The set of native binary arithmetic operations. `None` means the
/// operation hit "modeled undefined behavior" (precise-kind overflow,
/// or a division/remainder/shift degenerate case the caller must check
/// before calling): the builder turns that into `Bottom`.
impl PrimBox {
    #[must_use] pub fn add(&self, other: &Self, quick: bool) -> Option<Self> { int_binop!(self, other, quick, checked_add, wrapping_add) }
    #[must_use] pub fn sub(&self, other: &Self, quick: bool) -> Option<Self> { int_binop!(self, other, quick, checked_sub, wrapping_sub) }
    #[must_use] pub fn mul(&self, other: &Self, quick: bool) -> Option<Self> { int_binop!(self, other, quick, checked_mul, wrapping_mul) }

    /// Integer division; `None` both for div-by-zero and for checked
    /// overflow (`MIN / -1`) under a precise kind.
    #[must_use] pub fn div(&self, other: &Self, quick: bool) -> Option<Self> {
        if other.is_zero() { return None; }
        int_binop!(self, other, quick, checked_div, wrapping_div)
    }

    #[must_use] pub fn rem(&self, other: &Self, quick: bool) -> Option<Self> {
        if other.is_zero() { return None; }
        int_binop!(self, other, quick, checked_rem, wrapping_rem)
    }

    #[must_use] pub fn bitand(&self, other: &Self) -> Self { bitwise_binop!(self, other, &) }
    #[must_use] pub fn bitor(&self, other: &Self) -> Self { bitwise_binop!(self, other, |) }
    #[must_use] pub fn bitxor(&self, other: &Self) -> Self { bitwise_binop!(self, other, ^) }

    /// `None` if the shift amount is `>=` the operand's bit width
    /// (modeled UB, same for quick and precise kinds).
    #[must_use] pub fn shl(&self, amount: &Self) -> Option<Self> {
        let amt = amount.as_shift_amount()?;
        if amt >= u64::from(self.base().bits()) { return None; }
        #[allow(clippy::cast_possible_truncation)] let amt = amt as u32;
        Some(match *self {
            PrimBox::I8(a) => PrimBox::I8(a.wrapping_shl(amt)), PrimBox::I16(a) => PrimBox::I16(a.wrapping_shl(amt)),
            PrimBox::I32(a) => PrimBox::I32(a.wrapping_shl(amt)), PrimBox::I64(a) => PrimBox::I64(a.wrapping_shl(amt)),
            PrimBox::U8(a) => PrimBox::U8(a.wrapping_shl(amt)), PrimBox::U16(a) => PrimBox::U16(a.wrapping_shl(amt)),
            PrimBox::U32(a) => PrimBox::U32(a.wrapping_shl(amt)), PrimBox::U64(a) => PrimBox::U64(a.wrapping_shl(amt)),
            _ => unreachable!("shl on non-integer PrimBox"),
        })
    }

    /// Arithmetic shift on signed kinds, logical shift on unsigned.
    #[must_use] pub fn shr(&self, amount: &Self) -> Option<Self> {
        let amt = amount.as_shift_amount()?;
        if amt >= u64::from(self.base().bits()) { return None; }
        #[allow(clippy::cast_possible_truncation)] let amt = amt as u32;
        Some(match *self {
            PrimBox::I8(a) => PrimBox::I8(a.wrapping_shr(amt)), PrimBox::I16(a) => PrimBox::I16(a.wrapping_shr(amt)),
            PrimBox::I32(a) => PrimBox::I32(a.wrapping_shr(amt)), PrimBox::I64(a) => PrimBox::I64(a.wrapping_shr(amt)),
            PrimBox::U8(a) => PrimBox::U8(a.wrapping_shr(amt)), PrimBox::U16(a) => PrimBox::U16(a.wrapping_shr(amt)),
            PrimBox::U32(a) => PrimBox::U32(a.wrapping_shr(amt)), PrimBox::U64(a) => PrimBox::U64(a.wrapping_shr(amt)),
            _ => unreachable!("shr on non-integer PrimBox"),
        })
    }

    #[must_use] pub fn fadd(&self, other: &Self) -> Self { float_binop(self, other, |a, b| a + b, |a, b| a + b) }
    #[must_use] pub fn fsub(&self, other: &Self) -> Self { float_binop(self, other, |a, b| a - b, |a, b| a - b) }
    #[must_use] pub fn fmul(&self, other: &Self) -> Self { float_binop(self, other, |a, b| a * b, |a, b| a * b) }
    #[must_use] pub fn fdiv(&self, other: &Self) -> Self { float_binop(self, other, |a, b| a / b, |a, b| a / b) }
    #[must_use] pub fn fneg(&self) -> Self {
        match *self {
            PrimBox::F32(a) => PrimBox::F32(-a),
            PrimBox::F64(a) => PrimBox::F64(-a),
            _ => unreachable!("fneg on non-float PrimBox"),
        }
    }

    /// Structural comparisons used by `cmp`; unordered (`NaN`)
    /// comparisons return `false` for every kind except `ne`, per IEEE
    /// 754 semantics.
    #[must_use] pub fn eq(&self, other: &Self) -> bool { cmp_op(self, other, |a, b| a == b, |a, b| a == b) }
    #[must_use] pub fn ne(&self, other: &Self) -> bool { cmp_op(self, other, |a, b| a != b, |a, b| a != b) }
    #[must_use] pub fn lt(&self, other: &Self) -> bool { cmp_op(self, other, |a, b| a < b, |a, b| a < b) }
    #[must_use] pub fn le(&self, other: &Self) -> bool { cmp_op(self, other, |a, b| a <= b, |a, b| a <= b) }

    /// Numeric conversion to another kind, via Rust's `as` cast
    /// (truncating for narrowing int casts, saturating for int<->float,
    /// matching `PrimType_*` -> `PrimType_*` in `World::cast`).
    #[must_use] pub fn cast_to(&self, target: BaseKind) -> Self {
        macro_rules! to_all {
            ($v:expr) => { match target {
                BaseKind::I8 => PrimBox::I8($v as i8), BaseKind::I16 => PrimBox::I16($v as i16),
                BaseKind::I32 => PrimBox::I32($v as i32), BaseKind::I64 => PrimBox::I64($v as i64),
                BaseKind::U8 => PrimBox::U8($v as u8), BaseKind::U16 => PrimBox::U16($v as u16),
                BaseKind::U32 => PrimBox::U32($v as u32), BaseKind::U64 => PrimBox::U64($v as u64),
                BaseKind::F32 => PrimBox::F32($v as f32), BaseKind::F64 => PrimBox::F64($v as f64),
                BaseKind::Bool => PrimBox::Bool($v != 0 as _),
            } };
        }
        match *self {
            PrimBox::I8(v) => to_all!(v), PrimBox::I16(v) => to_all!(v),
            PrimBox::I32(v) => to_all!(v), PrimBox::I64(v) => to_all!(v),
            PrimBox::U8(v) => to_all!(v), PrimBox::U16(v) => to_all!(v),
            PrimBox::U32(v) => to_all!(v), PrimBox::U64(v) => to_all!(v),
            PrimBox::F32(v) => to_all!(v), PrimBox::F64(v) => to_all!(v),
            PrimBox::Bool(v) => to_all!(i64::from(v)),
        }
    }
}

fn float_binop(a: &PrimBox, b: &PrimBox, f32_op: impl Fn(f32, f32) -> f32, f64_op: impl Fn(f64, f64) -> f64) -> PrimBox {
    match (a, b) {
        (PrimBox::F32(a), PrimBox::F32(b)) => PrimBox::F32(f32_op(*a, *b)),
        (PrimBox::F64(a), PrimBox::F64(b)) => PrimBox::F64(f64_op(*a, *b)),
        _ => unreachable!("float_binop on non-float or mismatched PrimBox kinds"),
    }
}

fn cmp_op(a: &PrimBox, b: &PrimBox, int_op: impl Fn(i128, i128) -> bool, float_op: impl Fn(f64, f64) -> bool) -> bool {
    match (a, b) {
        (PrimBox::F32(a), PrimBox::F32(b)) => float_op(f64::from(*a), f64::from(*b)),
        (PrimBox::F64(a), PrimBox::F64(b)) => float_op(*a, *b),
        (PrimBox::Bool(a), PrimBox::Bool(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::I8(a), PrimBox::I8(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::I16(a), PrimBox::I16(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::I32(a), PrimBox::I32(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::I64(a), PrimBox::I64(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::U8(a), PrimBox::U8(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::U16(a), PrimBox::U16(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::U32(a), PrimBox::U32(b)) => int_op(i128::from(*a), i128::from(*b)),
        (PrimBox::U64(a), PrimBox::U64(b)) => int_op(i128::from(*a), i128::from(*b)),
        _ => unreachable!("cmp_op on mismatched PrimBox kinds"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precise_overflow_is_none() {
        let a = PrimBox::I8(120);
        let b = PrimBox::I8(10);
        assert!(a.add(&b, false).is_none());
        assert_eq!(a.add(&b, true).unwrap(), PrimBox::I8(-126));
    }

    #[test]
    fn div_by_zero_is_none() {
        let a = PrimBox::I32(10);
        let z = PrimBox::I32(0);
        assert!(a.div(&z, false).is_none());
        assert!(a.rem(&z, true).is_none());
    }

    #[test]
    fn shift_at_or_over_bitwidth_is_none() {
        let a = PrimBox::I32(1);
        assert!(a.shl(&PrimBox::I32(32)).is_none());
        assert!(a.shl(&PrimBox::I32(31)).is_some());
    }

    #[test]
    fn nan_literals_are_bitwise_distinguished() {
        let a = PrimBox::F64(f64::NAN);
        let b = PrimBox::F64(f64::NAN);
        // same bit pattern -> equal keys, so they CSE together
        assert_eq!(a, b);
        // `eq` (the IR's `Cmp::Eq`) still follows IEEE semantics: NaN != NaN
        assert!(!a.eq(&b));
    }

    #[test]
    fn allset_and_zero_and_one() {
        assert!(PrimBox::allset_of(BaseKind::U8).is_allset());
        assert!(PrimBox::zero_of(BaseKind::I32).is_zero());
        assert!(PrimBox::one_of(BaseKind::I32).is_one());
    }
}

//! A hash-consed CPS/sea-of-nodes compiler intermediate representation:
//! pure values are globally numbered and structurally shared, control
//! flow is jumps between first-class continuations ("lambdas"), and
//! the whole graph lives in one owning [`World`].
//!
//! Laid out the way `mmcc` splits its compiler crate: one module per
//! concern (`idx`, `value`, `ty`, `def`, `intern`, `error`, `world` and
//! its `arith`/`agg`/`mem` sub-builders, `cleanup`, `scope`, `cfg`,
//! `stream`) rather than one file per IR node kind.

pub mod idx;
pub mod value;
pub mod ty;
pub mod def;
pub mod intern;
pub mod error;
pub mod world;
pub mod cleanup;
pub mod scope;
pub mod cfg;
pub mod stream;

pub use def::{ArithKind, CallingConv, CmpKind, DefId, DefList, Intrinsic, Jump, LambdaData, Loc};
pub use error::ThorinError;
pub use ty::{StructTag, TypeId, TypeKind};
pub use value::{BaseKind, PrimBox, PrimKind};
pub use world::{World, WorldConfig};
pub use scope::Scope;
pub use cfg::{Cfa, Cfg, CfgView};

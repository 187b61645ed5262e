//! Error taxonomy.
//!
//! Only one edge of the kernel is fallible in the `Result`-returning
//! sense: `World::write`'s file I/O. Everything else is either a
//! programmer error (`panic!`/`assert!`, fail-stop) or modeled
//! undefined behavior materialized as `Bottom` — neither goes through
//! this type. Grounded on `mmcc`'s use of `thiserror` for its own
//! single I/O-adjacent error enum rather than a hand-rolled
//! `impl std::error::Error`.

use std::path::PathBuf;

use thiserror::Error;

/// The one recoverable failure mode the kernel surfaces to callers.
#[derive(Debug, Error)]
pub enum ThorinError {
    #[error("failed to write module dump to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

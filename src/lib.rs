//! Core library for the snapshot-merge command line application.
//!
//! Two exports of the same data set, an old and a new snapshot, are merged so
//! that new records replace the old records sharing their key. The pure
//! reconciliation lives in [`reconcile`], tabular data in [`model`], file
//! adapters under [`io`], human-readable previews in [`preview`], and the
//! file-to-file orchestration used by the CLI in [`sync`].

pub mod error;
pub mod io;
pub mod model;
pub mod preview;
pub mod reconcile;
pub mod sync;

pub use error::{Result, SchemaError, ToolError};
pub use model::{Cell, Record, Table};
pub use reconcile::{
    KeyColumns, KeyPolicy, MergeOutcome, MergeSummary, NullKeyPolicy, Reconciler, merge,
    resolve_key_columns,
};

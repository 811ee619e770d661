//! File adapters around the in-memory [`Table`](crate::model::Table).

pub mod csv_read;
pub mod csv_write;
pub mod excel_write;

pub mod catalog;
pub mod manager;
pub mod types;

pub use catalog::StarSchema;
pub use manager::{ensure_schema, reset};
pub use types::{Column, ColumnType, ForeignKey, Index, TableKind, TableSchema};

//! Schema model building

mod alter_handler;
mod builder;
mod database_model;
mod elements;
pub mod export;
mod index_builder;
pub mod relationship;
mod table_builder;

pub use builder::{build_schema, BuildReport, ParsedSchema, SchemaBuilder, SkippedStatement};
pub(crate) use builder::renamed_table_name;
pub use database_model::Schema;
pub use elements::*;
pub use index_builder::default_index_name;
pub use table_builder::{classify_default, normalize_type_name, DefaultValue};
pub(crate) use table_builder::normalize_default;

//! Data Source Store: named sources of records, addressed by dotted paths.

pub mod path;
pub mod record;
pub mod source;
pub mod store;

pub use path::{normalize_path, string_to_path};
pub use record::{is_reserved_field, DataRecord, RESERVED_FIELDS};
pub use source::{DataSource, DataSourceDef, SetValueTransformer, Transformers};
pub use store::DataSources;

pub mod document;
pub mod source;
pub mod store;
pub mod version;

pub use document::SchemaDocument;
pub use source::{FilesystemSchemaSource, SchemaSource};
pub use store::SchemaStore;
pub use version::{is_stable_version, latest_stable};

pub mod resolve;
pub mod store;

pub use resolve::{resolve_doc, DocResolver, DEFAULT_DOCS_PREFIX};
pub use store::{DocStore, FilesystemDocStore, METADATA_FILE};

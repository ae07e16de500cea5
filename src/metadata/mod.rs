//! Package build metadata: the spec file, its changelog, and the staged store
//! that writes them.

pub mod atomic;
pub mod changelog;
pub mod spec_file;
pub mod store;

pub use changelog::ChangelogEntry;
pub use spec_file::SpecDocument;
pub use store::{discover_spec, MetadataStore};

pub mod file;
pub mod naming;

pub use file::{FileService, StoredFile};
pub use naming::NamingScheme;

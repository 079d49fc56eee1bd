mod error;
mod name;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use name::StoredName;
pub use traits::{BlobStore, BoxReader, SizedReader};

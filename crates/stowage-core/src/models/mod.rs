mod file_blob;
mod stored_object;

pub use file_blob::{FileBlob, RawInput, UploadedFile};
pub use stored_object::{ObjectMetadata, StoredObject};

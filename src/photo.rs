use std::io;
use std::path::{Path, PathBuf};

use rocket::serde::Serialize;

use crate::Error;

/// A photo as stored in the database. Only photos which have been assigned a path are ever
/// returned to readers.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Photo {
    pub id: i64,
    pub album_id: i64,
    pub user_id: i64,
    pub path: PathBuf,
}

/// Result of adding a photo : its generated id and where its bytes belong
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NewPhoto {
    pub id: i64,
    pub path: PathBuf,
}

/// Storage location of the photo with the given id, inside the given storage root
pub fn storage_path(storage_root: &Path, photo_id: i64) -> PathBuf {
    storage_root.join(photo_id.to_string())
}

/// Convert a path into the string stored in the `path` column
pub fn path_to_column(path: &Path) -> Result<&str, Error> {
    path.to_str()
        .ok_or_else(|| Error::FileError(io::Error::new(io::ErrorKind::InvalidData, "path is not valid UTF-8"), path.to_path_buf()))
}

use crate::photo::{self, NewPhoto, Photo};
use crate::{permissions, Error};
use std::io;
use std::path::{Path, PathBuf};
use rocket::fs::TempFile;
use rocket::tokio::fs;
use rocket_db_pools::sqlx::{self, Connection as _, SqliteConnection};
use tracing::{info, warn};


/// Source of the bytes of a new photo
#[rocket::async_trait]
pub trait PhotoBytes: Send {
    /// Write the bytes to the given location
    async fn write_to(&mut self, path: &Path) -> io::Result<()>;

    /// Number of bytes that will be written
    fn size(&self) -> u64;
}

/// A file received in an upload form
#[rocket::async_trait]
impl<'v> PhotoBytes for TempFile<'v> {
    async fn write_to(&mut self, path: &Path) -> io::Result<()> {
        self.copy_to(path).await
    }

    fn size(&self) -> u64 {
        self.len()
    }
}

/// Add a photo to the given album if the given user has permission to access it. The row is
/// inserted, assigned its storage path and its bytes are written in a single transaction : readers
/// never see a photo without a path, and if the bytes can't be written the row is rolled back.
pub async fn add_photo<B>(conn: &mut SqliteConnection, album_id: i64, user_id: i64, storage_root: &Path, bytes: &mut B) -> Result<NewPhoto, Error>
    where B: PhotoBytes
{
    let mut tx = conn.begin().await?;
    let new_photo = insert_photo(&mut *tx, album_id, user_id, storage_root).await?;

    if let Err(error) = bytes.write_to(&new_photo.path).await {
        remove_file_quietly(&new_photo.path).await;
        return Err(Error::FileError(error, new_photo.path));
    }

    if let Err(error) = tx.commit().await {
        remove_file_quietly(&new_photo.path).await;
        return Err(error.into());
    }

    info!("Stored {} bytes for photo {} in album {}", bytes.size(), new_photo.id, album_id);
    Ok(new_photo)
}


/// Check the permission, then insert a photo row and patch it with the path derived from its
/// generated id. Callers are expected to run this inside a transaction.
pub async fn insert_photo(conn: &mut SqliteConnection, album_id: i64, user_id: i64, storage_root: &Path) -> Result<NewPhoto, Error> {
    if !permissions::check_perm(conn, album_id, user_id).await? {
        warn!("User {} doesn't have permission to add photos to album {}", user_id, album_id);
        return Err(Error::PermissionDenied { album_id, user_id });
    }

    let photo_id = sqlx::query("INSERT INTO photos (album_id, user_id) VALUES (?, ?);")
        .bind(album_id)
        .bind(user_id)
        .execute(&mut *conn).await?
        .last_insert_rowid();

    let path = photo::storage_path(storage_root, photo_id);
    sqlx::query("UPDATE photos SET path=? WHERE id=?;")
        .bind(photo::path_to_column(&path)?)
        .bind(photo_id)
        .execute(&mut *conn).await?;

    info!("Added photo {} to album {} for user {}", photo_id, album_id, user_id);
    Ok(NewPhoto { id: photo_id, path })
}


/// Get a single photo based on its id
pub async fn get_photo(conn: &mut SqliteConnection, photo_id: i64) -> Result<Option<Photo>, Error> {
    Ok(sqlx::query_as::<_, (i64, i64, i64, String)>(
            "SELECT id, album_id, user_id, path FROM photos WHERE id=? AND path IS NOT NULL LIMIT 1;")
        .bind(photo_id)
        .fetch_optional(&mut *conn).await?
        .map(|(id, album_id, user_id, path)| Photo {
            id,
            album_id,
            user_id,
            path: PathBuf::from(path),
        }))
}


/// Ids of every photo in an album, bound to the album id
pub const PHOTO_IDS_IN_ALBUM: &'static str = "SELECT id FROM photos WHERE album_id=? AND path IS NOT NULL ORDER BY id;";


async fn remove_file_quietly(path: &Path) {
    if let Err(error) = fs::remove_file(path).await {
        if error.kind() != io::ErrorKind::NotFound {
            warn!("Unable to remove \"{}\" : {}", path.display(), error);
        }
    }
}

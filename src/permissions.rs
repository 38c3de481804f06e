use crate::Error;
use rocket_db_pools::sqlx::{self, SqliteConnection};
use tracing::info;


/// Outcome of a permission grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// A new permission row has been inserted
    Granted,
    /// The user could already access the album, nothing was written
    AlreadyGranted,
}


/// Check if the given user has permission to access the given album. An unknown album or user
/// simply has no permission.
pub async fn check_perm(conn: &mut SqliteConnection, album_id: i64, user_id: i64) -> Result<bool, Error> {
    Ok(sqlx::query("SELECT 1 FROM album_permissions WHERE album_id=? AND user_id=? LIMIT 1;")
        .bind(album_id)
        .bind(user_id)
        .fetch_optional(&mut *conn).await?
        .is_some())
}


/// Give a user permission to view and add photos to an album. Granting an existing permission
/// is a no-op reported as `Grant::AlreadyGranted`.
pub async fn give_perm(conn: &mut SqliteConnection, album_id: i64, user_id: i64) -> Result<Grant, Error> {
    if check_perm(conn, album_id, user_id).await? {
        info!("User {} already has permission to access album {}", user_id, album_id);
        return Ok(Grant::AlreadyGranted);
    }

    sqlx::query("INSERT INTO album_permissions (album_id, user_id) VALUES (?, ?);")
        .bind(album_id)
        .bind(user_id)
        .execute(&mut *conn).await?;
    info!("Granted user {} permission to access album {}", user_id, album_id);
    Ok(Grant::Granted)
}

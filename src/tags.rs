use crate::Error;
use rocket::serde::Serialize;
use rocket_db_pools::sqlx::{self, SqliteConnection};


/// A photo a user is tagged in, along with its album
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Tagged {
    pub photo_id: i64,
    pub album_id: i64,
}


/// Get every photo the given user is tagged in, along with the album of each photo. Both lists
/// have the same length and are ordered the same way : the n-th album id is the album of the
/// n-th photo id.
pub async fn show_tags(conn: &mut SqliteConnection, user_id: i64) -> Result<(Vec<i64>, Vec<i64>), Error> {
    let rows = sqlx::query_as::<_, (i64, i64)>("
            SELECT photos.id, photos.album_id FROM photos
            JOIN tags ON photos.id = tags.photo_id
            WHERE tags.tagged_user_id=?
            ORDER BY tags.rowid;
        ")
        .bind(user_id)
        .fetch_all(&mut *conn).await?;
    Ok(rows.into_iter().unzip())
}


/// Pair up the two lists returned by `show_tags`
pub fn pairs(photo_ids: Vec<i64>, album_ids: Vec<i64>) -> Vec<Tagged> {
    photo_ids.into_iter()
        .zip(album_ids)
        .map(|(photo_id, album_id)| Tagged { photo_id, album_id })
        .collect()
}

use crate::{permissions, Error};
use rocket::serde::Serialize;
use rocket_db_pools::sqlx::{self, Connection as _, SqliteConnection};
use tracing::info;


#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Album {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}


/// Create a new album owned by the given user, and give them permission to access it, in a
/// single transaction
pub async fn new_album(conn: &mut SqliteConnection, name: &str, user_id: i64) -> Result<Album, Error> {
    let mut tx = conn.begin().await?;
    let album = insert_album(&mut *tx, name, user_id).await?;
    tx.commit().await?;

    info!("Created album {} (\"{}\") for user {}", album.id, album.name, user_id);
    Ok(album)
}


/// Insert an album row and its owner permission. Callers are expected to run this inside a
/// transaction.
pub async fn insert_album(conn: &mut SqliteConnection, name: &str, user_id: i64) -> Result<Album, Error> {
    let album_id = sqlx::query("INSERT INTO albums (user_id, name) VALUES (?, ?);")
        .bind(user_id)
        .bind(name)
        .execute(&mut *conn).await?
        .last_insert_rowid();
    permissions::give_perm(conn, album_id, user_id).await?;

    Ok(Album {
        id: album_id,
        user_id,
        name: name.to_string(),
    })
}


/// Get a single album based on its id
pub async fn get_album(conn: &mut SqliteConnection, album_id: i64) -> Result<Option<Album>, Error> {
    Ok(sqlx::query_as::<_, (i64, i64, String)>("SELECT id, user_id, name FROM albums WHERE id=? LIMIT 1;")
        .bind(album_id)
        .fetch_optional(&mut *conn).await?
        .map(|(id, user_id, name)| Album { id, user_id, name }))
}


/// Get the ids of every album owned by the given user
pub async fn album_ids_of_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<i64>, Error> {
    Ok(sqlx::query_scalar::<_, i64>(ALBUM_IDS_OF_USER)
        .bind(user_id)
        .fetch_all(&mut *conn).await?)
}

pub const ALBUM_IDS_OF_USER: &'static str = "SELECT id FROM albums WHERE user_id=? ORDER BY id;";

use crate::{albums, Error};
use rocket::serde::Serialize;
use rocket_db_pools::sqlx::{self, Connection as _, SqliteConnection};
use tracing::info;


#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
}


/// Name of the album every user starts with
pub fn main_album_name(email: &str) -> String {
    format!("{}'s Photos", email)
}


/// Create a new user along with an initial album they own and can access. The user, the album
/// and the permission are written in a single transaction.
pub async fn new_user(conn: &mut SqliteConnection, email: &str) -> Result<User, Error> {
    let mut tx = conn.begin().await?;

    let user_id = sqlx::query("INSERT INTO users (email) VALUES (?);")
        .bind(email)
        .execute(&mut *tx).await?
        .last_insert_rowid();
    let album = albums::insert_album(&mut *tx, &main_album_name(email), user_id).await?;

    tx.commit().await?;

    info!("Created user {} ({}) with album {}", user_id, email, album.id);
    Ok(User {
        id: user_id,
        email: email.to_string(),
    })
}


/// Get a single user based on their id
pub async fn get_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<User>, Error> {
    Ok(sqlx::query_as::<_, (i64, String)>("SELECT id, email FROM users WHERE id=? LIMIT 1;")
        .bind(user_id)
        .fetch_optional(&mut *conn).await?
        .map(|(id, email)| User { id, email }))
}

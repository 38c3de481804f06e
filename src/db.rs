use crate::{albums, config::Config, permissions, users, Error};
use rocket::{fairing, Rocket, Build};
use rocket_db_pools::{sqlx::{self, SqliteConnection}, Database};
use tracing::{error, info};


#[derive(Database)]
#[database("photoapp")]
pub struct Db(pub sqlx::SqlitePool);


/// Statements creating every table, in dependency order
pub const SCHEMA: &'static str = include_str!("../schema.sql");


/// Fairing callback that checks if the database has already been filled with the `users`
/// table and if not, executes the schema to initialize it
pub async fn init_schema(rocket: Rocket<Build>) -> fairing::Result {
    // Make sure the database has been initialized (fairings have been attached in the correct order)
    let Some(db) = Db::fetch(&rocket) else {
        error!("Database pool is not initialized, unable to check the schema");
        return Err(rocket);
    };
    let seed_demo_data = rocket.state::<Config>().map(|c| c.SEED_DEMO_DATA).unwrap_or(false);

    let mut conn = match db.0.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Unable to access database to check schema : {}", e);
            return Err(rocket);
        }
    };

    // Check the `sqlite_master` table for a table named `users`
    match has_schema(&mut conn).await {
        // The table already exists, we can proceed with liftoff
        Ok(true) => Ok(rocket),

        // The table doesn't exist, create the schema
        Ok(false) => {
            info!("Database is empty, creating schema");
            if let Err(e) = execute_batch(&mut conn, SCHEMA).await {
                error!("Unable to create the database schema : {}", e);
                return Err(rocket);
            }
            if seed_demo_data {
                if let Err(e) = seed(&mut conn).await {
                    error!("Unable to seed demo data : {}", e);
                    return Err(rocket);
                }
            }
            Ok(rocket)
        }

        // Something went wrong when checking `sqlite_master`, we'll have to scrub the launch
        Err(e) => {
            error!("Unable to access database to check schema : {}", e);
            Err(rocket)
        }
    }
}


/// Whether the `users` table exists
pub async fn has_schema(conn: &mut SqliteConnection) -> Result<bool, Error> {
    Ok(sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='users';")
        .fetch_optional(&mut *conn).await?
        .is_some())
}


/// Split a list of queries on `;` and execute them one by one
pub async fn execute_batch(conn: &mut SqliteConnection, sql: &str) -> Result<(), Error> {
    let sql_queries = sql.split(';').map(|s| s.trim()).filter(|s| !s.is_empty());
    for sql_query in sql_queries {
        sqlx::query(sql_query).execute(&mut *conn).await?;
    }
    Ok(())
}


/// Create a couple of demo users and albums, going through the regular operations so that
/// every album gets its owner permission
pub async fn seed(conn: &mut SqliteConnection) -> Result<(), Error> {
    let user1 = users::new_user(conn, "user1@example.com").await?;
    let user2 = users::new_user(conn, "user2@example.com").await?;
    albums::new_album(conn, "1s Birthday!", user1.id).await?;

    // Share user 1's main album with user 2
    if let Some(main_album) = albums::album_ids_of_user(conn, user1.id).await?.first() {
        permissions::give_perm(conn, *main_album, user2.id).await?;
    }

    info!("Seeded demo users {} and {}", user1.email, user2.email);
    Ok(())
}

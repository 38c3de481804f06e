#[macro_use] extern crate rocket;

mod albums;
mod config;
mod current_user;
mod db;
mod page;
mod permissions;
mod photo;
mod photos;
mod route_id;
mod tags;
mod users;

use config::Config;
use current_user::CurrentUser;
use db::Db;
use page::PageRequest;
use route_id::RouteId;
use std::io;
use std::path::PathBuf;
use rocket::{fairing, Build, Request, Rocket, State};
use rocket::fairing::AdHoc;
use rocket::form::Form;
use rocket::fs::{FileServer, NamedFile, TempFile};
use rocket::http::{ContentType, Status};
use rocket::response::{self, Redirect, Responder};
use rocket_db_pools::{sqlx, Connection, Database};
use rocket_dyn_templates::{context, Metadata, Template};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;



#[launch]
fn rocket() -> _ {
    init_logging();

    // Try to read the config file
    let config = Config::read_or_exit();

    // Let's go to spaaace !
    build(config)
}


/// Assemble the app for the given config
fn build(config: Config) -> Rocket<Build> {
    rocket::custom(config.figment())
        .attach(Db::init())
        .attach(AdHoc::try_on_ignite("Database schema", db::init_schema))
        .attach(AdHoc::try_on_ignite("Photos directory", init_photos_dir))
        .attach(Template::fairing())
        .mount("/", routes![
            home_page,
            album_page,
            photo_page,
            photo_file,
            tags_page,
            upload,
        ])
        .mount("/static", FileServer::from("static/").rank(0))
        .manage(config)
}


/// Install the tracing subscriber, filtered by `RUST_LOG` when it is set
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoapp=info,rocket=warn".into()),
        )
        .try_init();
}


/// Fairing callback that creates the photos directory if needed
async fn init_photos_dir(rocket: Rocket<Build>) -> fairing::Result {
    let Some(photos_dir) = rocket.state::<Config>().map(|c| c.photos_dir()) else {
        error!("No config is managed, unable to locate the photos directory");
        return Err(rocket);
    };
    match rocket::tokio::fs::create_dir_all(&photos_dir).await {
        Ok(()) => {
            info!("Photos are stored in \"{}\"", photos_dir.display());
            Ok(rocket)
        }
        Err(e) => {
            error!("Unable to create the photos directory \"{}\" : {}", photos_dir.display(), e);
            Err(rocket)
        }
    }
}


/// Route handler listing the albums owned by a user
#[get("/home/<user_id>")]
async fn home_page(user_id: Result<RouteId, &str>, mut db: Connection<Db>, templates: Metadata<'_>, config: &State<Config>) -> Result<(ContentType, String), Error> {
    let user_id = RouteId::parse(user_id)?;
    users::get_user(&mut **db, user_id).await?
        .ok_or_else(|| Error::NotFound(format!("user {user_id}")))?;
    PageRequest::Home { user_id }
        .load(&mut **db).await?
        .render(&templates, &config.TITLE)
}


/// Route handler listing the photos inside an album
#[get("/album/<album_id>")]
async fn album_page(album_id: Result<RouteId, &str>, mut db: Connection<Db>, templates: Metadata<'_>, config: &State<Config>) -> Result<(ContentType, String), Error> {
    let album_id = RouteId::parse(album_id)?;
    albums::get_album(&mut **db, album_id).await?
        .ok_or_else(|| Error::NotFound(format!("album {album_id}")))?;
    PageRequest::Album { album_id }
        .load(&mut **db).await?
        .render(&templates, &config.TITLE)
}


/// Route handler rendering the page of a single photo
#[get("/photo/<photo_id>")]
async fn photo_page(photo_id: Result<RouteId, &str>, mut db: Connection<Db>, templates: Metadata<'_>, config: &State<Config>) -> Result<(ContentType, String), Error> {
    let photo_id = RouteId::parse(photo_id)?;
    let photo = photos::get_photo(&mut **db, photo_id).await?
        .ok_or_else(|| Error::NotFound(format!("photo {photo_id}")))?;
    PageRequest::Photo(photo.into())
        .load(&mut **db).await?
        .render(&templates, &config.TITLE)
}


/// Route handler streaming the stored bytes of a photo
#[get("/photos/<photo_id>")]
async fn photo_file(photo_id: Result<RouteId, &str>, mut db: Connection<Db>) -> Result<NamedFile, Error> {
    let photo_id = RouteId::parse(photo_id)?;
    let photo = photos::get_photo(&mut **db, photo_id).await?
        .ok_or_else(|| Error::NotFound(format!("photo {photo_id}")))?;
    NamedFile::open(&photo.path).await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(format!("file of photo {photo_id}")),
            _ => Error::FileError(e, photo.path.clone()),
        })
}


/// Route handler listing the photos a user is tagged in
#[get("/tags/<user_id>")]
async fn tags_page(user_id: Result<RouteId, &str>, mut db: Connection<Db>, templates: Metadata<'_>, config: &State<Config>) -> Result<(ContentType, String), Error> {
    let user_id = RouteId::parse(user_id)?;
    let (photo_ids, album_ids) = tags::show_tags(&mut **db, user_id).await?;
    templates
        .render("tags", context! {
            title: &config.TITLE,
            user_id,
            tagged: tags::pairs(photo_ids, album_ids),
        })
        .ok_or_else(|| Error::RenderError("tags".to_string()))
}


/// Multipart form sent to the upload route
#[derive(FromForm)]
struct Upload<'r> {
    photo: Vec<TempFile<'r>>,
}

/// Route handler storing an uploaded photo in an album, then redirecting to its page
#[post("/upload/<album_id>", data = "<form>")]
async fn upload(album_id: Result<RouteId, &str>, mut form: Form<Upload<'_>>, user: CurrentUser, mut db: Connection<Db>, config: &State<Config>) -> Result<Redirect, Error> {
    let album_id = RouteId::parse(album_id)?;
    let file = match form.photo.as_mut_slice() {
        [file] => file,
        [] => return Err(Error::InvalidRequestError("no file uploaded".to_string())),
        _ => return Err(Error::InvalidRequestError("too many files uploaded".to_string())),
    };
    info!("Uploaded file size for album {} : {} bytes", album_id, file.len());

    let new_photo = photos::add_photo(&mut **db, album_id, user.id(), &config.photos_dir(), file).await?;
    Ok(Redirect::found(format!("/photo/{}", new_photo.id)))
}


/// Generic error type used to uniformize errors across the crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file error for \"{}\" : {}", .1.display(), .0)]
    FileError(io::Error, PathBuf),
    #[error("parser error : {0}")]
    TomlParserError(#[from] toml::de::Error),
    #[error("database error : {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("user {user_id} doesn't have permission to access album {album_id}")]
    PermissionDenied { album_id: i64, user_id: i64 },
    #[error("invalid request : {0}")]
    InvalidRequestError(String),
    #[error("not found : {0}")]
    NotFound(String),
    #[error("unable to render template \"{0}\"")]
    RenderError(String),
}

impl Error {
    /// HTTP status answered when this error reaches a route boundary
    pub fn status(&self) -> Status {
        match self {
            Error::InvalidRequestError(_) => Status::BadRequest,
            Error::PermissionDenied { .. } => Status::Forbidden,
            Error::NotFound(_) => Status::NotFound,
            Error::FileError(..)
            | Error::TomlParserError(_)
            | Error::DatabaseError(_)
            | Error::RenderError(_) => Status::InternalServerError,
        }
    }
}

/// Log the error and answer with its status. Details of server errors stay in the logs.
impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let message = if status.code >= 500 {
            error!("{} {} : {}", request.method(), request.uri(), self);
            status.reason_lossy().to_string()
        } else {
            warn!("{} {} : {}", request.method(), request.uri(), self);
            self.to_string()
        };
        (status, message).respond_to(request)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rocket::local::asynchronous::{Client, LocalResponse};
    use tempfile::TempDir;

    const BOUNDARY: &'static str = "X-PHOTOAPP-BOUNDARY";

    /// Launch the app on a fresh database and photos directory inside `dir`, seeded with the
    /// demo users : user 1 owns albums 1 and 3, user 2 owns album 2 and can access album 1.
    /// Requests act as user 1.
    async fn client(dir: &TempDir) -> Client {
        let config = Config {
            DATABASE_PATH: dir.path().join("photoapp.sqlite").to_str().unwrap().to_string(),
            PHOTOS_DIR: dir.path().join("photos").to_str().unwrap().to_string(),
            SEED_DEMO_DATA: true,
            ..Config::default()
        };
        Client::tracked(build(config)).await.unwrap()
    }

    fn multipart(parts: &[(&str, &[u8])]) -> (ContentType, Vec<u8>) {
        let mut body = Vec::new();
        for (i, (name, bytes)) in parts.iter().enumerate() {
            body.extend_from_slice(format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"photo{i}.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            ).as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let content_type = ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY));
        (content_type, body)
    }

    async fn post_upload<'c>(client: &'c Client, album: &str, parts: &[(&str, &[u8])]) -> LocalResponse<'c> {
        let (content_type, body) = multipart(parts);
        client.post(format!("/upload/{album}"))
            .header(content_type)
            .body(body)
            .dispatch().await
    }

    fn stored_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("photos")).unwrap().count()
    }

    #[rocket::async_test]
    async fn home_lists_owned_albums() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        let response = client.get("/home/1").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::HTML));
        let body = response.into_string().await.unwrap();
        assert!(body.contains("href=\"/album/1\""));
        assert!(body.contains("href=\"/album/3\""));
        assert!(!body.contains("href=\"/album/2\""));

        assert_eq!(client.get("/home/42").dispatch().await.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn unknown_album_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        let response = client.get("/album/42").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert!(response.into_string().await.unwrap().contains("album 42"));

        // An existing album without photos still renders
        let response = client.get("/album/3").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert!(!response.into_string().await.unwrap().contains("href=\"/photo/"));
    }

    #[rocket::async_test]
    async fn malformed_ids_are_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        for uri in ["/home/abc", "/album/1x", "/photo/x", "/photos/99999999999999999999", "/tags/zz"] {
            let response = client.get(uri).dispatch().await;
            assert_eq!(response.status(), Status::BadRequest, "{uri}");
        }
        let response = post_upload(&client, "one", &[("photo", b"bytes")]).await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn upload_then_view_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        let response = post_upload(&client, "1", &[("photo", b"not really a jpeg")]).await;
        assert_eq!(response.status(), Status::Found);
        assert_eq!(response.headers().get_one("Location"), Some("/photo/1"));

        let response = client.get("/photo/1").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.unwrap();
        assert!(body.contains("src=\"/photos/1\""));
        assert!(body.contains("href=\"/album/1\""));

        let response = client.get("/photos/1").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_bytes().await.unwrap(), b"not really a jpeg".to_vec());

        let response = client.get("/album/1").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_string().await.unwrap().contains("href=\"/photo/1\""));

        assert_eq!(stored_files(&dir), 1);
    }

    #[rocket::async_test]
    async fn upload_without_permission_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        // Album 2 belongs to user 2 and was never shared with user 1
        let response = post_upload(&client, "2", &[("photo", b"bytes")]).await;
        assert_eq!(response.status(), Status::Forbidden);

        let body = client.get("/album/2").dispatch().await.into_string().await.unwrap();
        assert!(!body.contains("href=\"/photo/"));
        assert_eq!(client.get("/photo/1").dispatch().await.status(), Status::NotFound);
        assert_eq!(stored_files(&dir), 0);
    }

    #[rocket::async_test]
    async fn failed_file_write_rolls_back_the_photo() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        // Without its storage directory, the bytes of the upload can't be written
        std::fs::remove_dir_all(dir.path().join("photos")).unwrap();
        let response = post_upload(&client, "1", &[("photo", b"bytes")]).await;
        assert_eq!(response.status(), Status::InternalServerError);

        let body = client.get("/album/1").dispatch().await.into_string().await.unwrap();
        assert!(!body.contains("href=\"/photo/"));
        assert_eq!(client.get("/photo/1").dispatch().await.status(), Status::NotFound);

        // Once storage is back, the next upload gets the id the failed one never kept
        std::fs::create_dir(dir.path().join("photos")).unwrap();
        let response = post_upload(&client, "1", &[("photo", b"bytes")]).await;
        assert_eq!(response.status(), Status::Found);
        assert_eq!(response.headers().get_one("Location"), Some("/photo/1"));
        assert_eq!(stored_files(&dir), 1);
    }

    #[rocket::async_test]
    async fn upload_needs_exactly_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        let response = post_upload(&client, "1", &[("photo", b"one"), ("photo", b"two")]).await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = post_upload(&client, "1", &[("picture", b"one")]).await;
        assert_eq!(response.status(), Status::BadRequest);

        assert_eq!(stored_files(&dir), 0);
        assert_eq!(client.get("/photo/1").dispatch().await.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn missing_photos_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        assert_eq!(client.get("/photo/42").dispatch().await.status(), Status::NotFound);
        assert_eq!(client.get("/photos/42").dispatch().await.status(), Status::NotFound);

        // A row whose file has disappeared from the disk
        let response = post_upload(&client, "3", &[("photo", b"bytes")]).await;
        assert_eq!(response.status(), Status::Found);
        std::fs::remove_file(dir.path().join("photos").join("1")).unwrap();
        assert_eq!(client.get("/photos/1").dispatch().await.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn tags_page_lists_tagged_photos() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        let response = client.get("/tags/2").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_string().await.unwrap().contains("not tagged"));
    }

    #[rocket::async_test]
    async fn static_files_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(&dir).await;

        let response = client.get("/static/style.css").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(Error::InvalidRequestError("x".into()).status(), Status::BadRequest);
        assert_eq!(Error::PermissionDenied { album_id: 1, user_id: 2 }.status(), Status::Forbidden);
        assert_eq!(Error::NotFound("x".into()).status(), Status::NotFound);
        assert_eq!(Error::RenderError("home".into()).status(), Status::InternalServerError);
        assert_eq!(Error::DatabaseError(sqlx::Error::RowNotFound).status(), Status::InternalServerError);
    }
}

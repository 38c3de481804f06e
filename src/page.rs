use std::path::PathBuf;

use rocket::http::ContentType;
use rocket::serde::Serialize;
use rocket_db_pools::sqlx::{self, SqliteConnection};
use rocket_dyn_templates::{context, Metadata};

use crate::photo::Photo;
use crate::{albums, photos, Error};


/// Anything able to render a named template with a serializable context
pub trait Renderer {
    fn render<C: Serialize>(&self, name: &'static str, context: C) -> Option<(ContentType, String)>;
}

/// Templates managed by the `Template` fairing, borrowed for the current request
impl Renderer for Metadata<'_> {
    fn render<C: Serialize>(&self, name: &'static str, context: C) -> Option<(ContentType, String)> {
        Metadata::render(self, name, context)
    }
}


/// A page that has been requested but not loaded yet : this is the query side of a page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageRequest {
    /// Albums owned by a user
    Home { user_id: i64 },
    /// Photos inside an album
    Album { album_id: i64 },
    /// A single photo, already resolved
    Photo(PhotoPage),
}

/// A page with all its data in memory, ready to be rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Home(HomePage),
    Album(AlbumPage),
    Photo(PhotoPage),
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HomePage {
    pub user_id: i64,
    pub albums: Vec<i64>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AlbumPage {
    pub album_id: i64,
    pub photos: Vec<i64>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PhotoPage {
    pub photo_id: i64,
    pub album_id: i64,
    pub path: PathBuf,
}

impl From<Photo> for PhotoPage {
    fn from(photo: Photo) -> Self {
        Self {
            photo_id: photo.id,
            album_id: photo.album_id,
            path: photo.path,
        }
    }
}


impl PageRequest {

    /// SQL query returning the ids listed by this page, with the id to bind to it. The photo
    /// page has nothing to query.
    pub fn query(&self) -> Option<(&'static str, i64)> {
        match self {
            PageRequest::Home { user_id } => Some((albums::ALBUM_IDS_OF_USER, *user_id)),
            PageRequest::Album { album_id } => Some((photos::PHOTO_IDS_IN_ALBUM, *album_id)),
            PageRequest::Photo(_) => None,
        }
    }

    /// Run the query of this page and collect every row, so that nothing is left to fetch
    /// once rendering starts
    pub async fn load(self, conn: &mut SqliteConnection) -> Result<Page, Error> {
        let ids = match self.query() {
            Some((sql, id)) => sqlx::query_scalar::<_, i64>(sql)
                .bind(id)
                .fetch_all(&mut *conn).await?,
            None => Vec::new(),
        };

        Ok(match self {
            PageRequest::Home { user_id } => Page::Home(HomePage { user_id, albums: ids }),
            PageRequest::Album { album_id } => Page::Album(AlbumPage { album_id, photos: ids }),
            PageRequest::Photo(page) => Page::Photo(page),
        })
    }

}


impl Page {

    /// Name of the template used to render this page
    pub fn template_name(&self) -> &'static str {
        match self {
            Page::Home(_) => "home",
            Page::Album(_) => "album",
            Page::Photo(_) => "photo",
        }
    }

    /// Render this page with the given renderer. The page data is available to the template
    /// as `page`, next to the gallery `title`.
    pub fn render<R: Renderer>(&self, renderer: &R, title: &str) -> Result<(ContentType, String), Error> {
        let name = self.template_name();
        let rendered = match self {
            Page::Home(page) => renderer.render(name, context! { title, page }),
            Page::Album(page) => renderer.render(name, context! { title, page }),
            Page::Photo(page) => renderer.render(name, context! { title, page }),
        };
        rendered.ok_or_else(|| Error::RenderError(name.to_string()))
    }

}

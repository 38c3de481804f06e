use crate::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::fs;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::serde::{Serialize, Deserialize};
use tracing::{error, info};


/// Name of the main config file in the app's folder
pub const FILENAME: &'static str = "photoapp.config";

/// Name of the database in Rocket's `databases` table
pub const DATABASE_NAME: &'static str = "photoapp";


/// The app's config
#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// IP address to serve on.
    /// Default : 127.0.0.1
    #[serde(default="config_default_address")]
    pub ADDRESS: String,

    /// Port to serve on.
    /// Default : 8080
    #[serde(default="config_default_port")]
    pub PORT: u16,

    /// Title displayed in the page title and the header of every page.
    #[serde(default="config_default_title")]
    pub TITLE: String,

    /// Path to the SQLite database file.
    /// Default : "photoapp.sqlite" in the app's folder
    #[serde(default="config_default_database_path")]
    pub DATABASE_PATH: String,

    /// Path to the directory where uploaded photos are stored, default is `photos/` in the
    /// app's folder. Write access is required, the directory is created at startup.
    #[serde(default="config_default_photos_dir")]
    pub PHOTOS_DIR: String,

    /// Id of the user every request acts as. There is no sign-in, this stands in for the
    /// authenticated user.
    /// Default : 1
    #[serde(default="config_default_user_id")]
    pub USER_ID: i64,

    /// Maximum size of an upload form, in bytes.
    /// Default : 1000000
    #[serde(default="config_default_max_upload_size")]
    pub MAX_UPLOAD_SIZE: u64,

    /// If enabled, a few demo users and albums are created the first time the database
    /// schema is initialized.
    /// Default : false
    #[serde(default)]
    pub SEED_DEMO_DATA: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ADDRESS: config_default_address(),
            PORT: config_default_port(),
            TITLE: config_default_title(),
            DATABASE_PATH: config_default_database_path(),
            PHOTOS_DIR: config_default_photos_dir(),
            USER_ID: config_default_user_id(),
            MAX_UPLOAD_SIZE: config_default_max_upload_size(),
            SEED_DEMO_DATA: false,
        }
    }
}

impl Config {

    /// Read the main config file and deserialize it into a Config struct
    pub fn read() -> Result<Self, Error> {
        Self::read_path(FILENAME)
    }

    /// Read the config file at the given location and deserialize it into a Config struct.
    /// A missing file is not an error : every key takes its default value.
    pub fn read_path<P>(path: P) -> Result<Self, Error>
        where P: AsRef<Path>
    {
        match fs::read_to_string(&path) {
            Ok(content) => Ok(toml::from_str(content.as_str())?),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("No config file found at \"{}\", using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            Err(error) => Err(Error::FileError(error, PathBuf::from(path.as_ref()))),
        }
    }

    /// Try to read and parse the config file
    /// In case of error, log it and exit with a status code of -1
    pub fn read_or_exit() -> Self {
        Self::read()
            .unwrap_or_else(|e| match e {
                Error::FileError(error, path) => {
                    error!("Unable to open the config file \"{}\" : {}", path.display(), error);
                    std::process::exit(-1);
                }
                Error::TomlParserError(error) => {
                    error!("Unable to parse the config file \"{}\" : {}", FILENAME, error);
                    std::process::exit(-1);
                }
                error => {
                    error!("Unable to load the config file \"{}\" : {}", FILENAME, error);
                    std::process::exit(-1);
                }
            })
    }

    /// Storage root for uploaded photos
    pub fn photos_dir(&self) -> PathBuf {
        PathBuf::from(&self.PHOTOS_DIR)
    }

    /// Translate this config into the figment Rocket is launched with
    pub fn figment(&self) -> Figment {
        let limits = Limits::default()
            .limit("data-form", self.MAX_UPLOAD_SIZE.bytes())
            .limit("file", self.MAX_UPLOAD_SIZE.bytes());
        rocket::Config::figment()
            .merge(("address", &self.ADDRESS))
            .merge(("port", self.PORT))
            .merge((format!("databases.{DATABASE_NAME}.url"), &self.DATABASE_PATH))
            .merge(("limits", limits))
    }

}


// Default values for config keys

fn config_default_address() -> String {
    "127.0.0.1".to_string()
}

fn config_default_port() -> u16 {
    8080
}

fn config_default_title() -> String {
    "Photos".to_string()
}

fn config_default_database_path() -> String {
    "photoapp.sqlite".to_string()
}

fn config_default_photos_dir() -> String {
    "photos".to_string()
}

fn config_default_user_id() -> i64 {
    1
}

fn config_default_max_upload_size() -> u64 {
    1_000_000 // bytes
}

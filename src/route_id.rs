use std::sync::LazyLock;

use regex::Regex;
use rocket::request::FromParam;

use crate::Error;


/// Integer identifier taken from the last segment of a route such as `/album/<id>`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteId(pub i64);

/// Tokens accepted in a route before being parsed as an integer
static VALID_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[a-zA-Z0-9]+$").unwrap());

impl RouteId {
    /// Return the parsed id, or an invalid request error carrying the rejected token
    pub fn parse(param: Result<Self, &str>) -> Result<i64, Error> {
        param
            .map(|id| id.0)
            .map_err(|token| Error::InvalidRequestError(format!("invalid id \"{token}\"")))
    }
}

/// Try to parse a valid id from the given string slice
impl TryFrom<&str> for RouteId {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if !VALID_TOKEN.is_match(value) {
            return Err("Invalid char");
        }
        value.parse::<i64>()
            .map(Self)
            .map_err(|_| "Not an integer")
    }
}

/// Try to parse a valid id from the given route parameter, based on the TryFrom<&str> impl
impl<'r> FromParam<'r> for RouteId {
    type Error = &'r str;

    fn from_param(param: &'r str) -> Result<Self, Self::Error> {
        Self::try_from(param).map_err(|_| param)
    }
}

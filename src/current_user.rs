use rocket::{
    http::Status,
    request::{self, FromRequest},
};
use tracing::error;

use crate::config::Config;

/// Request guard which represents the user a request acts as. There is no sign-in : the id
/// is taken from the `USER_ID` key of the managed config. This guard never forwards, and only
/// fails if no config is managed by Rocket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = ();

    async fn from_request(request: &'r rocket::Request<'_>) -> request::Outcome<Self, Self::Error> {
        match request.rocket().state::<Config>() {
            Some(config) => request::Outcome::Success(CurrentUser(config.USER_ID)),
            None => {
                error!("No config is managed, unable to resolve the current user");
                request::Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

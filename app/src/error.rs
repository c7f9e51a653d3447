use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use err_derive::Error;
use log::*;

use infra::pagination::InvalidPage;
use infra::passwords::PasswordError;

use crate::forms::FormErrors;
use crate::templates;

#[derive(Debug, Error)]
pub enum Error {
    #[error(display = "No {} found matching the query", _0)]
    NotFound(&'static str),
    #[error(display = "Invalid page ({})", _0)]
    InvalidPage(#[error(source)] InvalidPage),
    #[error(display = "Submitted form was invalid: {:?}", _0)]
    Invalid(FormErrors),
    #[error(display = "Login required to view {}", _0)]
    LoginRequired(String),
    #[error(display = "Application state was not registered")]
    MissingState,
    #[error(display = "Database error: {}", _0)]
    Database(#[error(source)] postgres::Error),
    #[error(display = "Connection pool error: {}", _0)]
    Pool(#[error(source)] r2d2::Error),
    #[error(display = "Template error: {}", _0)]
    Template(#[error(source)] tera::Error),
    #[error(display = "{}", _0)]
    Password(#[error(source)] PasswordError),
    #[error(display = "Session encoding error: {}", _0)]
    Json(#[error(source)] serde_json::Error),
    #[error(display = "Blocking task failed: {}", _0)]
    Blocking(#[error(source)] actix_web::error::BlockingError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a single field error as a rejected submission.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FormErrors::default();
        errors.add(field, message);
        Error::Invalid(errors)
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) | Error::InvalidPage(_) => StatusCode::NOT_FOUND,
            Error::Invalid(_) => StatusCode::BAD_REQUEST,
            Error::LoginRequired(_) => StatusCode::FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            Error::LoginRequired(location) => {
                debug!("Redirecting anonymous request to {}", location);
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, location.as_str()))
                    .finish();
            }
            Error::NotFound(_) | Error::InvalidPage(_) | Error::Invalid(_) => {
                info!("{}: {}", status, self)
            }
            _ => error!("Internal error: {}", self),
        }
        templates::error_page(status, &self.to_string())
    }
}

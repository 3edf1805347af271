use rocket::{
    http::Status,
    request::Request,
    response::{self, Responder},
    serde::{json::Json, Serialize},
};
use thiserror::Error;
use tracing::error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or contradictory input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate engagement or uniqueness clash caught at the storage layer.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A rating batch hit a storage constraint while being applied; nothing was kept.
    #[error("{0}")]
    Submission(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Password(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict(message.into())
    }

    /// Sorts a write failure into the taxonomy by the constraint it broke.
    /// `what` names the record being written, e.g. "Comment".
    pub fn from_constraint(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Error::Conflict(format!("{what} already exists."));
            }
            if db.is_foreign_key_violation() {
                return Error::NotFound(format!("{what} references a missing record."));
            }
            if db.is_check_violation() {
                return Error::Validation(format!("{what} violates a data constraint."));
            }
        }
        Error::Database(err)
    }

    pub fn status(&self) -> Status {
        match self {
            Error::Validation(_) => Status::BadRequest,
            Error::NotFound(_) => Status::NotFound,
            Error::Conflict(_) => Status::Conflict,
            Error::Unauthorized(_) => Status::Unauthorized,
            Error::Submission(_) => Status::BadRequest,
            Error::Database(_) | Error::Token(_) | Error::Password(_) => {
                Status::InternalServerError
            }
        }
    }
}

/// `{ "message": ... }`, the body of every error and of plain acknowledgements.
#[derive(Serialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let message = if status == Status::InternalServerError {
            error!(uri = %request.uri(), "{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Message::new(message)).respond_to(request)
    }
}

use std::io::Cursor;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::{Error as DbError, ErrorKind as DbErrorKind, WriteFailure};
use rocket::{
    http::{ContentType, Status},
    response::{self, Responder},
    Request, Response,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way an operation can fail. Failures are recovered at the boundary
/// of the operation that detected them; the responder below turns each into
/// an HTTP status plus a plain-text reason for the UI to display.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] argon2::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No voter registered with matrícula {0}")]
    VoterNotRegistered(String),
    #[error("Voter {0} has already voted")]
    AlreadyVoted(String),
    #[error("Already registered: {0}")]
    DuplicateRegistration(String),
}

impl Error {
    /// Does this database error indicate a unique index violation?
    pub fn is_duplicate_key(err: &DbError) -> bool {
        match err.kind.as_ref() {
            DbErrorKind::Write(WriteFailure::WriteError(write_err)) => write_err.code == 11000,
            _ => false,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'o> {
        let status = match &self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::NotFound(_) | Self::VoterNotRegistered(_) => Status::NotFound,
            Self::AlreadyVoted(_) | Self::DuplicateRegistration(_) => Status::Conflict,
        };

        if status.class().is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        let reason = self.to_string();
        Response::build()
            .status(status)
            .header(ContentType::Plain)
            .sized_body(reason.len(), Cursor::new(reason))
            .ok()
    }
}

//! Roles, access levels, and the JWT cookie tying them to requests.

mod role;
mod token;

pub use role::{AccessLevel, AdminAccess, EleitorAccess, MesarioAccess, Role};
pub use token::{issue_cookie, AuthToken, AUTH_TOKEN_COOKIE};

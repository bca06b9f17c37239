use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};
use time;

use crate::error::Error;
use crate::model::{mongodb::Id, user::User};
use crate::Config;

use super::role::{AccessLevel, EleitorAccess, Role};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token proving an account holds a role. The parameter
/// `A` is the minimum access level demanded wherever the token is used as a
/// request guard; the role carried inside may exceed it.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<A> {
    pub id: Id,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(skip)]
    phantom: PhantomData<A>,
}

impl<A> AuthToken<A> {
    /// Build a token for the given account, carrying its stored role.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            phantom: PhantomData,
        }
    }

    /// Does this token permit the given role's capabilities?
    pub fn permits(&self, required: Role) -> bool {
        self.role.permits(required)
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(time::Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<A>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Issue the auth cookie for a freshly authenticated account.
pub fn issue_cookie(user: &User, config: &Config) -> Cookie<'static> {
    AuthToken::<EleitorAccess>::for_user(user).into_cookie(config)
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<A> {
    #[serde(flatten, bound = "")]
    token: AuthToken<A>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, A> FromRequest<'r> for AuthToken<A>
where
    A: AccessLevel,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that its role covers
    /// the access level this guard demands.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        // Forward to any routes that do not require an authentication token.
        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).or_forward(()));

        // Decode the token.
        let token: Self = try_outcome!(Self::from_cookie(cookie, config).or_forward(()));

        // A valid login with insufficient rights is denied outright, not
        // forwarded: the client should see the refusal.
        if token.permits(A::REQUIRED) {
            Outcome::Success(token)
        } else {
            Outcome::Failure((
                Status::Forbidden,
                Error::Unauthorized(format!(
                    "Role {} does not grant {} access",
                    token.role,
                    A::REQUIRED
                )),
            ))
        }
    }
}

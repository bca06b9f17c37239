use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        auth::{issue_cookie, AUTH_TOKEN_COOKIE},
        mongodb::Coll,
        user::{Credentials, User, UserCore},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![login, logout]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<()> {
    let user = users
        .find_one(UserCore::by_username(&credentials.username), None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Unauthorized(
                "No account found with the provided username and password combination".to_string(),
            )
        })?;

    info!("Account '{}' logged in with role {}", user.username, user.role);
    cookies.add(issue_cookie(&user, config));

    Ok(())
}

#[delete("/auth")]
fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

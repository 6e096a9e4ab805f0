//! Cookie auth for the API.
//!
//! Sessions are created elsewhere: whatever logs the user in stores their ID
//! in a private (encrypted and signed) cookie with [set_auth_cookie]. The
//! [auth_guard] middleware reads it back on every protected request.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{AppState, Error, user::UserID};

pub(crate) const COOKIE_USER_ID: &str = "user_id";

/// Add an auth cookie to the cookie jar for `user_id` that expires after `duration`.
pub fn set_auth_cookie(jar: PrivateCookieJar, user_id: UserID, duration: Duration) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_USER_ID, user_id.as_i64().to_string()))
            .expires(OffsetDateTime::now_utc() + duration)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

pub(crate) fn get_user_id_from_auth_cookie(jar: &PrivateCookieJar) -> Result<UserID, Error> {
    match jar.get(COOKIE_USER_ID) {
        None => Err(Error::Unauthorized),
        Some(user_id_cookie) => user_id_cookie
            .value_trimmed()
            .parse()
            .map(UserID::new)
            .map_err(|_| Error::Unauthorized),
    }
}

/// Middleware function that checks for a valid auth cookie.
///
/// The user ID is placed into the request extensions and the request executed
/// normally if the cookie is valid, otherwise `401 Unauthorized` is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => match error {},
    };

    match get_user_id_from_auth_cookie(&jar) {
        Ok(user_id) => {
            parts.extensions.insert(user_id);
            let request = Request::from_parts(parts, body);

            next.run(request).await
        }
        Err(error) => {
            tracing::debug!("rejected request to {}: missing or invalid auth cookie", parts.uri);
            error.into_response()
        }
    }
}


#[cfg(test)]
mod auth_guard_tests {
    use std::sync::Arc;

    use axum::{
        Extension, Router,
        extract::Path,
        middleware,
        routing::get,
    };
    use axum_extra::extract::PrivateCookieJar;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use time::Duration;

    use crate::{
        AppState,
        alert::LogNotifier,
        auth::{COOKIE_USER_ID, auth_guard, set_auth_cookie},
        config::EnforcerConfig,
        user::UserID,
    };

    fn get_test_app_state() -> AppState {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");

        AppState::new(
            db_connection,
            "foobar",
            Arc::new(LogNotifier),
            EnforcerConfig::default(),
        )
        .expect("Could not create app state.")
    }

    async fn whoami(Extension(user_id): Extension<UserID>) -> String {
        user_id.to_string()
    }

    async fn log_in_as(jar: PrivateCookieJar, Path(user_id): Path<i64>) -> PrivateCookieJar {
        set_auth_cookie(jar, UserID::new(user_id), Duration::minutes(5))
    }

    fn get_test_server() -> TestServer {
        let state = get_test_app_state();
        let app = Router::new()
            .route("/protected", get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route("/log_in/{user_id}", get(log_in_as))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn get_protected_route_succeeds_with_valid_cookie() {
        let server = get_test_server();
        let auth_cookie = server.get("/log_in/7").await.cookie(COOKIE_USER_ID);

        let response = server.get("/protected").add_cookie(auth_cookie).await;

        response.assert_status_ok();
        response.assert_text("7");
    }

    #[tokio::test]
    async fn get_protected_route_without_cookie_is_unauthorized() {
        let server = get_test_server();

        server.get("/protected").await.assert_status_unauthorized();
    }
}

//! Auth endpoints and cookie transport.
//!
//! Tokens never appear in response bodies. Sign-in, sign-up and refresh set
//! the `accessToken` and `refreshToken` cookies (`HttpOnly`) plus a readable
//! `sessionId` marker; sign-out, clear-session and failed refreshes expire all
//! three.

use anyhow::Context;
use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use super::{
    error::AuthError,
    pipeline::{read_cookie, Identity, ACCESS_TOKEN_COOKIE},
    service::TokenPair,
    state::{AuthConfig, AuthState},
    types::{SignInRequest, SignUpRequest, UserProfile},
    utils::generate_session_marker,
};

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const SESSION_ID_COOKIE: &str = "sessionId";

#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "User created; session cookies set"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "User already exists")
    ),
    tag = "auth"
)]
pub async fn sign_up(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignUpRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };
    request.validate()?;

    let tokens = auth_state
        .service()
        .sign_up(&request.name, &request.email, &request.password)
        .await?;
    session_response(auth_state.config(), &tokens)
}

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; session cookies set"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn sign_in(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignInRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };
    request.validate()?;

    let tokens = auth_state
        .service()
        .sign_in(&request.email, &request.password)
        .await?;
    session_response(auth_state.config(), &tokens)
}

#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 200, description = "Refresh session revoked; cookies cleared"),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "auth"
)]
pub async fn sign_out(
    auth_state: Extension<Arc<AuthState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, AuthError> {
    auth_state.service().sign_out(identity.id).await?;
    Ok(cleared_response(auth_state.config(), StatusCode::OK))
}

#[utoipa::path(
    post,
    path = "/auth/clear-session",
    responses(
        (status = 200, description = "Session cookies cleared")
    ),
    tag = "auth"
)]
pub async fn clear_session(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    cleared_response(auth_state.config(), StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/auth/refresh-tokens",
    responses(
        (status = 200, description = "Tokens rotated; new session cookies set"),
        (status = 401, description = "No refresh token cookie"),
        (status = 403, description = "Refresh token rejected; session cookies cleared")
    ),
    tag = "auth"
)]
pub async fn refresh_tokens(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let Some(presented) = read_cookie(&headers, REFRESH_TOKEN_COOKIE) else {
        return Err(AuthError::Unauthorized);
    };

    match auth_state.service().refresh(&presented).await {
        Ok(tokens) => session_response(auth_state.config(), &tokens),
        Err(err) => {
            // Whatever went wrong, the client has to sign in again.
            if let AuthError::Internal(inner) = &err {
                error!("Failed to refresh tokens: {inner:#}");
            } else {
                debug!("Refresh rejected: {err}");
            }
            Ok(cleared_response(auth_state.config(), StatusCode::FORBIDDEN))
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Profile of the signed-in user", body = UserProfile),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "auth"
)]
pub async fn me(
    auth_state: Extension<Arc<AuthState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserProfile>, AuthError> {
    match auth_state.service().me(identity.id).await {
        Ok(user) => Ok(Json(UserProfile::from(user))),
        // Deleted between authentication and lookup.
        Err(AuthError::NotFound) => Err(AuthError::Unauthorized),
        Err(err) => Err(err),
    }
}

fn missing_payload() -> AuthError {
    AuthError::Validation(vec!["Missing payload".to_string()])
}

fn session_response(config: &AuthConfig, tokens: &TokenPair) -> Result<Response, AuthError> {
    let marker = generate_session_marker()?;
    let secure = config.session_cookie_secure();
    let access_ttl = config.access_token_ttl();
    let refresh_ttl = config.refresh_token_ttl();

    let cookies = [
        set_cookie(
            ACCESS_TOKEN_COOKIE,
            &tokens.access_token,
            access_ttl,
            true,
            secure,
        ),
        set_cookie(
            REFRESH_TOKEN_COOKIE,
            &tokens.refresh_token,
            refresh_ttl,
            true,
            secure,
        ),
        set_cookie(SESSION_ID_COOKIE, &marker, refresh_ttl, false, secure),
    ];

    let mut headers = HeaderMap::new();
    for cookie in cookies {
        headers.append(
            SET_COOKIE,
            cookie.context("failed to build session cookie")?,
        );
    }
    Ok((StatusCode::OK, headers).into_response())
}

/// Response that expires every session cookie.
fn cleared_response(config: &AuthConfig, status: StatusCode) -> Response {
    let secure = config.session_cookie_secure();
    let mut headers = HeaderMap::new();
    for (name, http_only) in [
        (ACCESS_TOKEN_COOKIE, true),
        (REFRESH_TOKEN_COOKIE, true),
        (SESSION_ID_COOKIE, false),
    ] {
        match clear_cookie(name, http_only, secure) {
            Ok(cookie) => {
                headers.append(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build clear cookie for {name}: {err}"),
        }
    }
    (status, headers).into_response()
}

fn set_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    http_only: bool,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = max_age.as_secs();
    let mut cookie = format!("{name}={value}; Path=/; SameSite=Strict; Max-Age={max_age}");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    // Only mark cookies secure when the frontend is served over HTTPS.
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_cookie(name: &str, http_only: bool, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    set_cookie(name, "", Duration::ZERO, http_only, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn set_cookie_flags() -> Result<(), InvalidHeaderValue> {
        let cookie = set_cookie("accessToken", "abc", Duration::from_secs(900), true, true)?;
        assert_eq!(
            cookie.to_str().ok(),
            Some("accessToken=abc; Path=/; SameSite=Strict; Max-Age=900; HttpOnly; Secure")
        );

        let marker = set_cookie("sessionId", "m", Duration::from_secs(60), false, false)?;
        assert_eq!(
            marker.to_str().ok(),
            Some("sessionId=m; Path=/; SameSite=Strict; Max-Age=60")
        );
        Ok(())
    }

    #[test]
    fn clear_cookie_expires_immediately() -> Result<(), InvalidHeaderValue> {
        let cookie = clear_cookie("refreshToken", true, false)?;
        assert_eq!(
            cookie.to_str().ok(),
            Some("refreshToken=; Path=/; SameSite=Strict; Max-Age=0; HttpOnly")
        );
        Ok(())
    }

    #[test]
    fn cleared_response_expires_all_cookies() {
        let config = AuthConfig::new(SecretString::from("s"));
        let response = cleared_response(&config, StatusCode::FORBIDDEN);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().all(|cookie| cookie.contains("Max-Age=0")));
        assert!(cookies.iter().any(|cookie| cookie.starts_with("sessionId=")));
    }

    #[test]
    fn session_response_sets_three_cookies() -> anyhow::Result<()> {
        let config = AuthConfig::new(SecretString::from("s"))
            .with_frontend_base_url("https://app.tessera.dev".to_string());
        let tokens = TokenPair {
            access_token: "a.b.c".to_string(),
            refresh_token: "d.e.f".to_string(),
        };
        let response = session_response(&config, &tokens).map_err(|e| anyhow::anyhow!("{e}"))?;

        let cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 3);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("accessToken=a.b.c;") && c.contains("Max-Age=900")));
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("refreshToken=d.e.f;") && c.contains("Max-Age=604800")));
        assert!(cookies.iter().all(|c| c.ends_with("; Secure")));
        Ok(())
    }
}

use std::{convert::Infallible, sync::Arc};

use tokio::sync::Mutex;
use warp::{
    http::{header::AUTHORIZATION, HeaderMap},
    Filter, Rejection,
};

use crate::{
    config::Config,
    database::{Insert, Lookup, UserDatabase},
    error::AppError,
    password::PasswordHasher,
    token::TokenIssuer,
    types::{Identity, User, Username},
};

pub(crate) struct AppState {
    pub(crate) hasher: PasswordHasher,
    pub(crate) tokens: TokenIssuer,
    database: Arc<Mutex<dyn UserDatabase>>,
}

impl AppState {
    pub async fn find_user(&self, username: &Username) -> Result<Lookup, AppError> {
        let lookup = self.database.lock().await.find_user(username).await?;

        Ok(lookup)
    }

    pub async fn create_user(&self, user: User) -> Result<Insert, AppError> {
        let insert = self.database.lock().await.create_user(user).await?;

        Ok(insert)
    }
}

/// Shared, read-only handle on everything a request needs: the password hasher, the token
/// issuer and the user database. Cheap to clone.
#[derive(Clone)]
pub struct App {
    pub(crate) internal: Arc<AppState>,
}

impl App {
    pub fn new(config: &Config, database: Arc<Mutex<dyn UserDatabase>>) -> Self {
        Self {
            internal: Arc::new(AppState {
                hasher: PasswordHasher::new(),
                tokens: TokenIssuer::new(&config.jwt_secret, config.token_lifetime),
                database,
            }),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.internal.tokens
    }
}

/// Requires `Authorization: Bearer <token>` and extracts the verified [`Identity`].
///
/// Every failure rejects with an [`AppError`], so whatever is chained after this filter only
/// runs for authenticated requests.
pub fn with_auth(app: &App) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(with_state(app.internal.clone()))
        .and_then(check_bearer)
}

async fn check_bearer(headers: HeaderMap, state: Arc<AppState>) -> Result<Identity, Rejection> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AppError::AuthMissing("Not authorized"))?;

    let token = header
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or(AppError::AuthMissing("Not a valid token"))?;

    match state.tokens.verify(token) {
        Ok(identity) => Ok(identity),
        Err(e) => {
            tracing::warn!(error = ?e, "rejected bearer token");
            Err(e.into())
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    const PREFIX: &str = "bearer ";

    let scheme = header.get(..PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(PREFIX) {
        return None;
    }

    let token = header[PREFIX.len()..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// functor that adds a reference to the shared state into the filter chain
pub(crate) fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

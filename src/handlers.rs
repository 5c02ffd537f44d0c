use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;
use warp::{reply::Json, Rejection, Reply};

use crate::{
    auth::AppState,
    database::{Insert, Lookup},
    error::AppError,
    types::{Credentials, Identity, User, UserID, Username},
    validation::ValidatedBody,
};

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub message: String,
}

pub(crate) async fn sign_up(
    input: ValidatedBody,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let input: Credentials = serde_json::from_value(Value::Object(input.validated))
        .map_err(|_| AppError::InvalidBody)?;

    let username = Username(input.username);

    if let Lookup::Found(_) = state.find_user(&username).await? {
        tracing::info!(username = %username.0, "sign-up refused, username taken");
        Err(AppError::UsernameTaken)?;
    }

    let password = state.hasher.hash(&input.password).await?;

    let user = User {
        id: UserID(Uuid::new_v4().to_string()),
        username,
        password,
    };

    // a concurrent sign-up may have claimed the name while we were hashing
    let user = match state.create_user(user).await? {
        Insert::Created(user) => user,
        Insert::AlreadyExists => {
            tracing::info!("sign-up lost a race for the same username");
            return Err(AppError::UsernameTaken.into());
        }
    };

    let token = state.tokens.issue(&Identity::from(&user))?;

    tracing::info!(user_id = %user.id.0, username = %user.username.0, "user signed up");

    Ok(warp::reply::json(&SignUpResponse { token }))
}

pub(crate) async fn sign_in(
    input: Credentials,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let username = Username(input.username);

    let user = match state.find_user(&username).await? {
        Lookup::Found(user) => user,
        Lookup::NotFound => {
            tracing::info!(username = %username.0, "sign-in for unknown username");
            return Err(AppError::CredentialMismatch.into());
        }
    };

    if !state.hasher.compare(&input.password, &user.password).await? {
        tracing::info!(user_id = %user.id.0, "sign-in with wrong password");
        Err(AppError::CredentialMismatch)?;
    }

    let token = state.tokens.issue(&Identity::from(&user))?;

    tracing::info!(user_id = %user.id.0, "user signed in");

    Ok(warp::reply::json(&SignInResponse {
        token,
        message: "Signed in".to_owned(),
    }))
}

// Resource routes acknowledge the request without touching storage.

pub(crate) fn list(resource: &'static str, identity: Identity) -> Json {
    warp::reply::json(&json!({
        "message": format!("Get all {}s", resource),
        "owner": identity.id,
    }))
}

pub(crate) fn get_one(resource: &'static str, id: String, identity: Identity) -> Json {
    warp::reply::json(&json!({
        "message": format!("Get {} with id", resource),
        "id": id,
        "owner": identity.id,
    }))
}

pub(crate) fn create(resource: &'static str, identity: Identity, input: ValidatedBody) -> Json {
    tracing::debug!(resource, owner = %identity.id, "create");

    warp::reply::json(&json!({
        "message": format!("Add a {}", resource),
        "owner": identity.id,
        "data": input.validated,
    }))
}

pub(crate) fn update(
    resource: &'static str,
    id: String,
    identity: Identity,
    input: ValidatedBody,
) -> Json {
    tracing::debug!(resource, %id, owner = %identity.id, "update");

    warp::reply::json(&json!({
        "message": format!("Update {} with id", resource),
        "id": id,
        "owner": identity.id,
        "data": input.validated,
    }))
}

pub(crate) fn delete(resource: &'static str, id: String, identity: Identity) -> Json {
    tracing::debug!(resource, %id, owner = %identity.id, "delete");

    warp::reply::json(&json!({
        "message": format!("Delete {} with id", resource),
        "id": id,
        "owner": identity.id,
    }))
}

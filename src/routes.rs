use std::convert::Infallible;

use serde_json::{json, Value};
use warp::{
    filters::BoxedFilter,
    hyper::StatusCode,
    path,
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge},
    reply::Json,
    Filter, Rejection, Reply,
};

use crate::{
    auth::{with_auth, with_state, App},
    error::{AppError, ValidationFailure},
    handlers,
    schemas::{PRODUCT, UPDATE, UPDATE_POINT, USER},
    types::{Credentials, Identity},
    validation::{json_body, validate_many, validate_one, ValidatedBody},
};

/// Every route of the service: the public sign-up/sign-in pair and the authenticated `/api`
/// resources. Chain [`handle_rejection`] with `recover` to turn failures into responses.
pub fn build_api_route_filter(
    app: &App,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let home = path::end()
        .and(warp::get())
        .map(|| warp::reply::with_status("Hello", StatusCode::OK));

    let signup = path!("signup")
        .and(warp::post())
        .and(validate_many(&USER, &["username", "password"]))
        .and(with_state(app.internal.clone()))
        .and_then(handlers::sign_up);

    let signin = path!("signin")
        .and(warp::post())
        .and(credentials())
        .and(with_state(app.internal.clone()))
        .and_then(handlers::sign_in);

    let api = path("api").and(
        resource_routes(
            app,
            "product",
            validate_one(&PRODUCT, "name").boxed(),
            validate_one(&PRODUCT, "name").boxed(),
        )
        .or(resource_routes(
            app,
            "update",
            validate_many(&UPDATE, &["title", "body", "productId"]).boxed(),
            validate_many(&UPDATE, &["title", "body", "status", "version", "asset"]).boxed(),
        ))
        .unify()
        .or(resource_routes(
            app,
            "updatepoint",
            validate_many(&UPDATE_POINT, &["name", "description", "updateId"]).boxed(),
            validate_many(&UPDATE_POINT, &["name", "description"]).boxed(),
        ))
        .unify(),
    );

    home.or(signup).or(signin).or(api)
}

/// GET/POST on `/<resource>` and GET/PUT/DELETE on `/<resource>/:id`, all behind [`with_auth`].
/// Authentication runs before the body is read, so an unauthenticated request is never
/// validated.
fn resource_routes(
    app: &App,
    resource: &'static str,
    create: BoxedFilter<(ValidatedBody,)>,
    update: BoxedFilter<(ValidatedBody,)>,
) -> BoxedFilter<(Json,)> {
    let collection = path(resource).and(path::end());
    let item = path(resource).and(path::param::<String>()).and(path::end());

    let list = collection
        .clone()
        .and(warp::get())
        .and(with_auth(app))
        .map(move |identity: Identity| handlers::list(resource, identity));

    let add = collection
        .and(warp::post())
        .and(with_auth(app))
        .and(create)
        .map(move |identity: Identity, input: ValidatedBody| {
            handlers::create(resource, identity, input)
        });

    let get_one = item
        .clone()
        .and(warp::get())
        .and(with_auth(app))
        .map(move |id: String, identity: Identity| handlers::get_one(resource, id, identity));

    let change = item
        .clone()
        .and(warp::put())
        .and(with_auth(app))
        .and(update)
        .map(move |id: String, identity: Identity, input: ValidatedBody| {
            handlers::update(resource, id, identity, input)
        });

    let remove = item
        .and(warp::delete())
        .and(with_auth(app))
        .map(move |id: String, identity: Identity| handlers::delete(resource, id, identity));

    list.or(add)
        .unify()
        .or(get_one)
        .unify()
        .or(change)
        .unify()
        .or(remove)
        .unify()
        .boxed()
}

fn credentials() -> impl Filter<Extract = (Credentials,), Error = Rejection> + Clone {
    json_body().and_then(|body: Value| async move {
        serde_json::from_value::<Credentials>(body)
            .map_err(|_| warp::reject::custom(AppError::InvalidBody))
    })
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(app_error) = err.find::<AppError>() {
        match app_error {
            AppError::AuthMissing(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": message }))
            }
            AppError::AuthInvalid { .. } => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Not a valid token" }),
            ),
            AppError::UsernameTaken => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "message": app_error.to_string(),
                    "suggestion": "Create a unique username.",
                }),
            ),
            AppError::CredentialMismatch => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": app_error.to_string() }),
            ),
            AppError::ValidationFailed(ValidationFailure::Single(message)) => {
                (StatusCode::FORBIDDEN, json!({ "message": message }))
            }
            AppError::ValidationFailed(ValidationFailure::Many(errors)) => {
                (StatusCode::FORBIDDEN, json!({ "message": errors }))
            }
            AppError::InvalidBody => (
                StatusCode::BAD_REQUEST,
                json!({ "message": app_error.to_string() }),
            ),
            AppError::Database { .. } | AppError::Hashing(_) | AppError::TokenSigning { .. } => {
                tracing::error!(error = ?app_error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "an unknown error has occurred" }),
                )
            }
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "message": "Not found" }))
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "message": "Method not allowed" }),
        )
    } else if err.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "message": "Request body too large" }),
        )
    } else if err.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            json!({ "message": "Content-Length required" }),
        )
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": "an unknown error has occurred" }),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::{
        config::Config,
        database::{DatabaseError, InMemoryUserDatabase, Insert, Lookup, UserDatabase},
        types::{User, Username},
    };

    fn app() -> App {
        App::new(
            &Config::new("route secret"),
            Arc::new(Mutex::new(InMemoryUserDatabase::new())),
        )
    }

    fn routes(app: &App) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        build_api_route_filter(app).recover(handle_rejection)
    }

    async fn post(app: &App, path: &str, body: Value) -> (StatusCode, Value) {
        let response = warp::test::request()
            .method("POST")
            .path(path)
            .json(&body)
            .reply(&routes(app))
            .await;

        let status = response.status();
        (status, serde_json::from_slice(response.body()).unwrap())
    }

    #[tokio::test]
    async fn sign_up_issues_token_for_new_username() {
        let app = app();

        let (status, body) = post(
            &app,
            "/signup",
            json!({ "username": "sam", "password": "foobar" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let identity = app.tokens().verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(identity.username, "sam");
    }

    #[tokio::test]
    async fn sign_up_with_taken_username_is_refused() {
        let app = app();
        let credentials = json!({ "username": "sam", "password": "foobar" });
        post(&app, "/signup", credentials).await;

        let (status, body) = post(
            &app,
            "/signup",
            json!({ "username": "sam", "password": "something else" }),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Username already exists!");
        assert_eq!(body["suggestion"], "Create a unique username.");
    }

    #[tokio::test]
    async fn taken_username_is_refused_whatever_the_password() {
        let app = app();
        post(
            &app,
            "/signup",
            json!({ "username": "sam", "password": "foobar" }),
        )
        .await;

        for password in ["", "foobar", "a much longer password"] {
            let (status, body) = post(
                &app,
                "/signup",
                json!({ "username": "sam", "password": password }),
            )
            .await;

            assert_eq!(status, StatusCode::UNAUTHORIZED, "password {:?}", password);
            assert_eq!(body["message"], "Username already exists!");
            assert_eq!(body["suggestion"], "Create a unique username.");
        }
    }

    #[tokio::test]
    async fn sign_up_requires_string_credentials() {
        let (status, body) = post(
            &app(),
            "/signup",
            json!({ "username": 42, "password": "foobar" }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"]["username"], "Expected string, received number");
    }

    // Misses every lookup but refuses every insert, like a store that lost a concurrent sign-up.
    struct RacingDatabase;

    #[async_trait]
    impl UserDatabase for RacingDatabase {
        async fn find_user(&self, _username: &Username) -> Result<Lookup, DatabaseError> {
            Ok(Lookup::NotFound)
        }

        async fn create_user(&mut self, _user: User) -> Result<Insert, DatabaseError> {
            Ok(Insert::AlreadyExists)
        }
    }

    #[tokio::test]
    async fn sign_up_that_loses_the_insert_race_is_refused() {
        let app = App::new(
            &Config::new("route secret"),
            Arc::new(Mutex::new(RacingDatabase)),
        );

        let (status, body) = post(
            &app,
            "/signup",
            json!({ "username": "sam", "password": "foobar" }),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Username already exists!");
        assert_eq!(body["suggestion"], "Create a unique username.");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn sign_in_checks_password_and_username() {
        let app = app();
        post(
            &app,
            "/signup",
            json!({ "username": "sam", "password": "foobar" }),
        )
        .await;

        let (status, body) = post(
            &app,
            "/signin",
            json!({ "username": "sam", "password": "foobar" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
        assert!(body["message"].is_string());

        let (status, _) = post(
            &app,
            "/signin",
            json!({ "username": "sam", "password": "hunter1" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = post(
            &app,
            "/signin",
            json!({ "username": "nobody", "password": "foobar" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password");
    }

    #[tokio::test]
    async fn api_requires_authorization_header() {
        let response = warp::test::request()
            .method("GET")
            .path("/api/product")
            .reply(&routes(&app()))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unauthenticated_write_is_rejected_before_validation() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/product")
            .json(&json!({ "name": "" }))
            .reply(&routes(&app()))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_with_empty_title_is_forbidden() {
        let app = app();
        let token = app
            .tokens()
            .issue(&Identity {
                username: "sam".into(),
                id: "c0a80121-7ac0-4e1c-9b6a-0f2b9d3a5e77".into(),
            })
            .unwrap();

        let response = warp::test::request()
            .method("PUT")
            .path("/api/update/42")
            .header("authorization", format!("Bearer {}", token))
            .json(&json!({
                "title": "",
                "body": "notes",
                "status": "LIVE",
                "version": "1.0.0",
                "asset": "cdn/1.0.0.zip",
            }))
            .reply(&routes(&app))
            .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["message"]["title"].is_string());
    }

    #[tokio::test]
    async fn authenticated_product_routes_respond() {
        let app = app();
        let token = app
            .tokens()
            .issue(&Identity {
                username: "sam".into(),
                id: "c0a80121-7ac0-4e1c-9b6a-0f2b9d3a5e77".into(),
            })
            .unwrap();
        let bearer = format!("Bearer {}", token);

        let response = warp::test::request()
            .method("POST")
            .path("/api/product")
            .header("authorization", &bearer)
            .json(&json!({ "name": "Widget" }))
            .reply(&routes(&app))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["data"]["name"], "Widget");

        let response = warp::test::request()
            .method("DELETE")
            .path("/api/product/7")
            .header("authorization", &bearer)
            .reply(&routes(&app))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["id"], "7");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = warp::test::request()
            .path("/nowhere")
            .reply(&routes(&app()))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod password;
mod routes;
pub mod schemas;
mod token;
mod types;
pub mod validation;

pub use auth::*;
pub use config::*;
pub use database::*;
pub use error::*;
pub use handlers::{SignInResponse, SignUpResponse};
pub use password::*;
pub use routes::*;
pub use token::*;
pub use types::*;

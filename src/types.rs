use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[repr(transparent)]
pub struct UserID(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct Username(pub String);

#[derive(Debug, Clone, Deserialize, Serialize)]
#[repr(transparent)]
pub struct HashedPassword(pub String);

/// A persisted account. The password is only ever stored in hashed form.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserID,
    pub username: Username,
    pub password: HashedPassword,
}

/// The identity carried inside a bearer token, and attached to every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub username: String,
    pub id: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.0.clone(),
            id: user.id.0.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct Claims {
    pub(crate) username: String,
    pub(crate) id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) exp: Option<u64>,
}

/// Request body of both sign-up and sign-in.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

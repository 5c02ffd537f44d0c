use std::{collections::HashMap, error::Error};

use async_trait::async_trait;

use crate::types::{User, Username};

pub type DatabaseError = Box<dyn Error + Send + Sync>;

/// Outcome of looking a user up by name.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(User),
    NotFound,
}

/// Outcome of persisting a new user.
#[derive(Debug, Clone)]
pub enum Insert {
    Created(User),
    /// Another account already owns the username; nothing was written.
    AlreadyExists,
}

#[async_trait]
pub trait UserDatabase: Send + Sync + 'static {
    /// Retrieve the user with the specified username, if there is one.
    async fn find_user(&self, username: &Username) -> Result<Lookup, DatabaseError>;

    /// Persist the given user. Usernames are unique: if one is already taken, report
    /// [`Insert::AlreadyExists`] and leave the stored account untouched.
    async fn create_user(&mut self, user: User) -> Result<Insert, DatabaseError>;
}

/// Process-local user storage, keyed by username. Accounts do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryUserDatabase {
    storage: HashMap<Username, User>,
}

impl InMemoryUserDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDatabase for InMemoryUserDatabase {
    async fn find_user(&self, username: &Username) -> Result<Lookup, DatabaseError> {
        Ok(match self.storage.get(username) {
            Some(user) => Lookup::Found(user.clone()),
            None => Lookup::NotFound,
        })
    }

    async fn create_user(&mut self, user: User) -> Result<Insert, DatabaseError> {
        if self.storage.contains_key(&user.username) {
            return Ok(Insert::AlreadyExists);
        }

        self.storage.insert(user.username.clone(), user.clone());
        Ok(Insert::Created(user))
    }
}

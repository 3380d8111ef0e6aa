/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Logged-in user and bearer token, kept in memory and mirrored to a small
//! key/value store on disk.

use connector::User;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not logged in. Use `minijenkins login` to log in.")]
    NotLoggedIn,
    #[error("failed to write session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserState {
    Loading,
    LoggedOut,
    LoggedIn(User),
}

pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError>;
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

#[cfg(test)]
impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON object of string values, one file per configuration directory.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore { path }
    }

    fn read(&self) -> HashMap<String, String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return HashMap::new(),
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
            HashMap::new()
        })
    }

    fn write(&self, values: &HashMap<String, String>) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        fs::write(&self.path, serde_json::to_string_pretty(values)?).map_err(io_err)
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read().remove(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError> {
        let mut values = self.read();
        values.insert(key.to_string(), value);
        self.write(&values)
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        let mut values = self.read();
        if values.remove(key).is_some() {
            self.write(&values)?;
        }

        Ok(())
    }
}

pub struct Session<S: SessionStore> {
    store: S,
    state: UserState,
}

impl<S: SessionStore> Session<S> {
    pub fn new(store: S) -> Self {
        Session {
            store,
            state: UserState::Loading,
        }
    }

    /// Never fails: a missing token or an unparsable user resolves to
    /// [`UserState::LoggedOut`], and whatever half of the session is left in
    /// the store is removed.
    pub fn hydrate(&mut self) -> &UserState {
        let token = self.store.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let user = self.store.get(USER_KEY);
        let stale = token.is_some() || user.is_some();

        self.state = match (token, user) {
            (Some(_), Some(user)) => match serde_json::from_str::<User>(&user) {
                Ok(user) => UserState::LoggedIn(user),
                Err(e) => {
                    warn!(error = %e, "stored user is malformed, treating session as logged out");
                    UserState::LoggedOut
                }
            },
            (None, Some(_)) => {
                debug!("stored user without token, treating session as logged out");
                UserState::LoggedOut
            }
            (Some(_), None) => {
                debug!("stored token without user, treating session as logged out");
                UserState::LoggedOut
            }
            (None, None) => UserState::LoggedOut,
        };

        if stale && self.state == UserState::LoggedOut {
            if let Err(e) = self.clear_store() {
                warn!(error = %e, "failed to remove stale session");
            }
        }

        &self.state
    }

    pub fn state(&self) -> &UserState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            UserState::LoggedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn require_user(&self) -> Result<&User, SessionError> {
        self.user().ok_or(SessionError::NotLoggedIn)
    }

    /// Bearer token of a logged-in session. `None` in any other state.
    pub fn token(&self) -> Option<String> {
        self.user()?;
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn login(&mut self, user: User, token: String) -> Result<(), SessionError> {
        self.store.set(TOKEN_KEY, token)?;
        self.update(user)
    }

    pub fn update(&mut self, user: User) -> Result<(), SessionError> {
        self.store.set(USER_KEY, serde_json::to_string(&user)?)?;
        self.state = UserState::LoggedIn(user);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.state = UserState::LoggedOut;
        self.clear_store()
    }

    fn clear_store(&mut self) -> Result<(), SessionError> {
        self.store.remove(USER_KEY)?;
        self.store.remove(TOKEN_KEY)
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }
}

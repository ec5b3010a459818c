use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use log::debug;
use rand::RngCore;

use super::form::{FormError, FormResult};

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredToken {
    pub value: String,
    pub expires_at: Option<SystemTime>,
}

pub trait TokenStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self, session: &SessionId, form_id: &str) -> Result<Option<StoredToken>, Self::Error>;
    fn store(
        &self,
        session: &SessionId,
        form_id: &str,
        token: StoredToken,
    ) -> Result<(), Self::Error>;
    fn clear(&self, session: &SessionId, form_id: &str) -> Result<(), Self::Error>;
}

#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    state: Arc<RwLock<BTreeMap<(SessionId, String), StoredToken>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    type Error = Infallible;

    fn load(&self, session: &SessionId, form_id: &str) -> Result<Option<StoredToken>, Self::Error> {
        let state = match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(state.get(&(session.clone(), form_id.to_string())).cloned())
    }

    fn store(
        &self,
        session: &SessionId,
        form_id: &str,
        token: StoredToken,
    ) -> Result<(), Self::Error> {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.insert((session.clone(), form_id.to_string()), token);
        Ok(())
    }

    fn clear(&self, session: &SessionId, form_id: &str) -> Result<(), Self::Error> {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.remove(&(session.clone(), form_id.to_string()));
        Ok(())
    }
}

pub trait TokenProvider: Send + Sync {
    fn issue(&self, form_id: &str, session: &SessionId) -> FormResult<String>;
    fn verify(&self, form_id: &str, session: &SessionId, supplied: &str) -> FormResult<bool>;
}

pub struct CsrfGuard<S: TokenStore> {
    store: S,
    ttl: Option<Duration>,
}

impl<S: TokenStore> CsrfGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store, ttl: None }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl<S: TokenStore> TokenProvider for CsrfGuard<S> {
    // Storing replaces the previous token, so at most one verifies at a time.
    fn issue(&self, form_id: &str, session: &SessionId) -> FormResult<String> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let value = hex::encode(bytes);
        let token = StoredToken {
            value: value.clone(),
            expires_at: self.ttl.map(|ttl| SystemTime::now() + ttl),
        };
        self.store
            .store(session, form_id, token)
            .map_err(|error| FormError::TokenStore(error.to_string()))?;
        debug!("issued token for form '{form_id}'");
        Ok(value)
    }

    fn verify(&self, form_id: &str, session: &SessionId, supplied: &str) -> FormResult<bool> {
        let stored = self
            .store
            .load(session, form_id)
            .map_err(|error| FormError::TokenStore(error.to_string()))?;
        let Some(token) = stored else {
            debug!("no active token for form '{form_id}'");
            return Ok(false);
        };
        if token
            .expires_at
            .is_some_and(|expires_at| SystemTime::now() > expires_at)
        {
            debug!("token for form '{form_id}' has expired");
            return Ok(false);
        }
        Ok(fixed_time_eq(&token.value, supplied))
    }
}

fn fixed_time_eq(left: &str, right: &str) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.bytes()
        .zip(right.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

//! In-process [`UserStore`] used by the service and router tests.
//!
//! Writes are staged per transaction and only become visible on commit, so
//! rollback behaviour can be asserted without a database.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    auth::{
        repo_types::{NewUser, User},
        store::{UserStore, UserTransaction},
    },
    errors::AuthError,
};

#[derive(Default)]
struct Inner {
    rows: Mutex<Vec<User>>,
    next_id: AtomicUsize,
    begun: AtomicUsize,
    open: AtomicUsize,
    fail_inserts: AtomicBool,
    insert_yields_nothing: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert fail with a persistence error.
    pub fn fail_inserts(&self, on: bool) {
        self.inner.fail_inserts.store(on, Ordering::SeqCst);
    }

    /// Make every insert succeed without returning an id.
    pub fn insert_yields_nothing(&self, on: bool) {
        self.inner.insert_yields_nothing.store(on, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<User> {
        self.inner.rows.lock().unwrap().clone()
    }

    pub fn committed_email(&self, email: &str) -> Option<User> {
        self.rows().into_iter().find(|u| u.email == email)
    }

    /// Transactions started so far.
    pub fn begun(&self) -> usize {
        self.inner.begun.load(Ordering::SeqCst)
    }

    /// Transactions not yet committed, rolled back or dropped.
    pub fn open(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, AuthError> {
        self.inner.begun.fetch_add(1, Ordering::SeqCst);
        self.inner.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            pending: Vec::new(),
        }))
    }
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    pending: Vec<User>,
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserTransaction for MemoryTransaction {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError> {
        if let Some(u) = self.pending.iter().find(|u| u.email == email) {
            return Ok(Some(u.clone()));
        }
        let rows = self.inner.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&mut self, user: &NewUser) -> Result<Option<i32>, AuthError> {
        user.ensure_complete().map_err(AuthError::Validation)?;
        if self.inner.fail_inserts.load(Ordering::SeqCst) {
            return Err(AuthError::Persistence("simulated insert failure".into()));
        }
        if self.inner.insert_yields_nothing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) as i32 + 1;
        self.pending.push(User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            status: user.status,
        });
        Ok(Some(id))
    }

    async fn commit(self: Box<Self>) -> Result<(), AuthError> {
        let mut this = self;
        let pending = std::mem::take(&mut this.pending);
        let mut rows = this.inner.rows.lock().unwrap();
        if pending
            .iter()
            .any(|p| rows.iter().any(|r| r.email == p.email))
        {
            return Err(AuthError::DuplicateEmail);
        }
        rows.extend(pending);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AuthError> {
        drop(self);
        Ok(())
    }
}

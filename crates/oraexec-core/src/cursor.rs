//! REF CURSOR handles
//!
//! A ref cursor is an open result set on the server, handed back as the
//! value of an output parameter. It can only be fetched through the
//! session that opened it, and only once.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{ColumnMeta, ExecError, Result, Value};

/// The session side of a ref cursor
///
/// Drivers implement this on whatever object owns the server session so
/// that cursors outlive the command that produced them.
#[async_trait]
pub trait CursorSource: Send + Sync {
    /// Whether the owning session is still open
    fn is_open(&self) -> bool;

    /// Fetch every remaining row of the cursor, in server order
    async fn fetch_all(&self, cursor_id: u32) -> Result<Vec<Vec<Value>>>;
}

struct RefCursorInner {
    cursor_id: u32,
    session_id: Uuid,
    columns: Vec<ColumnMeta>,
    source: Arc<dyn CursorSource>,
    consumed: AtomicBool,
}

/// An open REF CURSOR returned in an output parameter
#[derive(Clone)]
pub struct RefCursor {
    inner: Arc<RefCursorInner>,
}

impl RefCursor {
    pub fn new(
        cursor_id: u32,
        session_id: Uuid,
        columns: Vec<ColumnMeta>,
        source: Arc<dyn CursorSource>,
    ) -> Self {
        Self {
            inner: Arc::new(RefCursorInner {
                cursor_id,
                session_id,
                columns,
                source,
                consumed: AtomicBool::new(false),
            }),
        }
    }

    /// Get the server-side cursor ID
    pub fn cursor_id(&self) -> u32 {
        self.inner.cursor_id
    }

    /// Session that opened the cursor
    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    /// Get the column metadata
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.inner.columns
    }

    pub fn column_count(&self) -> usize {
        self.inner.columns.len()
    }

    /// Whether the owning session is still open
    pub fn is_open(&self) -> bool {
        self.inner.source.is_open()
    }

    /// Whether the cursor has already been drained
    pub fn is_consumed(&self) -> bool {
        self.inner.consumed.load(Ordering::SeqCst)
    }

    /// Claim the cursor for a single drain and fetch all of its rows.
    ///
    /// Fails with [`ExecError::StaleCursor`] if the session is closed or the
    /// cursor was claimed before. Cursors are forward-only, so a failed
    /// fetch still leaves the cursor claimed.
    pub async fn fetch_all(&self) -> Result<Vec<Vec<Value>>> {
        if !self.is_open() {
            return Err(ExecError::StaleCursor(format!(
                "cursor {} belongs to session {} which is closed",
                self.cursor_id(),
                self.session_id()
            )));
        }
        if self.inner.consumed.swap(true, Ordering::SeqCst) {
            return Err(ExecError::StaleCursor(format!(
                "cursor {} has already been drained",
                self.cursor_id()
            )));
        }
        tracing::trace!(cursor_id = self.cursor_id(), session_id = %self.session_id(), "draining ref cursor");
        self.inner.source.fetch_all(self.cursor_id()).await
    }
}

impl PartialEq for RefCursor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RefCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCursor")
            .field("cursor_id", &self.inner.cursor_id)
            .field("session_id", &self.inner.session_id)
            .field("columns", &self.inner.columns.len())
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

//! A response sink that accepts exactly one response.
//!
//! The handler task and the timeout path both hold a [`GuardedWriter`]. Every
//! write goes through one mutex and a monotonic state machine:
//!
//! ```text
//! Open --write_header--> HeaderWritten --write_body--> BodyWritten
//!   \_____________________write_body_____________________/
//! ```
//!
//! Whoever moves the writer out of `Open` first owns the response; every later
//! attempt is rejected with [`ResponseWriteError`] and counted.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Open,
    HeaderWritten,
    BodyWritten,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResponseWriteError {
    #[error("response header already written")]
    HeaderAlreadyWritten,

    #[error("response already complete")]
    Complete,
}

struct Inner {
    state: WriteState,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    header_writes: usize,
    rejected_writes: usize,
}

#[derive(Clone)]
pub struct GuardedWriter {
    inner: Arc<Mutex<Inner>>,
}

impl Default for GuardedWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardedWriter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: WriteState::Open,
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                header_writes: 0,
                rejected_writes: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Commit the status line and headers. Only accepted while `Open`.
    pub fn write_header(
        &self,
        status: StatusCode,
        headers: HeaderMap,
    ) -> Result<(), ResponseWriteError> {
        let mut inner = self.lock();
        match inner.state {
            WriteState::Open => {
                inner.status = status;
                inner.headers = headers;
                inner.state = WriteState::HeaderWritten;
                inner.header_writes += 1;
                Ok(())
            }
            WriteState::HeaderWritten => {
                inner.rejected_writes += 1;
                Err(ResponseWriteError::HeaderAlreadyWritten)
            }
            WriteState::BodyWritten => {
                inner.rejected_writes += 1;
                Err(ResponseWriteError::Complete)
            }
        }
    }

    /// Commit the body and complete the response. Writing the body while
    /// `Open` implies status 200 with no extra headers.
    pub fn write_body(&self, body: impl Into<Bytes>) -> Result<(), ResponseWriteError> {
        let mut inner = self.lock();
        match inner.state {
            WriteState::Open => {
                inner.header_writes += 1;
                inner.body = body.into();
                inner.state = WriteState::BodyWritten;
                Ok(())
            }
            WriteState::HeaderWritten => {
                inner.body = body.into();
                inner.state = WriteState::BodyWritten;
                Ok(())
            }
            WriteState::BodyWritten => {
                inner.rejected_writes += 1;
                Err(ResponseWriteError::Complete)
            }
        }
    }

    /// Write a whole response in one step, only if nothing has been written
    /// yet. Returns whether the response was taken.
    pub fn write_if_open(&self, status: StatusCode, headers: HeaderMap, body: Bytes) -> bool {
        let mut inner = self.lock();
        if inner.state != WriteState::Open {
            return false;
        }
        inner.status = status;
        inner.headers = headers;
        inner.body = body;
        inner.header_writes += 1;
        inner.state = WriteState::BodyWritten;
        true
    }

    pub fn state(&self) -> WriteState {
        self.lock().state
    }

    /// Status of the committed response, if a header has been written.
    pub fn status(&self) -> Option<StatusCode> {
        let inner = self.lock();
        (inner.state != WriteState::Open).then_some(inner.status)
    }

    /// Number of accepted transitions out of `Open`. Never more than one.
    pub fn header_writes(&self) -> usize {
        self.lock().header_writes
    }

    pub fn rejected_writes(&self) -> usize {
        self.lock().rejected_writes
    }

    /// Take the committed response and close the writer for good.
    ///
    /// Forces `BodyWritten`, so a handler task that is still running cannot
    /// write afterwards. An untouched writer yields an empty 200.
    pub fn seal(&self) -> Response {
        let mut inner = self.lock();
        inner.state = WriteState::BodyWritten;

        let mut response = Response::new(Body::from(std::mem::take(&mut inner.body)));
        *response.status_mut() = inner.status;
        *response.headers_mut() = std::mem::take(&mut inner.headers);
        response
    }
}

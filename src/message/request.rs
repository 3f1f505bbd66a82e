use super::body::Body;
use super::framing::Framing;
use std::io;
use std::ops::{Deref, DerefMut};
use tokio_util::sync::CancellationToken;

/// An outbound HTTP request whose body can be cloned.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Body>,
    /// Framing metadata beyond the headers
    pub framing: Framing,
    cancel: CancellationToken,
}

impl Request {
    pub fn new(inner: http::Request<Body>) -> Self {
        let framing = Framing::from_headers(inner.headers());
        Self {
            inner,
            framing,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the token that cancels this request in flight
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn into_inner(self) -> http::Request<Body> {
        self.inner
    }

    /// Make a copy of this request, body included, leaving this body intact.
    ///
    /// `cancel` becomes the copy's cancellation token; it plays no part in
    /// copying the body.
    pub fn clone_body(&mut self, cancel: CancellationToken) -> io::Result<Request> {
        let body = self.inner.body_mut().duplicate()?;

        let mut inner = http::Request::new(body);
        *inner.method_mut() = self.inner.method().clone();
        *inner.uri_mut() = self.inner.uri().clone();
        *inner.version_mut() = self.inner.version();
        *inner.headers_mut() = self.inner.headers().clone();

        Ok(Request {
            inner,
            framing: self.framing.clone(),
            cancel,
        })
    }
}

impl Deref for Request {
    type Target = http::Request<Body>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Request {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<http::Request<Body>> for Request {
    fn from(inner: http::Request<Body>) -> Self {
        Self::new(inner)
    }
}

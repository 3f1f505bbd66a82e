use super::body::Body;
use super::framing::Framing;
use std::io;
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Transport details of the connection a response arrived on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub remote_addr: Option<SocketAddr>,
    /// the exchange was secured with TLS
    pub secure: bool,
}

/// An HTTP response whose body can be cloned.
#[derive(Debug)]
pub struct Response {
    inner: http::Response<Body>,
    /// Framing metadata beyond the headers
    pub framing: Framing,
    /// The transport decoded a compressed body
    pub uncompressed: bool,
    /// Shared, read-only connection details
    pub connection: Option<Arc<ConnectionInfo>>,
}

impl Response {
    pub fn new(inner: http::Response<Body>) -> Self {
        let framing = Framing::from_headers(inner.headers());
        Self {
            inner,
            framing,
            uncompressed: false,
            connection: None,
        }
    }

    pub fn into_inner(self) -> http::Response<Body> {
        self.inner
    }

    /// Make a copy of this response, body included, leaving this body intact.
    pub fn clone_body(&mut self) -> io::Result<Response> {
        let body = self.inner.body_mut().duplicate()?;

        let mut inner = http::Response::new(body);
        *inner.status_mut() = self.inner.status();
        *inner.version_mut() = self.inner.version();
        *inner.headers_mut() = self.inner.headers().clone();

        Ok(Response {
            inner,
            framing: self.framing.clone(),
            uncompressed: self.uncompressed,
            connection: self.connection.clone(),
        })
    }
}

impl Deref for Response {
    type Target = http::Response<Body>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Response {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<http::Response<Body>> for Response {
    fn from(inner: http::Response<Body>) -> Self {
        Self::new(inner)
    }
}

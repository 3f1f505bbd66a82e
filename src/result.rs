use crate::error::CloneError;
use crate::message::{Request, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Where in the request a payload was injected
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    Header,
    Query,
    Body,
    Path,
    Cookie,
    Method,
    Other(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Header => f.write_str("header"),
            Location::Query => f.write_str("query"),
            Location::Body => f.write_str("body"),
            Location::Path => f.write_str("path"),
            Location::Cookie => f.write_str("cookie"),
            Location::Method => f.write_str("method"),
            Location::Other(other) => f.write_str(other),
        }
    }
}

impl From<&str> for Location {
    fn from(location: &str) -> Self {
        match location.to_ascii_lowercase().as_str() {
            "header" => Location::Header,
            "query" => Location::Query,
            "body" => Location::Body,
            "path" => Location::Path,
            "cookie" => Location::Cookie,
            "method" => Location::Method,
            _ => Location::Other(location.to_string()),
        }
    }
}

#[derive(Debug)]
struct Injection {
    payload: String,
    location: Location,
    field_name: String,
    time_elapsed: Duration,
}

/// One fuzzing observation: the request sent, the response received, and
/// what was injected where.
///
/// The metadata is fixed at construction. The request and response are owned
/// by whoever holds this value.
#[derive(Debug)]
pub struct FuzzResult {
    pub request: Request,
    pub response: Response,
    injection: Arc<Injection>,
}

impl FuzzResult {
    pub fn new(
        request: Request,
        response: Response,
        payload: impl Into<String>,
        location: Location,
        field_name: impl Into<String>,
        time_elapsed: Duration,
    ) -> Self {
        Self {
            request,
            response,
            injection: Arc::new(Injection {
                payload: payload.into(),
                location,
                field_name: field_name.into(),
                time_elapsed,
            }),
        }
    }

    /// The fuzz input that was injected
    pub fn payload(&self) -> &str {
        &self.injection.payload
    }

    pub fn location(&self) -> &Location {
        &self.injection.location
    }

    /// Name of the mutated field
    pub fn field_name(&self) -> &str {
        &self.injection.field_name
    }

    /// Round trip time of the exchange
    pub fn time_elapsed(&self) -> Duration {
        self.injection.time_elapsed
    }

    /// Produce an independent copy for one consumer.
    ///
    /// Both bodies are drained and restored, so `self` stays readable. The
    /// copy's request is cancelled together with this one.
    pub fn fork(&mut self) -> Result<FuzzResult, CloneError> {
        let cancel = self.request.cancellation().child_token();
        let request = self
            .request
            .clone_body(cancel)
            .map_err(CloneError::Request)?;
        let response = self.response.clone_body().map_err(CloneError::Response)?;

        Ok(FuzzResult {
            request,
            response,
            injection: Arc::clone(&self.injection),
        })
    }
}

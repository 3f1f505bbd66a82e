use crate::message::*;
use anyhow::{bail, Result};
use reqwest::Url;
use std::sync::Arc;

/// A reqwest client that speaks our Request and Response types
#[derive(Clone, Debug, Default)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Send a request and read the whole response.
    ///
    /// The request's cancellation token aborts the exchange while it is in flight.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let url = Url::parse(&request.uri().to_string())?;
        let has_body = !request.body().is_absent();
        let body = request.body_mut().drain()?;

        let mut outbound = reqwest::Request::new(request.method().clone(), url.clone());
        *outbound.version_mut() = request.version();
        *outbound.headers_mut() = request.headers().clone();
        if has_body {
            *outbound.body_mut() = Some(body.into());
        }

        let cancel = request.cancellation().clone();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("request to {url} was cancelled"),
            response = self.inner.execute(outbound) => response?,
        };

        read_response(response).await
    }
}

impl From<reqwest::Client> for Client {
    fn from(inner: reqwest::Client) -> Self {
        Self::new(inner)
    }
}

async fn read_response(response: reqwest::Response) -> Result<Response> {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let content_length = response.content_length();
    let connection = ConnectionInfo {
        remote_addr: response.remote_addr(),
        secure: response.url().scheme() == "https",
    };

    let body = response.bytes().await?;

    let mut inner = http::Response::new(Body::from(body));
    *inner.status_mut() = status;
    *inner.version_mut() = version;
    *inner.headers_mut() = headers;

    let mut response = Response::new(inner);
    if response.framing.content_length.is_none() {
        response.framing.content_length = content_length;
    }
    response.connection = Some(Arc::new(connection));
    Ok(response)
}

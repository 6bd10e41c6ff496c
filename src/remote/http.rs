//! reqwest-backed transport

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use tracing::debug;
use url::Url;

use super::{RemoteBody, Transport};
use crate::config::Credentials;
use crate::error::{Result, network};

/// Blocking HTTP(S) transport with optional basic auth
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Build a transport. `connect_timeout` bounds connection setup only;
    /// artifact downloads may take as long as they need.
    pub fn new(connect_timeout: Duration, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None::<Duration>)
            .user_agent(concat!("triquetra/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| network::http("client", format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials,
        })
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => req.basic_auth(&creds.user, Some(&creds.password)),
            None => req,
        }
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &Url, timeout: Option<Duration>) -> Result<RemoteBody> {
        let mut req = self.authorize(self.client.get(url.as_str()));
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let res = req.send().map_err(|e| network::http(url, e))?;
        if !res.status().is_success() {
            return Err(network::http(url, format!("HTTP {}", res.status())));
        }

        debug!(%url, len = ?res.content_length(), "opened remote file");
        Ok(RemoteBody {
            len: res.content_length(),
            reader: Box::new(res),
        })
    }

    fn exists(&self, url: &Url) -> Result<bool> {
        let res = self
            .authorize(self.client.head(url.as_str()))
            .send()
            .map_err(|e| network::http(url, e))?;

        if res.status().is_success() {
            return Ok(true);
        }
        if res.status() == StatusCode::NOT_FOUND || res.status() == StatusCode::GONE {
            return Ok(false);
        }
        Err(network::http(url, format!("HTTP {}", res.status())))
    }
}

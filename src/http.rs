//! HTTP client construction and request building for the completion endpoint.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};

use crate::config::ClientConfig;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client.
///
/// No request timeout is configured here: each call runs under its own
/// deadline so expiry can be reported as a timeout rather than a transport
/// failure.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// Start a JSON `POST` to `{base_url}/{path}` carrying the bearer credential.
pub fn authorized_post(client: &Client, config: &ClientConfig, path: &str) -> RequestBuilder {
    let url = format!("{}/{}", config.base_url, path.trim_start_matches('/'));
    client
        .post(url)
        .header(
            AUTHORIZATION,
            format!("Bearer {}", config.api_key.expose_secret()),
        )
        .header(CONTENT_TYPE, "application/json")
}

use std::sync::{LazyLock, PoisonError, RwLock};

use ureq::{http::HeaderMap, typestate::WithoutBody, Agent, Proxy, RequestBuilder};

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("lodestone/", env!("CARGO_PKG_VERSION"));

/// Process-wide HTTP settings applied to every request.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    /// Extra headers added to each request before any per-request header.
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(DEFAULT_USER_AGENT.into()),
            headers: None,
            proxy: None,
        }
    }
}

impl ClientConfig {
    /// Builds an agent for this configuration.
    ///
    /// Status codes are never turned into errors by the agent so a 404 stays
    /// distinguishable from a transport failure. Timeouts are set per request.
    pub fn build(&self) -> Agent {
        let builder = Agent::config_builder()
            .proxy(self.proxy.clone())
            .http_status_as_error(false);

        match &self.user_agent {
            Some(user_agent) => builder.user_agent(user_agent).build().into(),
            None => builder.build().into(),
        }
    }
}

struct Client {
    config: ClientConfig,
    agent: Agent,
}

impl Client {
    fn new(config: ClientConfig) -> Self {
        let agent = config.build();
        Self { config, agent }
    }
}

static CLIENT: LazyLock<RwLock<Client>> =
    LazyLock::new(|| RwLock::new(Client::new(ClientConfig::default())));

/// Starts a GET request on the shared agent with the configured extra headers.
pub fn get(url: &str) -> RequestBuilder<WithoutBody> {
    let client = CLIENT.read().unwrap_or_else(PoisonError::into_inner);
    with_headers(client.agent.get(url), client.config.headers.as_ref())
}

fn with_headers<B>(req: RequestBuilder<B>, headers: Option<&HeaderMap>) -> RequestBuilder<B> {
    headers
        .into_iter()
        .flatten()
        .fold(req, |req, (key, value)| req.header(key, value))
}

/// Edits the shared configuration and rebuilds the agent.
///
/// ```
/// use lodestone_dl::http_client::configure_http_client;
///
/// configure_http_client(|cfg| {
///     cfg.user_agent = Some("my-launcher/1.0".to_string());
/// });
/// ```
pub fn configure_http_client<F>(update: F)
where
    F: FnOnce(&mut ClientConfig),
{
    let mut client = CLIENT.write().unwrap_or_else(PoisonError::into_inner);
    let mut config = client.config.clone();
    update(&mut config);
    *client = Client::new(config);
}

#[cfg(test)]
mod tests {
    use ureq::http::{header::ACCEPT, HeaderValue};

    use super::*;

    #[test]
    fn test_default_user_agent() {
        let config = ClientConfig::default();
        assert!(config
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.starts_with("lodestone/")));
        assert!(config.headers.is_none());
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_with_headers_applies_each_header() {
        let agent = ClientConfig::default().build();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let req = with_headers(agent.get("http://localhost/api/modpacks"), Some(&headers));

        assert_eq!(
            req.headers_ref()
                .and_then(|h| h.get(ACCEPT))
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn test_configure_keeps_previous_settings() {
        configure_http_client(|cfg| cfg.user_agent = Some("launcher-test/1".into()));
        configure_http_client(|cfg| cfg.headers = None);

        let client = CLIENT.read().unwrap();
        assert_eq!(client.config.user_agent.as_deref(), Some("launcher-test/1"));
        drop(client);

        configure_http_client(|cfg| cfg.user_agent = Some(DEFAULT_USER_AGENT.into()));
    }
}

//! Resilient HTTP(S) client.
//!
//! # Data Flow
//! ```text
//! Client::execute(request)
//!     → hyper-util legacy client (pooling, protocol framing)
//!     → connector.rs for each connection the pool cannot satisfy
//!     → response streamed back to the caller
//! ```
//!
//! # Design Decisions
//! - No process-wide default instance; clients are built explicitly
//! - Randomness, resolvers and the keepalive capability check are
//!   injectable through the builder for deterministic tests
//! - Convenience verbs are pure forwarding onto `execute`

pub mod connector;
pub mod proxy;

pub use connector::{Connector, TransportStream};
pub use proxy::{ProxyEndpoint, ProxySelector};

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Method, Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::client::legacy;
use hyper_util::rt::TokioExecutor;

use crate::config::ClientConfig;
use crate::dns::{FallbackResolver, HostResolver, Resolve, SystemResolver};
use crate::error::Error;
use crate::net::{
    AddressPicker, Establisher, KeepaliveConfigurer, KeepaliveSupport, RandomPicker,
};

/// HTTP(S) client whose connections are established through the resilient
/// dial pipeline.
///
/// Cheap to clone; clones share the same connection pool.
#[derive(Clone)]
pub struct Client {
    http: legacy::Client<Connector, Full<Bytes>>,
}

impl Client {
    /// Build a client with default configuration.
    pub fn new() -> Result<Self, Error> {
        ClientBuilder::default().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Execute a request, dialing a new connection through the resilient
    /// pipeline whenever the pool has none available.
    pub async fn execute(&self, request: Request<Full<Bytes>>) -> Result<Response<Incoming>, Error> {
        self.http.request(request).await.map_err(Error::Engine)
    }

    /// `GET` the given URL.
    pub async fn get(&self, url: &str) -> Result<Response<Incoming>, Error> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Full::default())?;
        self.execute(request).await
    }

    /// `HEAD` the given URL.
    pub async fn head(&self, url: &str) -> Result<Response<Incoming>, Error> {
        let request = Request::builder()
            .method(Method::HEAD)
            .uri(url)
            .body(Full::default())?;
        self.execute(request).await
    }

    /// `POST` a body with the given content type.
    pub async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<Response<Incoming>, Error> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(Full::new(body.into()))?;
        self.execute(request).await
    }

    /// `POST` a form-encoded body.
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> Result<Response<Incoming>, Error> {
        let body = serde_urlencoded::to_string(form).map_err(Error::FormEncode)?;
        self.post(url, "application/x-www-form-urlencoded", body)
            .await
    }
}

/// Builds a [`Client`] from explicit parts.
pub struct ClientBuilder {
    config: ClientConfig,
    resolver: Option<Arc<dyn Resolve>>,
    picker: Option<Arc<dyn AddressPicker>>,
    keepalive_supported: Option<KeepaliveSupport>,
    proxies: Option<ProxySelector>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            resolver: None,
            picker: None,
            keepalive_supported: None,
            proxies: None,
        }
    }
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the primary resolver (the system resolver by default).
    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the random address picker.
    pub fn address_picker(mut self, picker: Arc<dyn AddressPicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    /// Force the keepalive capability check to a fixed answer.
    pub fn keepalive_supported(mut self, supported: bool) -> Self {
        self.keepalive_supported = Some(Arc::new(move || supported));
        self
    }

    /// Replace the environment-derived proxy selection.
    pub fn proxies(mut self, proxies: ProxySelector) -> Self {
        self.proxies = Some(proxies);
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        self.config.validate()?;
        let fallback_addr = self.config.fallback_nameserver_addr()?;
        let config = Arc::new(self.config);

        let primary = self
            .resolver
            .unwrap_or_else(|| Arc::new(SystemResolver::new()));
        let fallback: Arc<dyn Resolve> = Arc::new(FallbackResolver::new(
            fallback_addr,
            config.resolve_timeout(),
        ));
        let resolver = HostResolver::new(primary, fallback, config.resolve_timeout());

        let picker = self.picker.unwrap_or_else(|| Arc::new(RandomPicker));
        let establisher = Establisher::new(picker, config.connect_timeout());

        let mut keepalive = KeepaliveConfigurer::from_config(&config);
        if let Some(supported) = self.keepalive_supported {
            keepalive = keepalive.with_support(supported);
        }

        let proxies = self.proxies.unwrap_or_else(ProxySelector::from_env);
        let connector = Connector::new(Arc::clone(&config), resolver, establisher, keepalive, proxies);

        let http = legacy::Client::builder(TokioExecutor::new()).build(connector);
        Ok(Client { http })
    }
}

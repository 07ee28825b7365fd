//! `HuddleServer` builder and server loop.
//!
//! Ties the layers together: the router hands upgraded sockets to the
//! transport, the session layer gates admission, and the room layer does
//! the fan-out.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::routes::{AppState, build_routes};
use crate::{Config, HuddleError};

/// Builder for configuring and starting a Huddle server.
///
/// # Example
///
/// ```rust,no_run
/// use huddle::{Config, HuddleServer};
///
/// # async fn start() -> Result<(), huddle::HuddleError> {
/// let server = HuddleServer::builder()
///     .config(Config::new("change-me"))
///     .bind("127.0.0.1:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct HuddleServerBuilder {
    config: Option<Config>,
    bind_addr: Option<String>,
}

impl HuddleServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration. Without one, `build` reads the environment.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the configured bind address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Binds the listener and assembles the shared state.
    pub async fn build(self) -> Result<HuddleServer, HuddleError> {
        let mut config = match self.config {
            Some(config) => config,
            None => Config::from_env()?,
        };
        if let Some(addr) = self.bind_addr {
            config.bind_address = addr;
        }

        let listener = TcpListener::bind(&config.bind_address).await?;
        let state = Arc::new(AppState::new(&config));

        Ok(HuddleServer { listener, state })
    }
}

/// A bound Huddle server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct HuddleServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl HuddleServer {
    /// Creates a new builder.
    pub fn builder() -> HuddleServerBuilder {
        HuddleServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the shared state the handlers see.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<(), HuddleError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes, then stops accepting and waits
    /// for in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), HuddleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.listener.local_addr()?;
        tracing::info!(%addr, "Huddle server listening");

        let app = build_routes(self.state);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "server failed");
                HuddleError::Io(e)
            })?;

        tracing::info!("Huddle server stopped");
        Ok(())
    }
}

//! Server lifecycle orchestration.
//!
//! # Responsibilities
//! - Build the route table and CORS negotiator from handler bindings
//! - Load TLS credentials, bind the listener and start serving
//! - Stop serving and cancel outstanding invocations
//!
//! # Design Decisions
//! - Fail fast: credential and bind errors surface from `start()`, never later
//! - `stop()` closes connections immediately; in-flight work is not drained
//! - Operations out of order return [`LifecycleError::InvalidState`]

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum_server::Handle;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{IngressConfig, RouteConfig};
use crate::cors::{CorsNegotiator, CorsPolicy};
use crate::handler::Handler;
use crate::http::{build_router, AppState, DecodeLimits};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{resolve_bind_address, tls};
use crate::routing::{RouteError, RouteTable};

/// Where the server is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    Running,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot {operation} a server that is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("route registration failed: {0}")]
    Route(#[from] RouteError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load TLS credentials: {0}")]
    Tls(#[source] std::io::Error),
}

/// A route plus the handler that serves it.
#[derive(Clone)]
pub struct HandlerBinding {
    pub route: RouteConfig,
    pub handler: Arc<dyn Handler>,
}

impl HandlerBinding {
    pub fn new(route: RouteConfig, handler: Arc<dyn Handler>) -> Self {
        Self { route, handler }
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

/// The HTTP ingress server.
pub struct IngressServer {
    config: IngressConfig,
    state: LifecycleState,
    app: Option<AppState>,
    shutdown: Shutdown,
    handle: Option<Handle>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl IngressServer {
    pub fn new(config: IngressConfig) -> Self {
        Self {
            config,
            state: LifecycleState::Created,
            app: None,
            shutdown: Shutdown::new(),
            handle: None,
            task: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &IngressConfig {
        &self.config
    }

    fn expect_state(&self, operation: &'static str, expected: LifecycleState) -> Result<(), LifecycleError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Register every binding and fix the CORS policy.
    pub fn initialize(&mut self, bindings: Vec<HandlerBinding>, cors: CorsPolicy) -> Result<(), LifecycleError> {
        self.expect_state("initialize", LifecycleState::Created)?;

        let mut builder = RouteTable::builder();
        for binding in bindings {
            builder.route(&binding.route.method, &binding.route.path, binding.handler)?;
        }
        let routes = builder.build();
        tracing::info!(routes = routes.len(), "Route table built");

        self.app = Some(AppState::new(
            routes,
            CorsNegotiator::new(cors),
            DecodeLimits::from(&self.config.listener),
            self.shutdown.subscribe(),
        ));
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    /// The fully layered router, once initialized.
    pub fn router(&self) -> Option<Router> {
        self.app.clone().map(build_router)
    }

    /// Bind and start serving. Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, LifecycleError> {
        self.expect_state("start", LifecycleState::Initialized)?;
        let Some(app) = self.app.clone() else {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                state: self.state,
            });
        };

        let listener = &self.config.listener;
        let credentials = tls::from_config(&listener.tls).await.map_err(LifecycleError::Tls)?;
        let addr = resolve_bind_address(listener)
            .await
            .map_err(|source| LifecycleError::Bind {
                address: listener.bind_address(),
                source,
            })?;

        let handle = Handle::new();
        let service = build_router(app).into_make_service();
        let secure = credentials.is_some();
        let task = match credentials {
            Some(rustls) => tokio::spawn(
                axum_server::bind_rustls(addr, rustls)
                    .handle(handle.clone())
                    .serve(service),
            ),
            None => tokio::spawn(axum_server::bind(addr).handle(handle.clone()).serve(service)),
        };

        let Some(local_addr) = handle.listening().await else {
            let source = match task.await {
                Ok(Err(e)) => e,
                Ok(Ok(())) => std::io::Error::other("server exited before listening"),
                Err(e) => std::io::Error::other(e),
            };
            tracing::error!(address = %addr, error = %source, "Failed to bind listener");
            return Err(LifecycleError::Bind {
                address: addr.to_string(),
                source,
            });
        };

        tracing::info!(address = %local_addr, tls = secure, "Ingress listening");
        self.handle = Some(handle);
        self.task = Some(task);
        self.state = LifecycleState::Running;
        Ok(local_addr)
    }

    /// Stop serving. Open connections are closed without draining and
    /// every outstanding invocation context is cancelled.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        self.expect_state("stop", LifecycleState::Running)?;

        if let Some(handle) = self.handle.take() {
            let in_flight = handle.connection_count();
            if in_flight > 0 {
                tracing::warn!(connections = in_flight, "Closing in-flight connections");
            }
            self.shutdown.trigger();
            handle.shutdown();
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Server exited with error"),
                Err(e) => tracing::warn!(error = %e, "Server task failed"),
            }
        }

        self.state = LifecycleState::Stopped;
        tracing::info!("Ingress stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::EchoHandler;

    fn bindings() -> Vec<HandlerBinding> {
        vec![HandlerBinding::new(RouteConfig::new("GET", "/ping"), Arc::new(EchoHandler))]
    }

    #[test]
    fn state_names() {
        assert_eq!(LifecycleState::Initialized.to_string(), "initialized");
    }

    #[test]
    fn initialize_moves_to_initialized() {
        let mut server = IngressServer::new(IngressConfig::default());
        assert_eq!(server.state(), LifecycleState::Created);
        assert!(server.router().is_none());

        server.initialize(bindings(), CorsPolicy::default()).unwrap();
        assert_eq!(server.state(), LifecycleState::Initialized);
        assert!(server.router().is_some());
    }

    #[test]
    fn initialize_twice_is_invalid() {
        let mut server = IngressServer::new(IngressConfig::default());
        server.initialize(bindings(), CorsPolicy::default()).unwrap();
        let err = server.initialize(bindings(), CorsPolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState {
                operation: "initialize",
                state: LifecycleState::Initialized
            }
        ));
    }

    #[test]
    fn duplicate_binding_fails_initialize() {
        let mut server = IngressServer::new(IngressConfig::default());
        let mut dup = bindings();
        dup.extend(bindings());
        let err = server.initialize(dup, CorsPolicy::default()).unwrap_err();
        assert!(matches!(err, LifecycleError::Route(RouteError::Duplicate { .. })));
        assert_eq!(server.state(), LifecycleState::Created);
    }

    #[tokio::test]
    async fn start_before_initialize_is_invalid() {
        let mut server = IngressServer::new(IngressConfig::default());
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState { operation: "start", .. }));
    }

    #[tokio::test]
    async fn stop_before_start_is_invalid() {
        let mut server = IngressServer::new(IngressConfig::default());
        server.initialize(bindings(), CorsPolicy::default()).unwrap();
        let err = server.stop().await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState { operation: "stop", .. }));
    }
}

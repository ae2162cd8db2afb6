//! `Exporter` server and closely related types.

use std::{
    convert::Infallible,
    fmt,
    future::{self, Future},
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
};

use hyper::{server::conn::http1, service::service_fn, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use splunk_metrics::{GlobalRegistry, RegistrationError};
use tokio::{io, net::TcpListener, sync::watch};

use crate::{
    client::SplunkClient,
    handler::{plain_text_response, ExpositionHandler, ScrapeHandler},
    metrics::{ExporterMetrics, HandlerMetrics},
};


/// Default path serving the exporter self-metrics.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
/// Default path scraping Splunk health.
pub const DEFAULT_SCRAPE_PATH: &str = "/scrape";

#[derive(Clone)]
struct ExporterInner {
    registry: Arc<GlobalRegistry>,
    metrics_path: Arc<str>,
    scrape_path: Arc<str>,
    exposition: ExpositionHandler,
    scrape: ScrapeHandler,
}

impl ExporterInner {
    async fn route<B>(&self, request: Request<B>) -> Response<String> {
        let path = request.uri().path();
        if path == &*self.scrape_path {
            self.scrape.handle(request).await
        } else if path == &*self.metrics_path {
            self.exposition.serve(request.headers(), |buffer, format| {
                self.registry.encode(buffer, format)
            })
        } else {
            plain_text_response(StatusCode::NOT_FOUND, "not found".to_owned())
        }
    }
}

/// Prometheus exporter of Splunk health.
///
/// The exporter serves two endpoints:
///
/// - Scrape path (by default, `/scrape`): scrapes Splunk health on each request and serves it
///   as the `splunk_health` gauge
/// - Metrics path (by default, `/metrics`): serves self-metrics from the [`GlobalRegistry`]
///   the exporter was created with
///
/// Other paths respond with 404.
pub struct Exporter<'a> {
    inner: ExporterInner,
    shutdown_future: Pin<Box<dyn Future<Output = ()> + Send + 'a>>,
}

impl fmt::Debug for Exporter<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Exporter")
            .field("registry", &self.inner.registry)
            .field("metrics_path", &self.inner.metrics_path)
            .field("scrape_path", &self.inner.scrape_path)
            .finish_non_exhaustive()
    }
}

impl<'a> Exporter<'a> {
    /// Creates an exporter querying Splunk with the provided `client`. Self-metrics are registered
    /// in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if self-metrics cannot be registered in the registry.
    pub fn new(client: SplunkClient, registry: Arc<GlobalRegistry>) -> Result<Self, RegistrationError> {
        let metrics = ExporterMetrics::initialize(&registry)?;
        let exposition = ExpositionHandler::new(HandlerMetrics::initialize(&registry)?);
        let scrape = ScrapeHandler::new(client, metrics, exposition.clone());
        Ok(Self {
            inner: ExporterInner {
                registry,
                metrics_path: DEFAULT_METRICS_PATH.into(),
                scrape_path: DEFAULT_SCRAPE_PATH.into(),
                exposition,
                scrape,
            },
            shutdown_future: Box::pin(future::pending()),
        })
    }

    /// Sets paths for self-metrics and Splunk scraping.
    #[must_use]
    pub fn with_paths(mut self, metrics_path: &str, scrape_path: &str) -> Self {
        self.inner.metrics_path = metrics_path.into();
        self.inner.scrape_path = scrape_path.into();
        self
    }

    /// Sets whether scrape latency should be observed for failed scrapes.
    #[must_use]
    pub fn with_failed_scrape_timing(mut self, observe: bool) -> Self {
        self.inner.scrape = self.inner.scrape.with_failed_scrape_timing(observe);
        self
    }

    /// Configures graceful shutdown for the exporter server.
    #[must_use]
    pub fn with_graceful_shutdown<F>(mut self, shutdown: F) -> Self
    where
        F: Future<Output = ()> + Send + 'a,
    {
        self.shutdown_future = Box::pin(shutdown);
        self
    }

    /// Starts the server on the specified address. This future resolves when the server is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn start(self, bind_address: SocketAddr) -> io::Result<()> {
        self.bind(bind_address).await?.start().await
    }

    /// Creates an HTTP exporter server and binds it to the specified address.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn bind(mut self, bind_address: SocketAddr) -> io::Result<ExporterServer<'a>> {
        let listener = TcpListener::bind(bind_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(
            %local_addr,
            metrics_path = &*self.inner.metrics_path,
            scrape_path = &*self.inner.scrape_path,
            "Bound Splunk exporter web server"
        );

        let server = async move {
            let (started_shutdown_sender, started_shutdown) = watch::channel(());
            loop {
                let stream = tokio::select! {
                    res = listener.accept() => res?.0,
                    () = &mut self.shutdown_future => break,
                };

                let io = TokioIo::new(stream);
                let inner = self.inner.clone();
                let mut started_shutdown = started_shutdown.clone();
                tokio::spawn(async move {
                    let conn = http1::Builder::new().serve_connection(
                        io,
                        service_fn(|request| {
                            let inner = inner.clone();
                            async move { Ok::<_, Infallible>(inner.route(request).await) }
                        }),
                    );
                    tokio::pin!(conn);

                    let res = tokio::select! {
                        _ = started_shutdown.changed() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                        res = conn.as_mut() => res,
                    };
                    if let Err(err) = res {
                        tracing::warn!(%err, "Error serving connection");
                    }
                });
            }

            tracing::info!("Stop signal received, Splunk exporter is shutting down");
            // Send the graceful shutdown signal to all alive connections.
            drop(started_shutdown);
            started_shutdown_sender.send_replace(());
            // Wait until all connections are dropped.
            started_shutdown_sender.closed().await;

            Ok(())
        };

        Ok(ExporterServer {
            server: Box::pin(server),
            local_addr,
        })
    }
}

/// Exporter server bound to a certain local address returned by [`Exporter::bind()`].
///
/// Useful e.g. if you need to find out which port the server was bound to if the 0th port was specified.
#[must_use = "Server should be `start()`ed"]
pub struct ExporterServer<'a> {
    server: Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>,
    local_addr: SocketAddr,
}

impl fmt::Debug for ExporterServer<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ExporterServer")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl ExporterServer<'_> {
    /// Returns the local address this server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts this server. Resolves once the server is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if starting the server operation fails.
    pub async fn start(self) -> io::Result<()> {
        self.server.await?;
        tracing::info!("Splunk exporter server shut down");
        Ok(())
    }
}

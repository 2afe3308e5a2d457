use std::net::SocketAddr;
use std::sync::Arc;

use error_stack::Report;
use error_stack::ResultExt;
use poem::get;
use poem::listener::Acceptor;
use poem::listener::Listener;
use poem::listener::TcpAcceptor;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::Endpoint;
use poem::EndpointExt;
use poem::Route;
use poem::Server;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use super::handlers::get_metrics;
use super::ApiError;
use crate::metrics::IknowMetrics;

/// Routes of the metrics server
pub fn routes(metrics: Arc<IknowMetrics>) -> impl Endpoint {
    Route::new()
        .at("/metrics", get(get_metrics))
        .data(metrics)
        .with(Tracing)
}

/// HTTP server exposing `/metrics`
///
/// Binding happens in [`MetricsServer::bind`] so an unusable listen address
/// fails startup before any background task is spawned.
pub struct MetricsServer {
    acceptor: TcpAcceptor,
    metrics: Arc<IknowMetrics>,
    local_addr: Option<SocketAddr>,
}

impl MetricsServer {
    /// Bind `listen_addr` for serving `metrics`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Bind`] if the address cannot be resolved or bound
    pub async fn bind(
        listen_addr: &str,
        metrics: Arc<IknowMetrics>,
    ) -> Result<Self, Report<ApiError>> {
        let acceptor = TcpListener::bind(listen_addr.to_string())
            .into_acceptor()
            .await
            .change_context_lazy(|| ApiError::Bind {
                addr: listen_addr.to_string(),
            })?;

        let local_addr = acceptor
            .local_addr()
            .into_iter()
            .find_map(|addr| addr.0.as_socket_addr().copied());

        Ok(Self {
            acceptor,
            metrics,
            local_addr,
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Serve scrapes until `cancellation_token` is cancelled.
    ///
    /// # Errors
    ///
    /// - [`ApiError::ServerError`] if the server stops with an I/O error
    pub async fn run(self, cancellation_token: CancellationToken) -> Result<(), Report<ApiError>> {
        match self.local_addr {
            Some(addr) => info!("Serving metrics on http://{addr}/metrics"),
            None => info!("Serving metrics"),
        }

        let app = routes(self.metrics);
        let server = Server::new_with_acceptor(self.acceptor);

        tokio::select! {
            result = server.run(app) => {
                match result {
                    Ok(()) => {
                        info!("Metrics server stopped normally");
                        Ok(())
                    }
                    Err(e) => {
                        error!("Metrics server failed: {e}");
                        Err(Report::new(ApiError::ServerError {
                            message: format!("Server failed: {e}"),
                        }))
                    }
                }
            }
            _ = cancellation_token.cancelled() => {
                info!("Metrics server shutdown requested");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener as StdTcpListener;

    use poem::http::StatusCode;
    use poem::test::TestClient;

    use super::*;

    fn metrics() -> Arc<IknowMetrics> {
        Arc::new(IknowMetrics::new().expect("should register gauges"))
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let client = TestClient::new(routes(metrics()));

        let resp = client.get("/").send().await;

        resp.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bind_reports_local_address() {
        let server = MetricsServer::bind("127.0.0.1:0", metrics())
            .await
            .expect("should bind ephemeral port");

        let addr = server.local_addr().expect("should expose local address");

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn bind_fails_when_address_in_use() {
        let occupied = StdTcpListener::bind("127.0.0.1:0").expect("bind std listener");
        let addr = occupied.local_addr().expect("local addr").to_string();

        let result = MetricsServer::bind(&addr, metrics()).await;

        let Err(report) = result else {
            panic!("binding an occupied address should fail");
        };
        assert!(matches!(report.current_context(), ApiError::Bind { .. }));
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let server = MetricsServer::bind("127.0.0.1:0", metrics())
            .await
            .expect("should bind ephemeral port");
        let token = CancellationToken::new();

        let handle = tokio::spawn(server.run(token.clone()));
        token.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server should stop promptly")
            .expect("server task should not panic");
        assert!(result.is_ok());
    }
}

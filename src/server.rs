use std::{collections::HashMap, net::SocketAddr};

use axum::{
    extract::Query,
    http::Uri,
    response::IntoResponse,
    routing::any,
    Extension, Json, Router,
};
use tokio::{sync::oneshot, task::JoinHandle};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};

use crate::{config::ServerConfig, error::Error, registry::Registry, router};

/// The HTTP application.
///
/// Every path and method is handed to the device router.
/// The wildcard does not match `/` itself, the fallback catches that.
pub fn app(registry: Registry) -> Router {
    Router::new()
        .route("/*path", any(handle))
        .fallback(any(handle))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // Each request needs to be able to reach the devices
                .layer(Extension(registry)),
        )
}

async fn handle(
    Extension(registry): Extension<Registry>,
    uri: Uri,
    query: Option<Query<HashMap<String, String>>>,
) -> impl IntoResponse {
    let timeout = query.as_ref().and_then(|Query(params)| {
        params
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("timeout"))
            .map(|(_, value)| value.as_str())
    });

    let (status, reply) = router::route(&registry, uri.path(), timeout).await;

    (status, Json(reply))
}

/// A server accepting requests in a background task.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    finished: bool,
}

impl RunningServer {
    /// Where the server is listening.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolves if the server stops without being told to.
    pub async fn stopped(&mut self) {
        if self.finished {
            return;
        }

        if let Err(e) = (&mut self.task).await {
            error!(?e, "Server task failed");
        }
        self.finished = true;
    }

    /// Stop accepting connections, let requests in flight finish, then release the listener.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            // The server may have stopped already, then there is nobody to tell.
            let _ = stop.send(());
        }

        if !self.finished {
            if let Err(e) = self.task.await {
                error!(?e, "Server task failed");
            }
        }

        info!(addr = %self.local_addr, "Server stopped");
    }
}

/// Bind to the configured address and start serving in the background.
///
/// Failing to bind is an error, everything after that is handled per request.
pub async fn spawn(config: &ServerConfig, registry: Registry) -> Result<RunningServer, Error> {
    let addr = config.socket_addr()?;

    let server = axum::Server::try_bind(&addr)
        .map_err(|e| Error::Bind {
            address: addr.to_string(),
            problem: e.to_string(),
        })?
        .serve(app(registry).into_make_service());
    let local_addr = server.local_addr();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = server.with_graceful_shutdown(async {
        // A dropped sender stops the server too.
        let _ = stop_rx.await;
    });

    let task = tokio::spawn(
        async move {
            if let Err(e) = server.await {
                error!(%e, "Server error");
            }
        }
        .instrument(info_span!("http", addr = %local_addr)),
    );

    info!("listening on {}", local_addr);

    Ok(RunningServer {
        local_addr,
        stop: Some(stop_tx),
        task,
        finished: false,
    })
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn root_and_nested_paths_reach_the_router() {
        for uri in ["/", "/switch", "/switch/0/on"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();

            let response = app(Registry::new()).oneshot(request).await.unwrap();

            // Nothing is registered, but each request got past the app to the router.
            assert!(response.status().is_client_error(), "{uri}");
        }
    }
}

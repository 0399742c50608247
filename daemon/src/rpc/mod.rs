pub mod draws;

use std::sync::Arc;

use actix_web::{
    dev::ServerHandle,
    get,
    middleware::DefaultHeaders,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder,
};
use anyhow::Context;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::core::{storage::Storage, DrawService};

pub type SharedRpcServer = Arc<RpcServer>;

/// The HTTP front of the draw service. Owns the actix server handle so the
/// daemon can stop it gracefully on shutdown.
pub struct RpcServer {
    handle: Mutex<Option<ServerHandle>>,
}

impl RpcServer {
    pub async fn start<S: Storage>(
        service: Arc<DrawService<S>>,
        bind_address: &str,
        frontend_origin: &str,
    ) -> Result<SharedRpcServer, anyhow::Error> {
        if bind_address.starts_with("0.0.0.0") {
            warn!(
                "HTTP API binding to 0.0.0.0 exposes draw execution to ALL network interfaces. \
                 Keep it behind the auth proxy and a firewall."
            );
        }

        let server = Arc::new(Self {
            handle: Mutex::new(None),
        });

        let origin = frontend_origin.to_string();
        let builder = HttpServer::new(move || {
            App::new()
                .app_data(Data::from(Arc::clone(&service)))
                .wrap(
                    DefaultHeaders::new()
                        .add(("Access-Control-Allow-Origin", origin.clone()))
                        .add(("Access-Control-Allow-Headers", "Authorization,Content-Type,X-Admin-Id")),
                )
                .route("/draws/execute", web::post().to(draws::execute_draw::<S>))
                .route("/draws/rerun/{id}", web::post().to(draws::rerun_draw::<S>))
                .route("/draws", web::get().to(draws::list_draws::<S>))
                .route("/draws/{id}/winners", web::get().to(draws::list_winners::<S>))
                .route(
                    "/prize-structures",
                    web::get().to(draws::list_prize_structures::<S>),
                )
                .route(
                    "/prize-structures/{id}",
                    web::get().to(draws::get_prize_structure::<S>),
                )
                .service(index)
        })
        .disable_signals()
        .bind(bind_address)
        .with_context(|| format!("failed to bind HTTP API on {}", bind_address))?;

        let http_server = builder.run();
        {
            // save the server handle to be able to stop it later
            let handle = http_server.handle();
            let mut lock = server.handle.lock().await;
            *lock = Some(handle);
        }
        tokio::spawn(http_server);

        Ok(server)
    }

    pub async fn stop(&self) {
        info!("Stopping HTTP API...");
        let mut handle = self.handle.lock().await;
        if let Some(handle) = handle.take() {
            handle.stop(false).await;
            info!("HTTP API is now stopped!");
        } else {
            warn!("HTTP API is not running!");
        }
    }
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(format!(
        "promodraw daemon\nRunning version: {}",
        promodraw_common::VERSION
    ))
}

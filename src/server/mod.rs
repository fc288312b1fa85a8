pub mod handlers;

use crate::{
    config::ServerConfig,
    logger,
    provider::{ImageProvider, OpenAiImageClient},
};
use actix_web::{dev::Server, middleware, web, App, HttpServer};
use std::io;
use std::net::TcpListener;
use std::sync::Arc;

/// Per-process state shared by handlers. Holds nothing that varies between requests.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ImageProvider>,
    pub port: u16,
}

impl AppState {
    pub fn new(provider: Arc<dyn ImageProvider>, port: u16) -> Self {
        Self { provider, port }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(handlers::json_error_handler))
        .service(handlers::generate_image)
        .service(handlers::status);
}

/// Binds `port`, probing upward on `AddrInUse` for at most `attempts` ports.
pub fn bind_with_fallback(host: &str, port: u16, attempts: u16) -> io::Result<TcpListener> {
    let attempts = attempts.max(1);
    let mut last_err = None;

    for offset in 0..attempts {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)) {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                log::warn!(
                    "⚠️  Port {} is in use. Trying to find an available port...",
                    candidate
                );
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrInUse, "no port available to bind")
    }))
}

/// Builds the HTTP server on an already bound listener and returns it with its port.
pub fn build_server(
    listener: TcpListener,
    provider: Arc<dyn ImageProvider>,
) -> io::Result<(Server, u16)> {
    let port = listener.local_addr()?.port();
    let state = AppState::new(provider, port);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::new("%a \"%r\" %s %Dms"))
            .configure(configure)
    })
    .listen(listener)?
    .run();

    Ok((server, port))
}

pub async fn run(config: ServerConfig) -> io::Result<()> {
    logger::log_config_info(&config);

    let provider: Arc<dyn ImageProvider> =
        Arc::new(OpenAiImageClient::new(config.provider.clone()));
    let listener = bind_with_fallback(&config.host, config.port, config.port_probe_limit)?;
    let (server, port) = build_server(listener, provider)?;

    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port,
        port,
    );

    server.await
}

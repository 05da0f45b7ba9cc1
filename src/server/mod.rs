pub mod handlers;

use crate::config::Config;
use actix_web::{http::Method, middleware, web, App, HttpServer};

pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("Access-Control-Allow-Credentials", "true"))
        .add(("Access-Control-Allow-Origin", "*"))
        .add((
            "Access-Control-Allow-Methods",
            "GET,OPTIONS,PATCH,DELETE,POST,PUT",
        ))
        .add((
            "Access-Control-Allow-Headers",
            "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version",
        ))
}

/// Routes shared by the binary and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/generate")
            .route(web::post().to(handlers::generate))
            .route(web::method(Method::OPTIONS).to(handlers::preflight))
            .default_service(web::to(handlers::method_not_allowed)),
    )
    .service(
        web::resource("/api/health")
            .route(web::get().to(handlers::health))
            .route(web::method(Method::OPTIONS).to(handlers::preflight)),
    );
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let bind = config.bind_address();
    let state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_headers())
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}

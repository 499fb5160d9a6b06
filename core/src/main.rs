mod cors;

use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use std::sync::Arc;

use api_tutor::services::provider::TutorClient;
use common::{
    clock::{Clock, SystemClock},
    env_config::Config,
};
use gate::{history::ConversationStore, rate_limit::SlidingWindowLimiter};

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.environment == "production";
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup().expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .expect("Failed to set up database");

    // gate state is shared across workers: one clock, one sliding-window
    // limiter, one conversation store, one provider client
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = web::Data::new(SlidingWindowLimiter::new(
        clock.clone(),
        config.gate.requests_per_minute,
    ));
    let history = web::Data::new(ConversationStore::new(config.gate.history_max_turns));
    let tutor = web::Data::new(TutorClient::new(&config.tutor));

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(clock.clone()))
            .app_data(limiter.clone())
            .app_data(history.clone())
            .app_data(tutor.clone())
            .wrap(gate::global_middleware(
                config_data.global_requests_per_second,
            ))
            .wrap(logger::middleware())
            .wrap(cors::middleware(&origin))
            .service(
                web::scope("/api")
                    .service(health)
                    .service(
                        web::scope("")
                            .wrap(auth::auth_middleware())
                            .service(api_subs::mount::mount_subs())
                            .service(api_subs::mount::mount_promo())
                            .service(api_tutor::mount::mount_tutor()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}

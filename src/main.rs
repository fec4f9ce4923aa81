use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use log::info;
use pv_forecast::errors::UnrecoverableError;
use pv_forecast::handlers::{AppState, json_error_handler, post_forecast};
use pv_forecast::initialization::config;
use pv_forecast::logging::setup_logging;

#[actix_web::main]
async fn main() -> Result<(), UnrecoverableError> {
    let config = config()?;
    setup_logging(&config.logging.level)?;

    let allowed_origins = config.cors.allowed_origins.clone();
    let web_data = web::Data::new(AppState { config: config.clone() });

    info!("starting web server");
    HttpServer::new(move || {
        let cors = if allowed_origins.is_empty() {
            Cors::permissive()
        } else {
            allowed_origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
                .allow_any_method()
                .allow_any_header()
        };

        App::new()
            .app_data(web_data.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(cors)
            .service(post_forecast)
    })
        .bind((config.web_server.bind_address.as_str(), config.web_server.bind_port))?
        .run()
        .await?;

    Ok(())
}

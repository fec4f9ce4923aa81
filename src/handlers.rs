use actix_web::{HttpRequest, HttpResponse, Responder, error, post, web};
use log::warn;
use serde::Serialize;

use crate::initialization::Config;
use crate::models::ForecastRequest;
use crate::reconciler::reconcile;

pub struct AppState {
    pub config: Config,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Forecast endpoint. The request boundary is the only place errors are
/// translated into transport status codes.
#[post("/forecast/")]
pub async fn post_forecast(
    data: web::Data<AppState>,
    request: web::Json<ForecastRequest>,
) -> impl Responder {
    match reconcile(&data.config, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            warn!("forecast request failed: {}", e);

            HttpResponse::BadRequest().json(ErrorBody { detail: format!("Invalid request: {}", e) })
        }
    }
}

/// Maps json body extraction failures onto the same error body shape as
/// failed forecasts
///
/// # Arguments
///
/// * 'err' - the payload error raised by the json extractor
/// * '_req' - the request that failed extraction
pub fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    let body = ErrorBody { detail: format!("Invalid request: {}", err) };

    error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

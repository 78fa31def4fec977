use std::convert::Infallible;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::SchedulingError;
use crate::models::appointment::TimeSlot;
use crate::models::calendar::CalendarSettings;
use crate::service::booking::{BookingCoordinator, BookingRequest};

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub calendar_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub calendar_id: String,
    pub timezone: String,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub calendar_id: String,
    #[serde(flatten)]
    pub settings: CalendarSettings,
}

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

pub fn status_for(err: &SchedulingError) -> StatusCode {
    match err {
        SchedulingError::InvalidConfig(_) | SchedulingError::InvalidTimeFormat(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SchedulingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SchedulingError::NotFound(_) => StatusCode::NOT_FOUND,
        SchedulingError::SlotNoLongerAvailable => StatusCode::CONFLICT,
        SchedulingError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_reply(code: &'static str, message: String, status: StatusCode) -> Response {
    let body = ErrorBody {
        error: ErrorMessage { code, message },
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

pub fn scheduling_error_reply(err: &SchedulingError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }
    error_reply(err.code(), err.to_string(), status)
}

pub async fn get_availability(
    query: AvailabilityQuery,
    coordinator: Arc<BookingCoordinator>,
) -> Result<Response, Infallible> {
    let result = coordinator
        .available_slots(&query.calendar_id, query.start, query.end, Utc::now())
        .await;
    Ok(match result {
        Ok(availability) => warp::reply::json(&AvailabilityResponse {
            calendar_id: availability.config.calendar_id.clone(),
            timezone: availability.config.timezone.name().to_string(),
            slots: availability.slots,
        })
        .into_response(),
        Err(err) => scheduling_error_reply(&err),
    })
}

pub async fn post_booking(
    request: BookingRequest,
    coordinator: Arc<BookingCoordinator>,
) -> Result<Response, Infallible> {
    Ok(match coordinator.book_slot(&request, Utc::now()).await {
        Ok(appointment) => {
            warp::reply::with_status(warp::reply::json(&appointment), StatusCode::CREATED).into_response()
        }
        Err(err) => scheduling_error_reply(&err),
    })
}

pub async fn post_cancel(
    appointment_id: String,
    coordinator: Arc<BookingCoordinator>,
) -> Result<Response, Infallible> {
    Ok(match coordinator.cancel_appointment(&appointment_id).await {
        Ok(appointment) => warp::reply::json(&appointment).into_response(),
        Err(err) => scheduling_error_reply(&err),
    })
}

pub async fn get_appointment(
    appointment_id: String,
    coordinator: Arc<BookingCoordinator>,
) -> Result<Response, Infallible> {
    Ok(match coordinator.get_appointment(&appointment_id).await {
        Ok(appointment) => warp::reply::json(&appointment).into_response(),
        Err(err) => scheduling_error_reply(&err),
    })
}

pub async fn get_settings(
    calendar_id: String,
    coordinator: Arc<BookingCoordinator>,
) -> Result<Response, Infallible> {
    Ok(match coordinator.calendar_settings(&calendar_id).await {
        Ok(config) => warp::reply::json(&SettingsResponse {
            calendar_id: config.calendar_id.clone(),
            settings: config.to_settings(),
        })
        .into_response(),
        Err(err) => scheduling_error_reply(&err),
    })
}

/// Turns warp's own rejections (bad query, bad JSON, unknown path) into the
/// same error body the handlers use.
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let reply = if rejection.is_not_found() {
        error_reply("not_found", "No such route".to_string(), StatusCode::NOT_FOUND)
    } else if let Some(err) = rejection.find::<warp::reject::InvalidQuery>() {
        error_reply("invalid_request", err.to_string(), StatusCode::BAD_REQUEST)
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply("invalid_request", err.to_string(), StatusCode::BAD_REQUEST)
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply("invalid_request", "Request body too large".to_string(), StatusCode::PAYLOAD_TOO_LARGE)
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply("method_not_allowed", "Method not allowed".to_string(), StatusCode::METHOD_NOT_ALLOWED)
    } else {
        error!(?rejection, "unhandled rejection");
        error_reply("internal", "Internal server error".to_string(), StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(reply)
}

pub fn routes(
    coordinator: Arc<BookingCoordinator>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_coordinator = warp::any().map(move || coordinator.clone());

    let availability = warp::path("availability")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<AvailabilityQuery>())
        .and(with_coordinator.clone())
        .and_then(get_availability);

    let booking = warp::path("booking")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<BookingRequest>())
        .and(with_coordinator.clone())
        .and_then(post_booking);

    let cancel = warp::path!("appointments" / String / "cancel")
        .and(warp::post())
        .and(with_coordinator.clone())
        .and_then(post_cancel);

    let appointment = warp::path!("appointments" / String)
        .and(warp::get())
        .and(with_coordinator.clone())
        .and_then(get_appointment);

    let settings = warp::path!("calendars" / String / "settings")
        .and(warp::get())
        .and(with_coordinator)
        .and_then(get_settings);

    availability
        .or(booking)
        .unify()
        .or(cancel)
        .unify()
        .or(appointment)
        .unify()
        .or(settings)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log::custom(|info| {
            info!(
                method = %info.method(),
                path = info.path(),
                status = info.status().as_u16(),
                elapsed_ms = info.elapsed().as_millis() as u64,
                "http request"
            );
        }))
}

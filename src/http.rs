//! HTTP control surface.
//!
//! JSON over axum, field names in camelCase. Unknown point ids answer 404
//! with `{"error": "Analog input not found"}` (or the binary equivalent);
//! malformed request bodies answer with the same shape.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::control::{ControlApi, DeviceSnapshot, LogEntry, PointsSnapshot};
use crate::object::{
    AnalogInput, AnalogInputPatch, BinaryInput, BinaryInputPatch, Device, DevicePatch,
    NewAnalogInput, NewBinaryInput, StoreError,
};
use crate::simulation::{SimulationPatch, SimulationSettings};

pub const DEFAULT_HTTP_PORT: u16 = 3001;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Request body whose rejection is reported as an [`ApiError`]
type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Error response carrying `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::DuplicateId { .. } => StatusCode::CONFLICT,
            StoreError::InstancesExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::UnknownInstance(_) | StoreError::OutOfService(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnlineState {
    is_online: bool,
}

#[derive(Debug, Serialize)]
struct Deleted {
    success: bool,
}

/// Routes of the control API
pub fn router(control: Arc<ControlApi>) -> Router {
    Router::new()
        .route("/api/device", get(get_device).post(update_device))
        .route("/api/device/online", post(set_online))
        .route("/api/points", get(list_points))
        .route("/api/points/analog", post(add_analog_input))
        .route("/api/points/binary", post(add_binary_input))
        .route(
            "/api/points/analog/:id",
            put(update_analog_input).delete(delete_analog_input),
        )
        .route(
            "/api/points/binary/:id",
            put(update_binary_input).delete(delete_binary_input),
        )
        .route("/api/simulation", get(get_simulation).post(update_simulation))
        .route("/api/logs", get(get_logs).delete(clear_logs))
        .layer(CorsLayer::permissive())
        .with_state(control)
}

/// Bind `port`, moving up one port at a time while the address is taken
///
/// At most `attempts` ports are tried. Errors other than address-in-use end
/// the scan immediately.
pub async fn bind_listener(host: IpAddr, port: u16, attempts: u16) -> io::Result<TcpListener> {
    let mut last_error = None;

    for offset in 0..attempts.max(1) {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                debug!("Port {} in use, trying the next one", candidate);
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrInUse, format!("no free port from {}", port))
    }))
}

/// Serve the control API until `shutdown` becomes true
pub async fn serve(
    listener: TcpListener,
    control: Arc<ControlApi>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    info!("Control API listening on http://{}/api", listener.local_addr()?);
    axum::serve(listener, router(control))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}

async fn get_device(State(control): State<Arc<ControlApi>>) -> Json<DeviceSnapshot> {
    Json(control.snapshot())
}

async fn update_device(
    State(control): State<Arc<ControlApi>>,
    body: JsonBody<DevicePatch>,
) -> ApiResult<Device> {
    let Json(patch) = body?;
    Ok(Json(control.update_device(patch)))
}

async fn set_online(
    State(control): State<Arc<ControlApi>>,
    body: JsonBody<OnlineState>,
) -> ApiResult<OnlineState> {
    let Json(request) = body?;
    let is_online = control.set_online(request.is_online).await;
    Ok(Json(OnlineState { is_online }))
}

async fn list_points(State(control): State<Arc<ControlApi>>) -> Json<PointsSnapshot> {
    Json(control.points())
}

async fn add_analog_input(
    State(control): State<Arc<ControlApi>>,
    body: JsonBody<NewAnalogInput>,
) -> ApiResult<AnalogInput> {
    let Json(spec) = body?;
    Ok(Json(control.add_analog_input(spec)?))
}

async fn add_binary_input(
    State(control): State<Arc<ControlApi>>,
    body: JsonBody<NewBinaryInput>,
) -> ApiResult<BinaryInput> {
    let Json(spec) = body?;
    Ok(Json(control.add_binary_input(spec)?))
}

async fn update_analog_input(
    State(control): State<Arc<ControlApi>>,
    Path(id): Path<String>,
    body: JsonBody<AnalogInputPatch>,
) -> ApiResult<AnalogInput> {
    let Json(patch) = body?;
    Ok(Json(control.update_analog_input(&id, patch)?))
}

async fn update_binary_input(
    State(control): State<Arc<ControlApi>>,
    Path(id): Path<String>,
    body: JsonBody<BinaryInputPatch>,
) -> ApiResult<BinaryInput> {
    let Json(patch) = body?;
    Ok(Json(control.update_binary_input(&id, patch)?))
}

async fn delete_analog_input(
    State(control): State<Arc<ControlApi>>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    control.delete_analog_input(&id)?;
    Ok(Json(Deleted { success: true }))
}

async fn delete_binary_input(
    State(control): State<Arc<ControlApi>>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    control.delete_binary_input(&id)?;
    Ok(Json(Deleted { success: true }))
}

async fn get_simulation(State(control): State<Arc<ControlApi>>) -> Json<SimulationSettings> {
    Json(control.simulation())
}

async fn update_simulation(
    State(control): State<Arc<ControlApi>>,
    body: JsonBody<SimulationPatch>,
) -> ApiResult<SimulationSettings> {
    let Json(patch) = body?;
    Ok(Json(control.update_simulation(patch)))
}

async fn get_logs(State(control): State<Arc<ControlApi>>) -> Json<Vec<LogEntry>> {
    Json(control.logs())
}

async fn clear_logs(State(control): State<Arc<ControlApi>>) -> StatusCode {
    control.clear_logs();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PointStore;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::Value;
    use std::net::Ipv4Addr;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<ControlApi>) {
        let (simulation, _) = watch::channel(SimulationSettings::default());
        let control = Arc::new(ControlApi::new(Arc::new(PointStore::default()), simulation));
        (router(control.clone()), control)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_get_device_snapshot() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/api/device", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["id"], 1001);
        assert_eq!(body["device"]["isOnline"], true);
        assert_eq!(body["analogInputs"], json!([]));
        assert_eq!(body["simulation"]["interval"], 1000);
    }

    #[tokio::test]
    async fn test_analog_point_crud() {
        let (app, _) = app();
        let (status, created) = call(
            &app,
            Method::POST,
            "/api/points/analog",
            Some(json!({"name": "Temp1", "minValue": 0, "maxValue": 100, "resolution": 0.1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["objectId"], 1);
        assert_eq!(created["units"], "degrees-celsius");
        let id = created["id"].as_str().unwrap().to_string();

        let uri = format!("/api/points/analog/{}", id);
        let (status, updated) =
            call(&app, Method::PUT, &uri, Some(json!({"presentValue": 42.5}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["presentValue"], 42.5);

        let (status, body) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, body) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Analog input not found"}));
    }

    #[tokio::test]
    async fn test_unknown_binary_point_is_404() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/points/binary/missing",
            Some(json!({"presentValue": "active"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Binary input not found"}));
    }

    #[tokio::test]
    async fn test_duplicate_client_id_is_409() {
        let (app, _) = app();
        let spec = json!({"id": "door", "name": "Door"});
        let (status, _) = call(&app, Method::POST, "/api/points/binary", Some(spec.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::POST, "/api/points/binary", Some(spec)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("door"));
    }

    #[tokio::test]
    async fn test_device_patch_and_online() {
        let (app, control) = app();
        let (status, device) = call(
            &app,
            Method::POST,
            "/api/device",
            Some(json!({"name": "AHU-1", "location": "Roof"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(device["name"], "AHU-1");
        assert_eq!(device["modelName"], "Simulator v1.0");

        let (_, body) = call(
            &app,
            Method::POST,
            "/api/device/online",
            Some(json!({"isOnline": false})),
        )
        .await;
        assert_eq!(body, json!({"isOnline": false}));
        assert!(!control.device().is_online);
    }

    #[tokio::test]
    async fn test_simulation_and_logs() {
        let (app, _) = app();
        let (_, settings) = call(
            &app,
            Method::POST,
            "/api/simulation",
            Some(json!({"isRunning": true, "interval": 500})),
        )
        .await;
        assert_eq!(
            settings,
            json!({"isRunning": true, "interval": 500, "autoUpdate": false})
        );

        let (_, logs) = call(&app, Method::GET, "/api/logs", None).await;
        assert_eq!(logs[0]["category"], "simulation");
        assert_eq!(logs[0]["level"], "info");

        let (status, _) = call(&app, Method::DELETE, "/api/logs", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, logs) = call(&app, Method::GET, "/api/logs", None).await;
        assert_eq!(logs, json!([]));
    }

    #[tokio::test]
    async fn test_bad_json_body_uses_error_shape() {
        let (app, control) = app();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/points/analog",
            Some(json!({"presentValue": "hot"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/device/online")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"isOnline\": "))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));

        let (status, body) = call(&app, Method::POST, "/api/simulation", None).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].is_string());

        assert!(control.snapshot().analog_inputs.is_empty());
        assert!(control.device().is_online);
    }

    #[tokio::test]
    async fn test_port_scan_skips_taken_port() {
        let host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let taken = TcpListener::bind((host, 0)).await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = bind_listener(host, port, 5).await.unwrap();
        let bound = listener.local_addr().unwrap().port();
        assert!(bound > port && bound < port.saturating_add(5));

        assert!(bind_listener(host, port, 1).await.is_err());
    }
}

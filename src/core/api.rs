//! HTTP + WebSocket control surface
//!
//! Endpoints:
//! - GET  /health                          - Health check
//! - POST /sensor/new                      - Create sensor engine
//! - GET  /sensor/:id                      - Status
//! - POST /sensor/:id/tick                 - Feed a reading
//! - POST /sensor/:id/calibration/start    - Start baseline calibration
//! - POST /sensor/:id/calibration/stop     - Finalize calibration now
//! - POST /sensor/:id/reset                - Reset to defaults
//! - POST /sensor/:id/params               - Partial parameter update
//! - WS   /ws/:id                          - Live updates
//!
//! Each sensor runs on its own monotonic clock started at creation.

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};

use crate::config::EngineConfig;
use crate::core::PresenceEngine;
use crate::error::ApiError;
use crate::types::{
    CalibrationEvent, ChangeReason, EngineStatus, PresenceState, Tick, TickOutput,
};

/// One sensing volume behind the API
#[derive(Debug)]
pub struct Sensor {
    pub id: String,
    pub engine: PresenceEngine,
    pub started: Instant,
    pub update_tx: broadcast::Sender<SensorUpdate>,
}

impl Sensor {
    fn new(id: String, engine: PresenceEngine) -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { id, engine, started: Instant::now(), update_tx: tx }
    }

    /// Milliseconds since creation
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Finalize an expired calibration before serving a request
    fn poll(&mut self) -> Option<CalibrationEvent> {
        let now = self.now_ms();
        self.engine.poll(now)
    }

    /// Push current state to websocket listeners
    fn broadcast(&self, z: Option<f64>) {
        let update = SensorUpdate {
            sensor_id: self.id.clone(),
            now_ms: self.now_ms(),
            state: self.engine.state(),
            presence: self.engine.presence(),
            z,
            change_reason: self.engine.change_reason(),
            reason: self.engine.reason().to_string(),
            calibrating: self.engine.is_calibrating(),
        };
        // No subscribers is fine
        let _ = self.update_tx.send(update);
    }
}

/// Live update message
#[derive(Debug, Clone, Serialize)]
pub struct SensorUpdate {
    pub sensor_id: String,
    pub now_ms: u64,
    pub state: PresenceState,
    pub presence: bool,
    pub z: Option<f64>,
    pub change_reason: ChangeReason,
    pub reason: String,
    pub calibrating: bool,
}

/// App state
pub struct AppState {
    pub sensors: RwLock<HashMap<String, Sensor>>,
    /// Used when a create request carries no config
    pub defaults: EngineConfig,
    next_id: AtomicU64,
}

/// Create sensor request
#[derive(Debug, Default, Deserialize)]
pub struct NewSensorRequest {
    pub config: Option<EngineConfig>,
}

/// Create sensor response
#[derive(Debug, Serialize)]
pub struct NewSensorResponse {
    pub sensor_id: String,
    pub websocket_url: String,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct SensorStatusResponse {
    pub sensor_id: String,
    pub uptime_ms: u64,
    #[serde(flatten)]
    pub status: EngineStatus,
}

/// Tick request; the clock comes from the sensor
#[derive(Debug, Deserialize)]
pub struct TickRequest {
    pub energy: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
}

/// Calibration start request
#[derive(Debug, Deserialize)]
pub struct CalibrationRequest {
    pub duration_s: u32,
}

/// Calibration command response
#[derive(Debug, Serialize)]
pub struct CalibrationResponse {
    pub event: CalibrationEvent,
    pub status: EngineStatus,
}

/// Partial parameter update; absent fields stay unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsPatch {
    pub k_on: Option<f64>,
    pub k_off: Option<f64>,
    pub on_debounce_ms: Option<u64>,
    pub off_debounce_ms: Option<u64>,
    pub abs_clear_delay_ms: Option<u64>,
    pub distance_min_cm: Option<f64>,
    pub distance_max_cm: Option<f64>,
}

impl ParamsPatch {
    /// Apply through the engine setters
    pub fn apply(&self, engine: &mut PresenceEngine) {
        if let Some(k) = self.k_on {
            engine.set_k_on(k);
        }
        if let Some(k) = self.k_off {
            engine.set_k_off(k);
        }
        if let Some(ms) = self.on_debounce_ms {
            engine.set_on_debounce_ms(ms);
        }
        if let Some(ms) = self.off_debounce_ms {
            engine.set_off_debounce_ms(ms);
        }
        if let Some(ms) = self.abs_clear_delay_ms {
            engine.set_abs_clear_delay_ms(ms);
        }
        if let Some(d) = self.distance_min_cm {
            engine.set_distance_min(d);
        }
        if let Some(d) = self.distance_max_cm {
            engine.set_distance_max(d);
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sensors_active: usize,
}

/// Create the API router
pub fn create_router(defaults: EngineConfig) -> Router {
    let state = Arc::new(AppState {
        sensors: RwLock::new(HashMap::new()),
        defaults,
        next_id: AtomicU64::new(1),
    });

    Router::new()
        .route("/health", get(health))
        .route("/sensor/new", post(create_sensor))
        .route("/sensor/:id", get(get_sensor))
        .route("/sensor/:id/tick", post(tick))
        .route("/sensor/:id/calibration/start", post(start_calibration))
        .route("/sensor/:id/calibration/stop", post(stop_calibration))
        .route("/sensor/:id/reset", post(reset))
        .route("/sensor/:id/params", post(update_params))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sensors = state.sensors.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sensors_active: sensors.len(),
    })
}

/// Create new sensor engine
async fn create_sensor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSensorRequest>,
) -> Result<Json<NewSensorResponse>, ApiError> {
    let config = match req.config {
        Some(config) => {
            config.validate()?;
            config
        }
        None => state.defaults.clone(),
    };

    let n = state.next_id.fetch_add(1, Ordering::Relaxed);
    let sensor_id = format!("sensor_{}", n);
    let sensor = Sensor::new(sensor_id.clone(), config.build_engine());

    state.sensors.write().await.insert(sensor_id.clone(), sensor);
    tracing::info!(%sensor_id, "sensor created");

    Ok(Json(NewSensorResponse {
        websocket_url: format!("/ws/{}", sensor_id),
        sensor_id,
    }))
}

/// Get sensor status
async fn get_sensor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SensorStatusResponse>, ApiError> {
    let mut sensors = state.sensors.write().await;
    let sensor = sensors.get_mut(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;

    if sensor.poll().is_some() {
        sensor.broadcast(None);
    }

    Ok(Json(SensorStatusResponse {
        sensor_id: id,
        uptime_ms: sensor.now_ms(),
        status: sensor.engine.status(),
    }))
}

/// Feed one reading
async fn tick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TickRequest>,
) -> Result<Json<TickOutput>, ApiError> {
    let mut sensors = state.sensors.write().await;
    let sensor = sensors.get_mut(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;

    let polled = sensor.poll();
    let now_ms = sensor.now_ms();
    let mut output = sensor.engine.tick(Tick {
        energy: req.energy,
        distance: req.distance,
        now_ms,
    });
    if output.calibration.is_none() {
        output.calibration = polled;
    }

    sensor.broadcast(output.z);
    Ok(Json(output))
}

/// Start baseline calibration
async fn start_calibration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CalibrationRequest>,
) -> Result<Json<CalibrationResponse>, ApiError> {
    let mut sensors = state.sensors.write().await;
    let sensor = sensors.get_mut(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;

    sensor.poll();
    let now_ms = sensor.now_ms();
    let event = sensor.engine.start_calibration(req.duration_s, now_ms);
    sensor.broadcast(None);

    Ok(Json(CalibrationResponse { event, status: sensor.engine.status() }))
}

/// Finalize calibration now
async fn stop_calibration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CalibrationResponse>, ApiError> {
    let mut sensors = state.sensors.write().await;
    let sensor = sensors.get_mut(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;

    // An already-expired session reports its deadline finalization
    let event = match sensor.poll() {
        Some(event) => event,
        None => sensor.engine.stop_calibration(),
    };
    sensor.broadcast(None);

    Ok(Json(CalibrationResponse { event, status: sensor.engine.status() }))
}

/// Reset to defaults
async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EngineStatus>, ApiError> {
    let mut sensors = state.sensors.write().await;
    let sensor = sensors.get_mut(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;

    sensor.engine.reset_to_defaults();
    sensor.broadcast(None);
    Ok(Json(sensor.engine.status()))
}

/// Partial parameter update
async fn update_params(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ParamsPatch>,
) -> Result<Json<EngineStatus>, ApiError> {
    let mut sensors = state.sensors.write().await;
    let sensor = sensors.get_mut(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;

    sensor.poll();
    patch.apply(&mut sensor.engine);
    sensor.broadcast(None);
    Ok(Json(sensor.engine.status()))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let sensors = state.sensors.read().await;
    let sensor = sensors.get(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;
    let rx = sensor.update_tx.subscribe();
    drop(sensors);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Forward updates until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<SensorUpdate>) {
    let (mut sink, mut stream) = socket.split();

    let mut forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => {
                    let json = serde_json::to_string(&update).unwrap_or_default();
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket client lagging, updates dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => inbound.abort(),
        _ = &mut inbound => forward.abort(),
    }
}

/// Run the API server
pub async fn run_server(addr: &str, defaults: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(defaults);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "bedsense API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

//! HTTP/JSON API consumed by kiosks.
//!
//! | Endpoint            | Method | Purpose                                 |
//! |---------------------|--------|-----------------------------------------|
//! | `/api/users`        | GET    | list users (token lookup)               |
//! | `/api/users`        | POST   | create a user                           |
//! | `/api/items`        | GET    | list sellable items                     |
//! | `/api/items`        | POST   | add an item `{name, price}`             |
//! | `/api/sales`        | GET    | list recorded sales                     |
//! | `/api/sales`        | POST   | record a sale                           |
//! | `/api/kiosks`       | GET    | list kiosk records (password checks)    |
//! | `/api/kiosks`       | POST   | register a kiosk with default passwords |
//! | `/api/kiosk/{id}`   | PUT    | partial kiosk update                    |
//! | `/api/discover`     | GET    | server IP and port as JSON              |
//!
//! Mutating endpoints answer `{"message": "..."}`.  Failures answer
//! `{"error": "..."}` with a 400, 404, or 500 status.

use std::future::Future;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use pos_core::{
    credential::hash_password_with, ApiErrorBody, ApiMessage, Item, KioskRecord, KioskUpdate,
    NewItem, NewKiosk, NewSale, NewUser, Sale, ServerInfo, User,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::application::store::{KioskPasswordHashes, PosStore, StoreError};

/// Default per-role passwords assigned to a newly registered kiosk.
pub const DEFAULT_KIOSK_PASSWORD: &str = "kiosk";
pub const DEFAULT_TEACHER_PASSWORD: &str = "teacher";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

// ── Errors ────────────────────────────────────────────────────────────────────

/// Error type returned by every handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateRfid(_) => AppError::BadRequest(e.to_string()),
            StoreError::KioskNotFound(_) => AppError::NotFound(e.to_string()),
            StoreError::Io { .. } | StoreError::Snapshot(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Malformed payload: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(detail) => {
                error!("internal error: {detail}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ApiErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

/// State shared by all handlers.
pub struct ServerState {
    store: Mutex<PosStore>,
    data_file: Option<PathBuf>,
    hash_iterations: u32,
    advertised_port: u16,
    advertised_ip: Option<IpAddr>,
}

/// Cheaply cloneable handle passed to the router.
pub type SharedState = Arc<ServerState>;

impl ServerState {
    /// Creates state around `store`.
    ///
    /// When `data_file` is set, every mutation is written there before it
    /// becomes visible.
    pub fn new(
        store: PosStore,
        data_file: Option<PathBuf>,
        hash_iterations: u32,
        advertised_port: u16,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            data_file,
            hash_iterations,
            advertised_port,
            advertised_ip: None,
        }
    }

    /// Overrides the IP reported by `GET /api/discover` (normally probed).
    pub fn with_advertised_ip(mut self, ip: IpAddr) -> Self {
        self.advertised_ip = Some(ip);
        self
    }

    /// Wraps the state for the router.
    pub fn into_shared(self) -> SharedState {
        Arc::new(self)
    }

    /// Applies `change` under the store lock.
    ///
    /// With a data file configured the change runs on a copy, which replaces
    /// the live store only once the snapshot is on disk.  A failed write
    /// leaves no trace of the change.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut PosStore) -> Result<T, StoreError>,
    ) -> Result<T, AppError> {
        let mut store = self.store.lock().await;
        let Some(path) = &self.data_file else {
            return Ok(change(&mut *store)?);
        };
        let mut next = store.clone();
        let out = change(&mut next)?;
        next.save(path)?;
        *store = next;
        Ok(out)
    }

    /// Hashes on the blocking pool; PBKDF2 is CPU-bound.
    async fn hash(&self, password: String) -> Result<String, AppError> {
        let iterations = self.hash_iterations;
        tokio::task::spawn_blocking(move || hash_password_with(&password, iterations))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))
    }

    async fn hash_opt(&self, password: Option<String>) -> Result<Option<String>, AppError> {
        match password {
            Some(p) => Ok(Some(self.hash(p).await?)),
            None => Ok(None),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the API router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/items", get(list_items).post(add_item))
        .route("/api/sales", get(list_sales).post(record_sale))
        .route("/api/kiosks", get(list_kiosks).post(add_kiosk))
        .route("/api/kiosk/:id", put(update_kiosk))
        .route("/api/discover", get(discover))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves the API on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the underlying I/O error if the accept loop fails.
pub async fn serve(
    listener: TcpListener,
    state: SharedState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP API listening on http://{addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn list_users(State(state): State<SharedState>) -> Json<Vec<User>> {
    Json(state.store.lock().await.list_users())
}

async fn create_user(
    State(state): State<SharedState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<ApiMessage>, AppError> {
    let Json(new_user) = payload?;
    let password_hash = state.hash(new_user.password).await?;

    let user = state
        .commit(|store| {
            store.create_user(new_user.username, password_hash, new_user.privilege, new_user.rfid)
        })
        .await?;
    info!("created user {} ({})", user.id, user.privilege);
    Ok(Json(ApiMessage::new("User created")))
}

async fn list_items(State(state): State<SharedState>) -> Json<Vec<Item>> {
    Json(state.store.lock().await.list_items())
}

async fn add_item(
    State(state): State<SharedState>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<Json<ApiMessage>, AppError> {
    let Json(item) = payload?;
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(AppError::BadRequest("Price must be a non-negative number".into()));
    }

    let item = state.commit(|store| Ok(store.add_item(item))).await?;
    info!("added item {} ({:.2})", item.name, item.price);
    Ok(Json(ApiMessage::new("Item added")))
}

async fn list_sales(State(state): State<SharedState>) -> Json<Vec<Sale>> {
    Json(state.store.lock().await.list_sales())
}

async fn record_sale(
    State(state): State<SharedState>,
    payload: Result<Json<NewSale>, JsonRejection>,
) -> Result<Json<ApiMessage>, AppError> {
    let Json(sale) = payload?;

    let sale = state.commit(|store| Ok(store.record_sale(sale))).await?;
    info!(
        "recorded sale {}: user {} item {} total {:.2}",
        sale.id, sale.user_id, sale.item_id, sale.total_price
    );
    Ok(Json(ApiMessage::new("Sale recorded")))
}

async fn list_kiosks(State(state): State<SharedState>) -> Json<Vec<KioskRecord>> {
    Json(state.store.lock().await.list_kiosks())
}

async fn add_kiosk(
    State(state): State<SharedState>,
    payload: Result<Json<NewKiosk>, JsonRejection>,
) -> Result<Json<ApiMessage>, AppError> {
    let Json(kiosk) = payload?;
    let passwords = KioskPasswordHashes {
        kiosk: state.hash(DEFAULT_KIOSK_PASSWORD.to_string()).await?,
        teacher: state.hash(DEFAULT_TEACHER_PASSWORD.to_string()).await?,
        admin: state.hash(DEFAULT_ADMIN_PASSWORD.to_string()).await?,
    };

    let kiosk = state
        .commit(|store| Ok(store.add_kiosk(kiosk.name, passwords)))
        .await?;
    info!("registered kiosk {} ({})", kiosk.id, kiosk.name);
    Ok(Json(ApiMessage::new("Kiosk added")))
}

async fn update_kiosk(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
    payload: Result<Json<KioskUpdate>, JsonRejection>,
) -> Result<Json<ApiMessage>, AppError> {
    let Json(update) = payload?;
    let update = KioskUpdate {
        status: update.status,
        password_kiosk: state.hash_opt(update.password_kiosk).await?,
        password_teacher: state.hash_opt(update.password_teacher).await?,
        password_admin: state.hash_opt(update.password_admin).await?,
        ip_address: update.ip_address,
    };

    state.commit(|store| store.update_kiosk(id, update)).await?;
    info!("updated kiosk {id}");
    Ok(Json(ApiMessage::new("Kiosk updated")))
}

async fn discover(State(state): State<SharedState>) -> Json<ServerInfo> {
    let ip = state
        .advertised_ip
        .unwrap_or_else(crate::infrastructure::network::local_ip);
    Json(ServerInfo {
        server_ip: ip.to_string(),
        port: state.advertised_port,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_statuses() {
        let bad = AppError::from(StoreError::DuplicateRfid("X".into())).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = AppError::from(StoreError::KioskNotFound(9)).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        // Arrange
        let err = AppError::Internal("disk on fire".into());

        // Act / Assert
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_hash_opt_passes_none_through() {
        let state = ServerState::new(PosStore::new(), None, 1, 5000);
        assert_eq!(state.hash_opt(None).await.unwrap(), None);
        let hashed = state.hash_opt(Some("pw".into())).await.unwrap().unwrap();
        assert!(pos_core::verify_password(&hashed, "pw"));
    }

    #[test]
    fn test_with_advertised_ip_overrides_local_lookup() {
        let state = ServerState::new(PosStore::new(), None, 1, 5000)
            .with_advertised_ip("10.1.2.3".parse().unwrap())
            .into_shared();
        assert_eq!(state.advertised_ip, Some("10.1.2.3".parse().unwrap()));
    }
}

//! HTTP API server for the LegitCred node.
//!
//! Read endpoints are served straight from the credential index. Sync and
//! mint go through the node event loop as [`NodeCommand`]s.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use legitcred_core::{CredentialRecord, MintRequest, Principal, Role, SyncSession, TokenId};

use crate::commands::{CommandError, MintResponse, NodeCommand, SyncSummary};
use crate::state::NodeState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// --- Response types ---

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: u64,
    pub contract: String,
    pub chain_id: String,
    pub session: SyncSession,
    pub credential_count: usize,
    pub organization_count: usize,
    pub issuance_enabled: bool,
}

#[derive(Serialize)]
pub struct CredentialsResponse {
    pub credentials: Vec<CredentialRecord>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct OrganizationsResponse {
    pub organizations: BTreeSet<String>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct CredentialsQuery {
    pub owner: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct MintCredentialRequest {
    pub recipient: String,
    pub metadata_cid: String,
    pub artifact_cid: String,
    #[serde(default)]
    pub index: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn credentials(credentials: Vec<CredentialRecord>) -> Json<CredentialsResponse> {
    let count = credentials.len();
    Json(CredentialsResponse { credentials, count })
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

async fn handle_status(State(state): State<Arc<NodeState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        contract: state.contract.clone(),
        chain_id: state.chain_id.clone(),
        session: state.index.session(),
        credential_count: state.index.len(),
        organization_count: state.index.list_organizations().len(),
        issuance_enabled: state.issuance_enabled,
    })
}

/// Listing scoped to the viewer. Without a role the viewer is a holder
/// identified by `owner`.
async fn handle_list_credentials(
    State(state): State<Arc<NodeState>>,
    Query(query): Query<CredentialsQuery>,
) -> Result<Json<CredentialsResponse>, ApiError> {
    let role = match query.role.as_deref() {
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => Role::Holder,
    };
    let principal = match role {
        Role::Admin => Principal::admin(),
        Role::Holder => Principal::holder(query.owner.as_deref()),
    };
    Ok(credentials(state.index.list_visible(&principal)))
}

async fn handle_get_credential(
    State(state): State<Arc<NodeState>>,
    Path(token_id): Path<String>,
) -> Result<Json<CredentialRecord>, ApiError> {
    let token_id: TokenId = token_id
        .parse()
        .map_err(|e: legitcred_core::CoreError| error(StatusCode::BAD_REQUEST, e.to_string()))?;
    state
        .index
        .get(token_id)
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("credential {} not found", token_id)))
}

async fn handle_organizations(State(state): State<Arc<NodeState>>) -> Json<OrganizationsResponse> {
    let organizations = state.index.list_organizations();
    let count = organizations.len();
    Json(OrganizationsResponse {
        organizations,
        count,
    })
}

async fn handle_organization_credentials(
    State(state): State<Arc<NodeState>>,
    Path(organization): Path<String>,
) -> Json<CredentialsResponse> {
    credentials(state.index.list_by_organization(&organization))
}

async fn handle_sync(
    State(state): State<Arc<NodeState>>,
) -> Result<Json<SyncSummary>, ApiError> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    let cmd = NodeCommand::Sync { reply: reply_tx };
    send_command_and_await(&state, cmd, reply_rx).await
}

async fn handle_mint(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<MintCredentialRequest>,
) -> Result<Json<MintResponse>, ApiError> {
    if !state.issuance_enabled {
        return Err(error(
            StatusCode::SERVICE_UNAVAILABLE,
            "issuance is disabled: no signer configured",
        ));
    }
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    let cmd = NodeCommand::Mint {
        request: MintRequest::new(req.recipient, req.metadata_cid, req.artifact_cid),
        index: req.index,
        reply: reply_tx,
    };
    send_command_and_await(&state, cmd, reply_rx).await
}

fn status_for(err: &CommandError) -> StatusCode {
    match err {
        CommandError::Invalid(_) => StatusCode::BAD_REQUEST,
        CommandError::Conflict(_) => StatusCode::CONFLICT,
        CommandError::Upstream(_) => StatusCode::BAD_GATEWAY,
        CommandError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Helper to send a command and await the reply.
async fn send_command_and_await<T: Serialize>(
    state: &Arc<NodeState>,
    cmd: NodeCommand,
    reply_rx: tokio::sync::oneshot::Receiver<Result<T, CommandError>>,
) -> Result<Json<T>, ApiError> {
    state.command_tx.send(cmd).await.map_err(|_| {
        error(
            StatusCode::SERVICE_UNAVAILABLE,
            "node event loop not running",
        )
    })?;

    match reply_rx.await {
        Ok(Ok(resp)) => Ok(Json(resp)),
        Ok(Err(e)) => Err(error(status_for(&e), e.to_string())),
        Err(_) => Err(error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "event loop dropped the reply channel",
        )),
    }
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/credentials", get(handle_list_credentials))
        .route("/api/v1/credentials/mint", post(handle_mint))
        .route("/api/v1/credentials/{token_id}", get(handle_get_credential))
        .route("/api/v1/organizations", get(handle_organizations))
        .route(
            "/api/v1/organizations/{org}/credentials",
            get(handle_organization_credentials),
        )
        .route("/api/v1/sync", post(handle_sync))
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<NodeState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
    typed_header::TypedHeaderRejection,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{AbuseGuard, accounts, receipts_scan, recurring, transactions, user};
use engine::Engine;
use receipts::Extractor;

/// Default ceiling for receipt uploads.
pub const DEFAULT_UPLOAD_LIMIT: usize = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub guard: Arc<AbuseGuard>,
    /// `None` when no model service is configured.
    pub extractor: Option<Arc<Extractor>>,
    pub upload_limit: usize,
}

impl ServerState {
    pub fn new(engine: Engine, db: DatabaseConnection) -> Self {
        Self {
            engine: Arc::new(engine),
            db,
            guard: Arc::new(AbuseGuard::new()),
            extractor: None,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
        }
    }

    #[must_use]
    pub fn guard(mut self, guard: AbuseGuard) -> Self {
        self.guard = Arc::new(guard);
        self
    }

    #[must_use]
    pub fn extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    #[must_use]
    pub fn upload_limit(mut self, bytes: usize) -> Self {
        self.upload_limit = bytes;
        self
    }
}

/// Resolves the caller from HTTP Basic credentials.
///
/// Missing or wrong credentials leave the caller anonymous; handlers decide
/// whether that is acceptable.
async fn auth(
    auth_header: Result<TypedHeader<Authorization<Basic>>, TypedHeaderRejection>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut caller = user::Caller::default();

    if let Ok(TypedHeader(header)) = auth_header
        && !header.username().is_empty()
        && !header.password().is_empty()
    {
        match user::Entity::find()
            .filter(user::Column::Username.eq(header.username()))
            .filter(user::Column::Password.eq(header.password()))
            .one(&state.db)
            .await
        {
            Ok(Some(user)) => caller = user::Caller::new(Some(user.username)),
            Ok(None) => tracing::debug!(username = header.username(), "invalid credentials"),
            Err(err) => tracing::error!("failed to resolve caller: {err}"),
        }
    }

    request.extensions_mut().insert(caller);
    next.run(request).await
}

pub fn router(state: ServerState) -> Router {
    let upload_limit = state.upload_limit;
    Router::new()
        .route("/accounts", post(accounts::create).get(accounts::list))
        .route("/accounts/{id}", get(accounts::get))
        .route("/accounts/{id}/default", post(accounts::set_default))
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get).put(transactions::update),
        )
        .route("/transactions/bulk-delete", post(transactions::bulk_delete))
        .route("/recurring/process", post(recurring::process))
        .route("/user", get(user::get))
        .route("/user/sync", post(user::sync))
        .route(
            "/receipts/scan",
            post(receipts_scan::scan).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(state: ServerState, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

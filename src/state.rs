use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    connection::TransactionManager,
    r2d2::{ConnectionManager, Pool, PooledConnection},
};
use diesel_migrations::MigrationHarness;

use crate::{MIGRATIONS, app_config::AppConfig, util_resp::FailureResponse};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

pub fn make_pool(db_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    Pool::builder()
        .max_size(if db_url == ":memory:" { 1 } else { 10 })
        .build(ConnectionManager::<SqliteConnection>::new(db_url))
}

pub fn run_migrations(
    pool: &DbPool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    tracing::info!("applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Shared application state, handed to every handler through the axum
/// [`FromRef`] machinery.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub key: Key,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

#[derive(Clone)]
struct OpenConn {
    conn: Arc<tokio::sync::Mutex<PooledConn>>,
    in_tx: bool,
}

/// Holds the (lazily acquired) connection of a single request, so that the
/// [`commit_transactions`] middleware can finish its transaction once the
/// response is known.
#[derive(Clone, Default)]
pub struct ConnSlot(Arc<tokio::sync::Mutex<Option<OpenConn>>>);

/// This middleware commits opened transactions, after each request has been
/// handled. Requests which fail (anything other than 1xx, 2xx or 3xx) are
/// rolled back instead.
pub async fn commit_transactions(mut req: Request, next: Next) -> Response {
    let slot = ConnSlot::default();
    req.extensions_mut().insert(slot.clone());

    let res = next.run(req).await;

    let open = slot.0.lock().await.take();
    if let Some(open) = open {
        if open.in_tx {
            let mut conn = open.conn.lock().await;
            let status = res.status();
            let outcome = if status.is_success()
                || status.is_redirection()
                || status.is_informational()
            {
                <PooledConn as diesel::Connection>::TransactionManager::commit_transaction(&mut *conn)
            } else {
                <PooledConn as diesel::Connection>::TransactionManager::rollback_transaction(&mut *conn)
            };

            if let Err(e) = outcome {
                tracing::error!("failed to finish request transaction: {e}");
                return FailureResponse::ServerError(None).into_response();
            }
        }
    }

    res
}

pub struct Conn<const TX: bool> {
    inner: tokio::sync::OwnedMutexGuard<PooledConn>,
}

impl<const TX: bool> Deref for Conn<TX> {
    type Target = PooledConn;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<const TX: bool> DerefMut for Conn<TX> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for Conn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let conn = ThreadSafeConn::<TX>::from_request_parts(parts, state).await?;
        Ok(Conn {
            inner: conn.inner.lock_owned().await,
        })
    }
}

/// The connection of the current request. All extractors within one request
/// share the same connection (and therefore the same transaction).
#[derive(Clone)]
pub struct ThreadSafeConn<const TX: bool> {
    pub inner: Arc<tokio::sync::Mutex<PooledConn>>,
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for ThreadSafeConn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Some(slot) = parts.extensions.get::<ConnSlot>().cloned() else {
            tracing::error!("request reached a handler without a ConnSlot");
            return Err(FailureResponse::ServerError(None));
        };

        let mut open = slot.0.lock().await;
        if let Some(existing) = open.as_ref() {
            return Ok(ThreadSafeConn {
                inner: existing.conn.clone(),
            });
        }

        let pool = DbPool::from_ref(state);
        let mut conn = tokio::task::spawn_blocking(move || pool.get())
            .await
            .map_err(|e| {
                tracing::error!("connection task panicked: {e}");
                FailureResponse::ServerError(None)
            })?
            .map_err(|e| {
                tracing::error!("failed to get pooled connection: {e}");
                FailureResponse::ServerError(None)
            })?;

        if TX {
            <PooledConn as diesel::Connection>::TransactionManager::begin_transaction(&mut conn)?;
        }

        let inner = Arc::new(tokio::sync::Mutex::new(conn));
        *open = Some(OpenConn {
            conn: inner.clone(),
            in_tx: TX,
        });

        Ok(ThreadSafeConn { inner })
    }
}

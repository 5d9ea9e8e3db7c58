use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::access::access_gate;
use crate::api::{create_user, delete_user, list_users, notify, update_user};
use crate::auth::{login, login_page, logout};
use crate::dashboard::dashboard;
use crate::db::Database;
use crate::env::Env;
use crate::http::{build_cors, get_version};
use crate::session::SessionStore;
use crate::sms::SmsRelay;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post, put};
use log::{debug, info, warn};
use tokio::signal;
use tokio::sync::broadcast;

pub async fn start(config: Env) -> anyhow::Result<()> {
    info!("running server on {} mode", config.mode);

    let db = Database::create(&config).await?;
    let sms = SmsRelay::from_env(&config)?;
    if !sms.is_configured() {
        warn!("sms relay is not configured, notifications will fail");
    }

    let state = AppState {
        env: Arc::new(config),
        db: Arc::new(db),
        sessions: SessionStore::default(),
        sms: Arc::new(sms),
    };

    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    let sweeper_task = spawn_session_sweeper(
        state.sessions.clone(),
        state.env.session_sweep_interval(),
        state.env.session_idle_timeout(),
        shutdown_tx.subscribe(),
    );
    let http_task = start_http_server(state, shutdown_tx.subscribe());

    let shutdown_signal = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {}", err);
        } else {
            info!("ctrl+c pressed, shutting down");
        }
    };

    tokio::select! {
        _ = http_task => warn!("http task ended"),
        _ = sweeper_task => warn!("session sweeper task ended"),
        _ = shutdown_signal => info!("shutdown signal received"),
    }

    let _ = shutdown_tx.send(());

    Ok(())
}

pub(crate) fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.env);
    let ip_source = state.env.ip_source.clone();

    Router::new()
        .route("/", get(access_gate))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", put(update_user).delete(delete_user))
        .route("/api/notify", post(notify))
        .route("/version", get(get_version))
        .layer(ip_source.into_extension())
        .layer(cors)
        .with_state(state)
}

fn start_http_server(
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<anyhow::Result<()>> {
    let host = format!("{}:{}", state.env.host, state.env.port);

    tokio::spawn(async move {
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind(&host).await?;
        info!("listening on: {}", listener.local_addr()?);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

        Ok(())
    })
}

fn spawn_session_sweeper(
    sessions: SessionStore,
    every: Duration,
    idle: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let dropped = sessions.sweep(idle);
                    if dropped > 0 {
                        info!("dropped {dropped} idle sessions ({} active)", sessions.len());
                    } else {
                        debug!("no idle sessions ({} active)", sessions.len());
                    }
                }
                _ = shutdown.recv() => {
                    info!("session sweeper shutting down");
                    break;
                }
            }
        }
    })
}

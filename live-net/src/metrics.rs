use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use once_cell::sync::OnceCell;
use prometheus::{
    register_int_counter, register_int_gauge, Encoder, IntCounter, IntGauge, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::error;

use crate::BoxError;

/// Metric set for broadcaster session lifecycle.
pub struct SessionMetrics {
    pub sessions_started_total: IntCounter,
    pub sessions_ended_total: IntCounter,
    pub start_failures_total: IntCounter,
    pub active_sessions: IntGauge,
}

impl SessionMetrics {
    pub fn on_startup(&self) {
        self.sessions_started_total.inc_by(0);
        self.sessions_ended_total.inc_by(0);
        self.start_failures_total.inc_by(0);
        self.active_sessions.set(0);
    }

    pub fn on_session_started(&self) {
        self.sessions_started_total.inc();
        self.active_sessions.inc();
    }

    pub fn on_session_ended(&self) {
        self.sessions_ended_total.inc();
        self.active_sessions.dec();
    }

    pub fn on_start_failure(&self) {
        self.start_failures_total.inc();
    }
}

/// Metric set for the realtime chat/reaction channel.
pub struct ChannelMetrics {
    pub chat_messages_received_total: IntCounter,
    pub reactions_received_total: IntCounter,
    pub chat_messages_dropped_total: IntCounter,
}

impl ChannelMetrics {
    pub fn inc_chat_received(&self) {
        self.chat_messages_received_total.inc();
    }

    pub fn inc_reactions_received(&self) {
        self.reactions_received_total.inc();
    }

    pub fn inc_chat_dropped(&self) {
        self.chat_messages_dropped_total.inc();
    }
}

static SESSION_METRICS: OnceCell<SessionMetrics> = OnceCell::new();
static CHANNEL_METRICS: OnceCell<ChannelMetrics> = OnceCell::new();

pub fn session_metrics() -> &'static SessionMetrics {
    SESSION_METRICS.get_or_init(|| SessionMetrics {
        sessions_started_total: register_int_counter!(
            "live_sessions_started_total",
            "Broadcast sessions started by this process"
        )
        .expect("register live_sessions_started_total"),
        sessions_ended_total: register_int_counter!(
            "live_sessions_ended_total",
            "Broadcast sessions ended, including best-effort stops"
        )
        .expect("register live_sessions_ended_total"),
        start_failures_total: register_int_counter!(
            "live_session_start_failures_total",
            "Broadcast start attempts rejected by the signaling gateway"
        )
        .expect("register live_session_start_failures_total"),
        active_sessions: register_int_gauge!(
            "live_active_sessions",
            "Broadcast sessions currently live"
        )
        .expect("register live_active_sessions"),
    })
}

pub fn channel_metrics() -> &'static ChannelMetrics {
    CHANNEL_METRICS.get_or_init(|| ChannelMetrics {
        chat_messages_received_total: register_int_counter!(
            "live_chat_messages_received_total",
            "Chat messages received over the realtime channel"
        )
        .expect("register live_chat_messages_received_total"),
        reactions_received_total: register_int_counter!(
            "live_reactions_received_total",
            "Reactions received over the realtime channel"
        )
        .expect("register live_reactions_received_total"),
        chat_messages_dropped_total: register_int_counter!(
            "live_chat_messages_dropped_total",
            "Chat messages evicted from the capped viewer log"
        )
        .expect("register live_chat_messages_dropped_total"),
    })
}

pub fn metrics_router(metrics_path: &'static str) -> Router {
    Router::new().route(metrics_path, get(metrics_handler))
}

pub async fn serve_metrics(
    listener: TcpListener,
    metrics_path: &'static str,
) -> Result<(), BoxError> {
    let router = metrics_router(metrics_path);
    axum::serve(listener, router)
        .await
        .map_err(|err| Box::new(err) as BoxError)
}

pub fn spawn_metrics_exporter(
    addr: SocketAddr,
    metrics_path: &'static str,
    service_name: &'static str,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = serve_metrics(listener, metrics_path).await {
                    error!(%err, service = service_name, %addr, path = metrics_path, "metrics exporter stopped unexpectedly");
                }
            }
            Err(err) => {
                error!(%err, service = service_name, %addr, path = metrics_path, "metrics exporter could not bind");
            }
        }
    })
}

async fn metrics_handler() -> impl IntoResponse {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(%err, "metrics encode failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let body = match String::from_utf8(buffer) {
        Ok(text) => text,
        Err(err) => {
            error!(%err, "metrics output was not UTF-8");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(body))
        .unwrap()
}

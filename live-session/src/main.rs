use clap::{Parser, Subcommand};

use live_net::{message::RoomEvent, metrics, telemetry};
use live_session::{BoxError, BroadcasterController, LiveSettings, ViewerSession, METRICS_PATH};
use signaling::{SignalingClient, StartBroadcastRequest};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Live broadcast session CLI")]
struct LiveCli {
    /// Signaling gateway base URL (overrides LIVE_GATEWAY_URL).
    #[arg(long, value_name = "URL")]
    gateway_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Go live and hold the session until ctrl-c.
    Broadcast {
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Watch a stream and print chat, reactions and viewer count.
    Watch {
        stream_id: String,
    },
}

#[tokio::main]
async fn main() {
    telemetry::init("live-session");

    let cli = LiveCli::parse();

    let mut settings = match LiveSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(%err, "live-session: invalid configuration");
            return;
        }
    };
    if let Some(url) = cli.gateway_url {
        settings.gateway_url = url;
    }

    metrics::session_metrics().on_startup();
    let _ = metrics::channel_metrics();
    metrics::spawn_metrics_exporter(settings.metrics_addr, METRICS_PATH, "live-session");

    let result = match cli.command {
        Command::Broadcast { title, tags } => run_broadcast(&settings, title, tags).await,
        Command::Watch { stream_id } => run_watch(&settings, &stream_id).await,
    };

    if let Err(err) = result {
        tracing::error!(%err, "live session ended with error");
    }
}

async fn run_broadcast(
    settings: &LiveSettings,
    title: Option<String>,
    tags: Vec<String>,
) -> Result<(), BoxError> {
    let gateway = SignalingClient::with_timeout(&settings.gateway_url, settings.request_timeout)?;
    let mut controller = BroadcasterController::new(gateway, settings.enabled);

    controller
        .request_start(StartBroadcastRequest {
            title,
            tags: if tags.is_empty() { None } else { Some(tags) },
        })
        .await?;
    info!(session_id = ?controller.session_id(), "live; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    controller.request_stop().await?;
    info!("broadcast ended");
    Ok(())
}

async fn run_watch(settings: &LiveSettings, stream_id: &str) -> Result<(), BoxError> {
    let gateway = SignalingClient::with_timeout(&settings.gateway_url, settings.request_timeout)?;
    let mut viewer =
        ViewerSession::connect(&gateway, stream_id, settings.enabled, settings.connect_timeout)
            .await?;
    info!(title = ?viewer.title(), "watching; press ctrl-c to leave");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = viewer.recv_event() => match event {
                Some(RoomEvent::Chat { text, ts }) => info!(ts, %text, "chat"),
                Some(RoomEvent::Reaction { emoji, .. }) => info!(%emoji, "reaction"),
                Some(RoomEvent::Presence { viewers }) => info!(viewers, "viewer count"),
                None => break,
            }
        }
    }

    viewer.close().await;
    Ok(())
}

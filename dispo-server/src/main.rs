use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dispo_server::config::ServerConfig;
use dispo_server::feed::ReplayFeed;
use dispo_server::planning::{Planning, PlanningConfig};
use dispo_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return;
        }
    };

    let mut feed = match ReplayFeed::load(&config.feed_dir) {
        Ok(feed) => feed,
        Err(e) => {
            error!(error = %e, "failed to load feed");
            return;
        }
    };
    info!(frames = feed.len(), dir = %config.feed_dir.display(), "feed loaded");

    let state = AppState::new(Planning::new(PlanningConfig::default()));

    // Replay one frame per tick until the feed runs dry
    let planning = state.planning.clone();
    let frame_interval = config.frame_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frame_interval);
        loop {
            interval.tick().await;
            let Some(frame) = feed.next() else {
                info!("feed replay finished");
                break;
            };
            let mut model = planning.write().await;
            model.ingest(&frame);
            info!(sim_time = %frame.sim_time, trains = model.len(), "frame ingested");
        }
    });

    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %config.bind, "failed to bind");
            return;
        }
    };
    info!(addr = %config.bind, "dispatch planner listening");
    info!("  GET    /health");
    info!("  GET    /trains");
    info!("  GET    /trains/:id");
    info!("  PUT    /trains/:id/stops/:index/override");
    info!("  DELETE /trains/:id/stops/:index/override");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
    }
}

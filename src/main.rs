use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::info;

use parkd::clock::SystemClock;
use parkd::config::Config;
use parkd::dispatch::Dispatcher;
use parkd::engine::Engine;
use parkd::service::EngineHandle;
use parkd::wire;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays clean for stdio sessions.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = Config::from_env();
    parkd::observability::init(config.metrics_port)?;

    let engine = Engine::new(config.shape, config.history_cap, Arc::new(SystemClock))?;
    let total_slots = engine.hierarchy().slot_count();
    let handle = EngineHandle::spawn(Dispatcher::new(engine), config.queue_depth);

    if config.stdio {
        info!("parkd serving stdin/stdout ({total_slots} slots)");
        wire::serve_lines(tokio::io::stdin(), tokio::io::stdout(), handle).await?;
        info!("parkd stopped");
        return Ok(());
    }

    let max_connections = config.max_connections;
    let semaphore = Arc::new(Semaphore::new(max_connections));

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("parkd listening on {addr}");
    info!(
        "  shape: {} zones x {} areas x ({} car + {} bike) = {total_slots} slots",
        config.shape.zones,
        config.shape.areas_per_zone,
        config.shape.car_slots_per_area,
        config.shape.bike_slots_per_area,
    );
    info!("  max_connections: {max_connections}");
    info!("  history_cap: {}", config.history_cap);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // Stop accepting on SIGTERM/ctrl-c, then drain in-flight connections.
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (socket, peer) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("accept failed: {e}");
                        continue;
                    }
                };

                let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                    tracing::warn!("{max_connections} connections open, turning away {peer}");
                    metrics::counter!(parkd::observability::CONNECTIONS_REJECTED_TOTAL).increment(1);
                    continue;
                };

                info!("client {peer} connected");
                metrics::counter!(parkd::observability::CONNECTIONS_TOTAL).increment(1);
                metrics::gauge!(parkd::observability::CONNECTIONS_ACTIVE).increment(1.0);
                let handle = handle.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    match wire::process_connection(socket, handle).await {
                        Ok(()) => info!("client {peer} disconnected"),
                        Err(e) => tracing::error!("client {peer} dropped: {e}"),
                    }
                    metrics::gauge!(parkd::observability::CONNECTIONS_ACTIVE).decrement(1.0);
                });
            }
            _ = &mut shutdown => {
                info!("shutdown requested, no longer accepting clients");
                break;
            }
        }
    }

    info!("waiting for open clients to finish");
    let remaining = wire::drain_connections(&semaphore, max_connections, Duration::from_secs(10)).await;
    if remaining == 0 {
        info!("all clients finished");
    } else {
        tracing::warn!("gave up after 10s with {remaining} clients still open");
    }

    info!("parkd stopped");
    Ok(())
}

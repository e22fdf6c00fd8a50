use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    internals::registry::DeviceRegistry,
    models::entity::SensorEntity,
    system::{handle_host_event, HostEvent},
};

/// Task: Log every new reading of one sensor.
/// Can be cancelled.
#[tracing::instrument(skip_all, fields(sensor = %entity.unique_id()))]
pub async fn task_report_entity_state(token: CancellationToken, entity: Arc<SensorEntity>) {
    info!("Started.");
    let mut rx_state = entity.subscribe();
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            changed = rx_state.changed() => {
                if changed.is_err() {
                    debug!("State sender dropped.");
                    break;
                }
                let state = *rx_state.borrow_and_update();
                match state {
                    Some(voltage) => info!(
                        name = %entity.name(),
                        "{:.4} V",
                        voltage.value()
                    ),
                    None => debug!("State unknown."),
                }
            }
        }
    }
}

/// Task: Signal host start to the registry, then host stop once cancelled.
/// Both run on the blocking pool since stopping joins polling threads.
#[tracing::instrument(skip_all)]
pub async fn task_host_lifecycle(token: CancellationToken, registry: &'static DeviceRegistry) {
    info!("Started.");
    if let Err(e) =
        tokio::task::spawn_blocking(move || handle_host_event(registry, HostEvent::Started)).await
    {
        error!("Failed to start polling. Error: {}", e);
    }

    token.cancelled().await;
    warn!("Cancelled.");

    if let Err(e) =
        tokio::task::spawn_blocking(move || handle_host_event(registry, HostEvent::Stopping)).await
    {
        error!("Failed to stop polling. Error: {}", e);
    }
    info!("All polling stopped.");
}

use tracing::{error, info, instrument};

use crate::fetcher::SensorApiClient;
use crate::store::SensorId;

/// Known sensor identifiers, duplicates removed
///
/// Any failure (transport, status, undecodable body) is logged and reported as
/// "no sensors" so callers can stop early instead of aborting.
#[instrument(skip(client))]
pub async fn fetch_sensor_ids(client: &SensorApiClient) -> Vec<SensorId> {
    info!("Fetching sensor list...");
    match client.fetch_sensor_list().await {
        Ok(ids) => {
            info!("Successfully retrieved sensor list with {} sensors", ids.len());
            ids
        }
        Err(e) => {
            error!("Error fetching sensor list: {}", e);
            Vec::new()
        }
    }
}

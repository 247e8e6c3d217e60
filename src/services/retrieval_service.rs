use tracing::{debug, info, instrument, warn};

use crate::fetcher::SensorApiClient;
use crate::store::{
    FetchStateRecord, FetchStateRepository, FetchStatus, RawRecord, ReadingCache, SensorId,
    StoreError,
};
use crate::utils;

/// Readings of every sensor for one month, plus how they were obtained
#[derive(Debug, Clone, Default)]
pub struct MonthlyData {
    pub records: Vec<RawRecord>,
    pub stats: RetrievalStats,
}

impl MonthlyData {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalStats {
    pub sensors_total: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub empty: usize,
    pub failed_windows: usize,
}

/// How a sensor/month is obtained on this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// State says the cache is complete and the file is present
    Load,
    /// File present but no usable state record; take it over as completed
    Adopt,
    /// Nothing usable cached; a file left over from an empty fetch is stale
    Fetch,
    /// State expects a cache file that is gone
    Refetch,
}

pub fn cache_decision(state: Option<&FetchStateRecord>, cache_exists: bool) -> CacheDecision {
    match (state.map(|s| s.status), cache_exists) {
        (Some(status), true) if status.has_cache() => CacheDecision::Load,
        (Some(status), false) if status.has_cache() => CacheDecision::Refetch,
        (Some(FetchStatus::Empty), _) => CacheDecision::Fetch,
        (_, true) => CacheDecision::Adopt,
        (_, false) => CacheDecision::Fetch,
    }
}

/// Month-at-a-time sensor data retrieval with a write-through file cache
#[derive(Clone)]
pub struct RetrievalService {
    client: SensorApiClient,
    cache: ReadingCache,
}

impl RetrievalService {
    pub fn new(client: SensorApiClient, cache: ReadingCache) -> Self {
        Self { client, cache }
    }

    /// Retrieve one calendar month for every sensor, one request at a time
    ///
    /// Sensors with a cache entry are loaded from disk. Freshly fetched sensors
    /// are written to the cache as soon as their windows are done, and the
    /// fetch state is saved after each sensor so an interrupted run resumes
    /// where it stopped. With `refresh` set, existing cache entries are ignored.
    #[instrument(skip(self, sensor_ids), fields(sensors = sensor_ids.len()))]
    pub async fn get_monthly_data(
        &self,
        sensor_ids: &[SensorId],
        year: i32,
        month: u32,
        refresh: bool,
    ) -> Result<MonthlyData, StoreError> {
        let windows = utils::month_windows(year, month);
        let mut state = FetchStateRepository::load(self.cache.dir())?;
        let mut data = MonthlyData::default();
        data.stats.sensors_total = sensor_ids.len();

        info!(
            "Retrieving data for {} sensors for the month {}-{:02} ({} windows)",
            sensor_ids.len(),
            year,
            month,
            windows.len()
        );

        for (index, sensor_id) in sensor_ids.iter().enumerate() {
            info!(
                "Processing sensor {} ({}/{})",
                sensor_id,
                index + 1,
                sensor_ids.len()
            );

            let decision = if refresh {
                CacheDecision::Fetch
            } else {
                cache_decision(
                    state.get(sensor_id, year, month),
                    self.cache.exists(sensor_id, year, month),
                )
            };

            let records = match decision {
                CacheDecision::Load | CacheDecision::Adopt => {
                    info!(
                        "Data for sensor {} for {}-{:02} already exists. Loading from file.",
                        sensor_id, year, month
                    );
                    let records = self.cache.load(sensor_id, year, month)?;
                    if decision == CacheDecision::Adopt {
                        state.record_outcome(
                            sensor_id,
                            year,
                            month,
                            FetchStatus::Completed,
                            records.len(),
                            0,
                        );
                        state.save()?;
                    }
                    data.stats.cache_hits += 1;
                    records
                }
                CacheDecision::Fetch | CacheDecision::Refetch => {
                    if decision == CacheDecision::Refetch {
                        warn!(
                            "Cache file for sensor {} is missing, fetching again",
                            sensor_id
                        );
                    }
                    state.mark_pending(sensor_id, year, month);
                    let (records, failed_windows) = self.fetch_month(sensor_id, &windows).await;
                    data.stats.failed_windows += failed_windows;

                    if records.is_empty() {
                        info!("No data retrieved for sensor {}", sensor_id);
                        if self.cache.remove(sensor_id, year, month)? {
                            info!("Removed stale cache file for sensor {}", sensor_id);
                        }
                        state.record_outcome(
                            sensor_id,
                            year,
                            month,
                            FetchStatus::Empty,
                            0,
                            failed_windows,
                        );
                        state.save()?;
                        data.stats.empty += 1;
                        continue;
                    }

                    let records: Vec<RawRecord> = records
                        .into_iter()
                        .map(|r| r.with_sensor_id(sensor_id))
                        .collect();
                    let path = self.cache.write(sensor_id, year, month, &records)?;
                    info!("Sensor data for {} saved to {}", sensor_id, path.display());

                    let status = if failed_windows > 0 {
                        warn!(
                            "Sensor {} is missing {} of {} windows",
                            sensor_id,
                            failed_windows,
                            windows.len()
                        );
                        FetchStatus::Partial
                    } else {
                        FetchStatus::Completed
                    };
                    state.record_outcome(
                        sensor_id,
                        year,
                        month,
                        status,
                        records.len(),
                        failed_windows,
                    );
                    state.save()?;
                    data.stats.fetched += 1;
                    records
                }
            };

            data.records.extend(
                records
                    .into_iter()
                    .map(|r| r.with_sensor_id(sensor_id)),
            );
            debug!("Completed data retrieval for sensor {}", sensor_id);
        }

        info!(
            "All data for the month retrieved. Total records: {} (cache hits: {}, fetched: {}, empty: {}, failed windows: {})",
            data.records.len(),
            data.stats.cache_hits,
            data.stats.fetched,
            data.stats.empty,
            data.stats.failed_windows
        );
        Ok(data)
    }

    /// Fetch every window sequentially; a failed window contributes nothing
    async fn fetch_month(
        &self,
        sensor_id: &SensorId,
        windows: &[utils::DateWindow],
    ) -> (Vec<RawRecord>, usize) {
        let mut records = Vec::new();
        let mut failed = 0;

        for window in windows {
            match self.client.fetch_data_messages(sensor_id, window).await {
                Ok(chunk) => {
                    debug!(
                        "Window {}..{} returned {} records",
                        window.from,
                        window.to,
                        chunk.len()
                    );
                    records.extend(chunk);
                }
                Err(e) => {
                    warn!(
                        "Error fetching data for sensor {} from {} to {}: {}",
                        sensor_id,
                        window.from_param(),
                        window.to_param(),
                        e
                    );
                    failed += 1;
                }
            }
        }

        (records, failed)
    }
}

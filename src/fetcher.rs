use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::fetch_error::FetchError;
use crate::store::{RawRecord, SensorId, SENSOR_ID_COLUMN};
use crate::utils::DateWindow;

pub const DEFAULT_BASE_URL: &str = "https://www.imonnit.com";

const SENSOR_LIST_PATH: &str = "/json/SensorListFull";
const SENSOR_DATA_PATH: &str = "/json/SensorDataMessages";
const RESULT_FIELD: &str = "Result";

/// API credentials sent as request headers on every call
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Client for the sensor list and sensor data message endpoints
#[derive(Clone)]
pub struct SensorApiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: ApiCredentials,
}

impl SensorApiClient {
    pub fn new(base_url: impl Into<String>, credentials: ApiCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Fetch every sensor identifier known to the account, in response order
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_sensor_list(&self) -> Result<Vec<SensorId>, FetchError> {
        debug!("Requesting sensor list");
        let body = self.post(SENSOR_LIST_PATH, &[]).await?;
        parse_sensor_list(&body)
    }

    /// Fetch the raw reading records of one sensor for one date window
    #[instrument(skip(self), fields(sensor_id = %sensor_id, from = %window.from, to = %window.to))]
    pub async fn fetch_data_messages(
        &self,
        sensor_id: &SensorId,
        window: &DateWindow,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let from_date = window.from_param();
        let to_date = window.to_param();
        debug!(
            "Fetching data for sensor {} from {} to {}",
            sensor_id, from_date, to_date
        );

        let params = [
            ("sensorID", sensor_id.as_str()),
            ("fromDate", from_date.as_str()),
            ("toDate", to_date.as_str()),
        ];
        let body = self.post(SENSOR_DATA_PATH, &params).await?;
        parse_data_messages(&body)
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .post(&url)
            .header("APIKeyID", &self.credentials.api_key)
            .header("APISecretKey", &self.credentials.secret_key);
        if !form.is_empty() {
            request = request.form(form);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            error!("Request to {} failed with status {}: {}", url, status, body);
            return Err(FetchError::Status { status, body });
        }

        debug!("Retrieved response body, size: {} bytes", body.len());
        Ok(body)
    }
}

fn result_array(body: &str) -> Result<Vec<Value>, FetchError> {
    let mut document: Value = serde_json::from_str(body)?;
    match document.get_mut(RESULT_FIELD).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => {
            warn!("'{}' is not a list: {}", RESULT_FIELD, other);
            Err(FetchError::MissingField(RESULT_FIELD))
        }
        None => Err(FetchError::MissingField(RESULT_FIELD)),
    }
}

/// Parse a sensor list response into unique identifiers, first-seen order
pub fn parse_sensor_list(body: &str) -> Result<Vec<SensorId>, FetchError> {
    let items = result_array(body)?;
    let mut ids: Vec<SensorId> = Vec::new();
    let mut skipped = 0;

    for item in &items {
        let id = match item.get(SENSOR_ID_COLUMN) {
            Some(Value::String(s)) if !s.trim().is_empty() => SensorId::new(s.as_str()),
            Some(Value::Number(n)) => SensorId::new(n.to_string()),
            _ => {
                skipped += 1;
                continue;
            }
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if skipped > 0 {
        warn!("Skipped {} sensor list entries without a {}", skipped, SENSOR_ID_COLUMN);
    }
    debug!("Parsed {} unique sensors from {} entries", ids.len(), items.len());
    Ok(ids)
}

/// Parse a data messages response into raw records
pub fn parse_data_messages(body: &str) -> Result<Vec<RawRecord>, FetchError> {
    let items = result_array(body)?;
    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for item in &items {
        match item.as_object() {
            Some(object) => records.push(RawRecord::from_json_object(object)),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} data messages that were not JSON objects", skipped);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sensor_list_dedupes_in_order() {
        let body = r#"{"Result": [
            {"SensorID": 30, "SensorName": "Freezer"},
            {"SensorID": 10, "SensorName": "Fridge"},
            {"SensorID": 30, "SensorName": "Freezer again"},
            {"SensorID": "abc-1"}
        ]}"#;

        let ids = parse_sensor_list(body).unwrap();
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["30", "10", "abc-1"]);
    }

    #[test]
    fn test_parse_sensor_list_skips_entries_without_id() {
        let body = r#"{"Result": [{"SensorName": "Orphan"}, {"SensorID": 5}]}"#;
        let ids = parse_sensor_list(body).unwrap();
        assert_eq!(ids, vec![SensorId::new("5")]);
    }

    #[test]
    fn test_parse_sensor_list_empty() {
        let ids = parse_sensor_list(r#"{"Result": []}"#).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_parse_sensor_list_result_not_a_list() {
        let result = parse_sensor_list(r#"{"Result": "Invalid API key"}"#);
        assert!(matches!(result, Err(FetchError::MissingField("Result"))));
    }

    #[test]
    fn test_parse_sensor_list_invalid_json() {
        let result = parse_sensor_list("<html>oops</html>");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_parse_data_messages() {
        let body = r#"{"Result": [
            {"DataMessageGUID": "a1", "MessageDate": "/Date(1733011200000)/", "PlotValue": "4.2", "Voltage": 3.1},
            {"DataMessageGUID": "a2", "MessageDate": "/Date(1733014800000)/", "PlotValue": "", "Voltage": null},
            42
        ]}"#;

        let records = parse_data_messages(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("PlotValue"), Some("4.2"));
        assert_eq!(records[0].get("Voltage"), Some("3.1"));
        assert_eq!(records[1].get("Voltage"), Some(""));
    }

    #[test]
    fn test_parse_data_messages_missing_result() {
        let result = parse_data_messages(r#"{"Method": "SensorDataMessages"}"#);
        assert!(matches!(result, Err(FetchError::MissingField(_))));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = ApiCredentials {
            api_key: "key-123".to_string(),
            secret_key: "secret-456".to_string(),
        };
        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("key-123"));
        assert!(!rendered.contains("secret-456"));
    }
}

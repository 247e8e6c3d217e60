// Tests for SensorApiClient and the sensor directory
// Uses mockito for HTTP mocking

use chrono::NaiveDate;
use mockito::{Matcher, Server};
use sensor_compliance::fetch_error::FetchError;
use sensor_compliance::fetcher::{ApiCredentials, SensorApiClient};
use sensor_compliance::sensor_directory::fetch_sensor_ids;
use sensor_compliance::store::SensorId;
use sensor_compliance::utils::DateWindow;

fn create_test_client(base_url: String) -> SensorApiClient {
    SensorApiClient::new(
        base_url,
        ApiCredentials {
            api_key: "test-key".to_string(),
            secret_key: "test-secret".to_string(),
        },
    )
}

fn first_week_of_december() -> DateWindow {
    DateWindow {
        from: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        to: NaiveDate::from_ymd_opt(2024, 12, 7).unwrap(),
    }
}

#[tokio::test]
async fn test_fetch_sensor_list_sends_credentials() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/json/SensorListFull")
        .match_header("APIKeyID", "test-key")
        .match_header("APISecretKey", "test-secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Method": "SensorListFull", "Result": [{"SensorID": 10}, {"SensorID": 20}, {"SensorID": 10}]}"#)
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let ids = client.fetch_sensor_list().await.unwrap();

    assert_eq!(ids, vec![SensorId::new("10"), SensorId::new("20")]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_sensor_list_error_status() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/json/SensorListFull")
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let result = client.fetch_sensor_list().await;

    match result {
        Err(FetchError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("Expected Status error, got {:?}", other.map(|ids| ids.len())),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_sensor_directory_treats_failure_as_no_sensors() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/json/SensorListFull")
        .with_status(500)
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let ids = fetch_sensor_ids(&client).await;

    assert!(ids.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_sensor_directory_unreachable_server() {
    // Nothing listens on port 9 (discard) in the test environment
    let client = create_test_client("http://127.0.0.1:9".to_string());
    let ids = fetch_sensor_ids(&client).await;
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_fetch_data_messages_form_fields() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/json/SensorDataMessages")
        .match_header("APIKeyID", "test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sensorID".into(), "10".into()),
            Matcher::UrlEncoded("fromDate".into(), "12/01/2024".into()),
            Matcher::UrlEncoded("toDate".into(), "12/07/2024".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"Result": [
                {"DataMessageGUID": "g1", "MessageDate": "/Date(1733047200000)/", "PlotValue": "4.5"},
                {"DataMessageGUID": "g2", "MessageDate": "/Date(1733050800000)/", "PlotValue": "5.5"}
            ]}"#,
        )
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let records = client
        .fetch_data_messages(&SensorId::new("10"), &first_week_of_december())
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("PlotValue"), Some("4.5"));
    assert_eq!(records[1].get("DataMessageGUID"), Some("g2"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_data_messages_server_error() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/json/SensorDataMessages")
        .with_status(503)
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let result = client
        .fetch_data_messages(&SensorId::new("10"), &first_week_of_december())
        .await;

    assert!(matches!(result, Err(FetchError::Status { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_base_url_trailing_slash_is_ignored() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/json/SensorListFull")
        .with_status(200)
        .with_body(r#"{"Result": []}"#)
        .create_async()
        .await;

    let client = create_test_client(server.url() + "/");
    let ids = client.fetch_sensor_list().await.unwrap();

    assert!(ids.is_empty());
    mock.assert_async().await;
}

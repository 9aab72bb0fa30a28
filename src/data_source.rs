use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::import_data;
use crate::track::{Path, TrackPoint};
use crate::utils;

/// Device and time range of a track query. Times are ISO-8601 strings that the
/// source passes along untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub device_id: String,
    pub start_time: String,
    pub end_time: String,
}

impl TrackFilter {
    pub fn is_complete(&self) -> bool {
        !self.device_id.trim().is_empty()
            && !self.start_time.trim().is_empty()
            && !self.end_time.trim().is_empty()
    }
}

#[allow(async_fn_in_trait)]
pub trait DataSource {
    /// An empty path means there is no data for the filter.
    async fn fetch_track(&self, filter: &TrackFilter) -> Result<Path>;

    async fn fetch_trip(&self, trip_id: &str) -> Result<TrackFilter> {
        Err(Error::Network(format!(
            "trip lookup is not available for this source (trip {trip_id})"
        )))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackDataPoint {
    latitude: f64,
    longitude: f64,
    #[allow(dead_code)]
    #[serde(default)]
    imei: Option<String>,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default)]
    bearing: Option<f64>,
    #[serde(default)]
    date_time: Option<String>,
}

#[derive(Deserialize)]
struct TrackDataResponse {
    success: bool,
    #[serde(default)]
    count: usize,
    #[serde(default)]
    data: Vec<TrackDataPoint>,
}

#[derive(Deserialize)]
struct Device {
    imei: String,
}

#[derive(Deserialize)]
struct VehicleNumber {
    device: Device,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleDetails {
    vehicle_number: VehicleNumber,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripDetails {
    trip_expected_start_date: i64,
    trip_expected_end_date: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripData {
    vehicle_details: VehicleDetails,
    trip_details: TripDetails,
}

#[derive(Deserialize)]
struct TripResponse {
    success: bool,
    data: Option<TripData>,
}

pub fn parse_track_response(body: &str) -> Result<Path> {
    let response: TrackDataResponse = serde_json::from_str(body)?;
    if !response.success {
        warn!("track service reported failure");
        return Ok(Path::empty());
    }
    if response.count != response.data.len() {
        debug!(
            "track service count {} does not match {} points",
            response.count,
            response.data.len()
        );
    }
    let samples = response
        .data
        .into_iter()
        .map(|x| {
            TrackPoint {
                altitude: x.altitude,
                bearing: x.bearing,
                timestamp: x
                    .date_time
                    .as_deref()
                    .and_then(|time| DateTime::parse_from_rfc3339(time).ok()),
                ..TrackPoint::new(x.latitude, x.longitude)
            }
            .checked()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Path::load(samples))
}

/// Expected start/end of a trip are epoch millis; they are handed to the track
/// query as ISO-8601 at the trip offset (+05:30).
pub fn parse_trip_response(body: &str) -> Result<TrackFilter> {
    let response: TripResponse = serde_json::from_str(body)?;
    let data = match (response.success, response.data) {
        (true, Some(data)) => data,
        _ => return Err(Error::Network("trip service reported failure".to_string())),
    };
    let to_iso = |ms| {
        utils::epoch_ms_to_iso(ms, utils::TRIP_OFFSET_MINUTES)
            .ok_or_else(|| Error::Decode(format!("bad trip timestamp: {ms}")))
    };
    Ok(TrackFilter {
        device_id: data.vehicle_details.vehicle_number.device.imei,
        start_time: to_iso(data.trip_details.trip_expected_start_date)?,
        end_time: to_iso(data.trip_details.trip_expected_end_date)?,
    })
}

pub struct HttpDataSource {
    client: Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        info!("GET {url}");
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Content-Type", "application/json")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

impl DataSource for HttpDataSource {
    async fn fetch_track(&self, filter: &TrackFilter) -> Result<Path> {
        let body = self
            .get(
                &format!("{}/trackdata", self.base_url),
                &[
                    ("startDate", filter.start_time.as_str()),
                    ("endDate", filter.end_time.as_str()),
                    ("imei", filter.device_id.as_str()),
                ],
            )
            .await?;
        parse_track_response(&body)
    }

    async fn fetch_trip(&self, trip_id: &str) -> Result<TrackFilter> {
        let body = self
            .get(&format!("{}/trip/{}", self.base_url, trip_id), &[])
            .await?;
        parse_trip_response(&body)
    }
}

/// Serves the same file for every query.
pub struct StaticDataSource {
    file_path: String,
}

impl StaticDataSource {
    pub fn new(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
        }
    }
}

impl DataSource for StaticDataSource {
    async fn fetch_track(&self, _filter: &TrackFilter) -> Result<Path> {
        import_data::load_static(&self.file_path)
    }
}

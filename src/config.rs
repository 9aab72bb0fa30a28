use std::fs;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::playback::{AdvancePolicy, PlaybackConfig};
use crate::utils::TRIP_OFFSET_MINUTES;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOption {
    pub value: String,
    pub label: String,
}

impl DeviceOption {
    pub fn new(imei: &str) -> Self {
        DeviceOption {
            value: imei.to_string(),
            label: format!("Device {imei}"),
        }
    }

    fn matches(&self, query: &str) -> bool {
        self.label.to_lowercase().contains(&query.to_lowercase()) || self.value.contains(query)
    }
}

/// Everything that used to be a module level constant. Fields missing from a
/// config file take their default value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub device_list: Vec<DeviceOption>,
    pub default_device: String,
    pub default_start_time: String,
    pub default_end_time: String,
    /// Offset of the wall-clock times users type in, in minutes east of UTC.
    pub timezone_offset_minutes: i32,
    pub policy: AdvancePolicy,
    pub frame_interval_ms: u64,
    pub default_interval_ms: u64,
    pub report_name: String,
    pub static_track_file: Option<String>,
    pub map_host: String,
    pub map_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let device_list = [
            "700070635323",
            "700070635324",
            "700070635325",
            "700070635326",
            "800070635323",
            "900070635323",
            "700080635323",
            "700090635323",
        ]
        .iter()
        .map(|imei| DeviceOption::new(imei))
        .collect();
        Config {
            base_url: "http://localhost:3000".to_string(),
            device_list,
            default_device: "700070635323".to_string(),
            default_start_time: "2025-03-18T10:07:58Z".to_string(),
            default_end_time: "2025-03-18T10:08:57Z".to_string(),
            timezone_offset_minutes: TRIP_OFFSET_MINUTES,
            policy: AdvancePolicy::FixedSteps,
            frame_interval_ms: 16,
            default_interval_ms: 20,
            report_name: "track_play_report".to_string(),
            static_track_file: None,
            map_host: "localhost".to_string(),
            map_port: 0,
        }
    }
}

impl Config {
    pub fn load(file_path: &str) -> Result<Self> {
        let content = fs::read_to_string(file_path)?;
        let config: Config = serde_json::from_str(&content)?;
        info!("loaded config from {file_path}");
        Ok(config)
    }

    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig {
            policy: self.policy,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            base_interval: Duration::from_millis(self.default_interval_ms),
        }
    }

    pub fn filter_devices(&self, query: &str) -> Vec<&DeviceOption> {
        self.device_list
            .iter()
            .filter(|device| device.matches(query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_devices() {
        let config = Config::default();
        assert_eq!(config.filter_devices("").len(), 8);
        assert_eq!(config.filter_devices("DEVICE 8").len(), 1);
        let hits = |query: &str| -> Vec<String> {
            config
                .filter_devices(query)
                .into_iter()
                .map(|x| x.value.clone())
                .collect()
        };
        assert_eq!(hits("70635324"), vec!["700070635324"]);
        assert_eq!(hits("800"), vec!["800070635323"]);
        assert!(config.filter_devices("nope").is_empty());
    }

    #[test]
    fn partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"base_url": "http://tracker:8080", "policy": "frame_fraction"}"#)
                .unwrap();
        assert_eq!(config.base_url, "http://tracker:8080");
        assert_eq!(config.policy, AdvancePolicy::FrameFraction);
        assert_eq!(config.report_name, "track_play_report");
        assert_eq!(config.playback().base_interval, Duration::from_millis(20));
    }
}

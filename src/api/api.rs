use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::Interval;

use crate::config::{Config, DeviceOption};
use crate::data_source::{DataSource, TrackFilter};
use crate::export_data::{self, ExportType};
use crate::import_data;
use crate::map_adapter::{MapAdapter, NoMap};
use crate::playback::{PlaybackEngine, PlaybackState, Speed};
use crate::player::{self, Command};
use crate::renderer::map_server::SceneToken;
use crate::renderer::{MapServer, WebMap};
use crate::track::Path;
use crate::utils;

/// What the user gets to see when something did not work. Nothing here is
/// fatal, the session keeps going.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusMessage {
    IncompleteFilter,
    FetchFailed,
    NoData,
    MapFailed,
}

impl StatusMessage {
    pub fn text(&self) -> &'static str {
        match self {
            StatusMessage::IncompleteFilter => "Please select IMEI, start date, and end date",
            StatusMessage::FetchFailed => "Failed to fetch track data",
            StatusMessage::NoData => "No track data available for the selected criteria",
            StatusMessage::MapFailed => "Failed to load map",
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Keeps the web map reachable. Dropping it unregisters the scene and stops
/// the server.
pub struct WebMapHandle {
    pub map: WebMap,
    pub token: SceneToken,
    pub server: MapServer,
}

impl WebMapHandle {
    pub fn url(&self) -> String {
        self.token.url()
    }
}

/// One playback session: the current filter, the engine drawing on `M` and the
/// source the tracks come from.
///
/// The controls only change state. Playback advances while the session is
/// driven, either by awaiting `advance`/`play_to_end` or by `run`.
pub struct TrackPlay<M: MapAdapter, D: DataSource> {
    config: Config,
    engine: PlaybackEngine<M>,
    source: D,
    filter: TrackFilter,
    status: Option<StatusMessage>,
    timer: Option<(u64, Interval)>,
}

impl<M: MapAdapter, D: DataSource> TrackPlay<M, D> {
    pub fn new(config: Config, map: M, source: D) -> Self {
        let engine = PlaybackEngine::new(map, config.playback());
        let filter = TrackFilter {
            device_id: config.default_device.clone(),
            start_time: config.default_start_time.clone(),
            end_time: config.default_end_time.clone(),
        };
        TrackPlay {
            config,
            engine,
            source,
            filter,
            status: None,
            timer: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &PlaybackEngine<M> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine<M> {
        &mut self.engine
    }

    pub fn filter(&self) -> &TrackFilter {
        &self.filter
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.status
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    fn set_status(&mut self, status: StatusMessage) {
        info!("status: {status}");
        self.status = Some(status);
    }

    pub fn devices(&self, query: &str) -> Vec<&DeviceOption> {
        self.config.filter_devices(query)
    }

    /// Builds a filter from `datetime-local` style times in the configured
    /// offset. Returns false and shows a status if any field is unusable.
    pub fn set_filter_from_local(&mut self, device_id: &str, start: &str, end: &str) -> bool {
        let offset = self.config.timezone_offset_minutes;
        match (
            utils::local_to_utc_iso(start, offset),
            utils::local_to_utc_iso(end, offset),
        ) {
            (Some(start_time), Some(end_time)) if !device_id.trim().is_empty() => {
                self.filter = TrackFilter {
                    device_id: device_id.trim().to_string(),
                    start_time,
                    end_time,
                };
                true
            }
            _ => {
                self.set_status(StatusMessage::IncompleteFilter);
                false
            }
        }
    }

    /// Fetches the track for `filter` and shows it. The previous path is torn
    /// down first, whatever the outcome.
    pub async fn load_track(&mut self, filter: TrackFilter) {
        self.filter = filter;
        if !self.filter.is_complete() {
            self.set_status(StatusMessage::IncompleteFilter);
            return;
        }
        self.clear_status();
        self.engine.reset();
        self.engine.load_path(Path::empty());

        let result = self.source.fetch_track(&self.filter).await;
        match result {
            Ok(path) => self.show_path(path),
            Err(e) => {
                error!("failed to fetch track for {:?}: {e}", self.filter);
                self.set_status(StatusMessage::FetchFailed);
            }
        }
    }

    pub async fn reload(&mut self) {
        self.load_track(self.filter.clone()).await
    }

    /// Looks the trip up and loads its device and expected time range.
    pub async fn preload_trip(&mut self, trip_id: &str) {
        info!("preloading trip {trip_id}");
        match self.source.fetch_trip(trip_id).await {
            Ok(filter) => self.load_track(filter).await,
            Err(e) => {
                error!("failed to fetch trip {trip_id}: {e}");
                self.set_status(StatusMessage::FetchFailed);
            }
        }
    }

    pub fn load_static(&mut self, file_path: &str) {
        self.clear_status();
        match import_data::load_static(file_path) {
            Ok(path) => self.show_path(path),
            Err(e) => {
                error!("failed to load {file_path}: {e}");
                self.engine.load_path(Path::empty());
                self.set_status(StatusMessage::FetchFailed);
            }
        }
    }

    fn show_path(&mut self, path: Path) {
        if path.is_empty() {
            self.set_status(StatusMessage::NoData);
        }
        self.engine.load_path(path);
    }

    pub fn export_report(&self, dir: &str, export_type: ExportType) -> Result<PathBuf> {
        export_data::export_report(
            self.engine.path(),
            dir,
            &self.config.report_name,
            export_type,
        )
    }

    pub fn controls_enabled(&self) -> bool {
        self.engine.controls_enabled()
    }

    pub fn play_pause(&mut self) {
        if !self.controls_enabled() {
            warn!("play/pause ignored: nothing to animate");
            return;
        }
        if let Err(e) = self.engine.toggle() {
            warn!("cannot start playback: {e}");
        }
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Waits for the next tick of the live schedule and applies it. Returns
    /// false at once when nothing is playing.
    pub async fn advance(&mut self) -> bool {
        player::sync_timer(self.engine.schedule(), &mut self.timer);
        if self.timer.is_none() {
            return false;
        }
        let id = player::next_tick(&mut self.timer).await;
        self.engine.tick(id)
    }

    /// Keeps ticking until playback pauses, finishes or is reset.
    pub async fn play_to_end(&mut self) {
        while self.engine.is_playing() && self.advance().await {}
    }

    /// Drives the session from `commands` until `Command::Shutdown` or every
    /// handle is dropped. Playback is paused on the way out, the path stays
    /// drawn.
    pub async fn run(&mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!("session driver started");
        loop {
            player::sync_timer(self.engine.schedule(), &mut self.timer);
            let command = {
                let timer = &mut self.timer;
                tokio::select! {
                    command = commands.recv() => command,
                    id = player::next_tick(timer) => {
                        self.engine.tick(id);
                        continue;
                    }
                }
            };
            match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => self.apply(command),
            }
        }
        self.engine.pause();
        self.timer = None;
        info!("session driver stopped");
    }

    fn apply(&mut self, command: Command) {
        debug!("session command: {command:?}");
        match command {
            Command::Play => {
                if !self.engine.is_playing() {
                    self.play_pause();
                }
            }
            Command::Pause => self.engine.pause(),
            Command::Toggle => self.play_pause(),
            Command::Reset => self.reset(),
            Command::SetSpeed(speed) => self.set_speed(speed),
            Command::SpeedUp => self.speed_up(),
            Command::SlowDown => self.slow_down(),
            Command::Load(path) => {
                self.clear_status();
                self.show_path(path);
            }
            Command::Shutdown => (),
        }
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.engine.set_speed(speed);
    }

    pub fn speed_up(&mut self) {
        self.engine.speed_up();
    }

    pub fn slow_down(&mut self) {
        self.engine.slow_down();
    }

    pub fn speed_label(&self) -> String {
        self.engine.speed_label()
    }

    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    pub fn progress_percent(&self) -> f64 {
        self.engine.progress_percent()
    }

    pub fn total_length_m(&self) -> f64 {
        self.engine.path().total_length_m()
    }
}

impl<D: DataSource> TrackPlay<Box<dyn MapAdapter>, D> {
    /// Starts a map server and draws on a served `WebMap`. When the server
    /// cannot start the session still works, it just draws nothing.
    pub fn with_web_map(config: Config, source: D) -> (Self, Option<WebMapHandle>) {
        let mut server = MapServer::new(&config.map_host, config.map_port);
        match server.start() {
            Ok(()) => {
                let map = WebMap::new();
                let token = server.register(&map);
                info!("web map available at {}", token.url());
                let web_map: Box<dyn MapAdapter> = Box::new(map.clone());
                let session = TrackPlay::new(config, web_map, source);
                (session, Some(WebMapHandle { map, token, server }))
            }
            Err(e) => {
                error!("{e}");
                let no_map: Box<dyn MapAdapter> = Box::new(NoMap);
                let mut session = TrackPlay::new(config, no_map, source);
                session.set_status(StatusMessage::MapFailed);
                (session, None)
            }
        }
    }
}

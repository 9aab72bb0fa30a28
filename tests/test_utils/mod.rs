#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::json;
use tokio::runtime::Runtime;

use trackplay_core::map_adapter::{MapAdapter, MarkerId, MarkerStyle};
use trackplay_core::playback::{
    AdvancePolicy, PlaybackConfig, PlaybackEngine, PlaybackEvent, PlaybackState,
};
use trackplay_core::track::{Bounds, Path, Point};

pub const DEVICE_WITH_DATA: &str = "700070635323";
pub const DEVICE_WITHOUT_DATA: &str = "700070635324";
pub const DEVICE_REJECTED: &str = "700070635325";
pub const DEVICE_SERVER_ERROR: &str = "700070635326";
pub const TRIP_ID: &str = "42";

#[derive(Clone, Debug, PartialEq)]
pub enum MapCall {
    DrawPath(usize),
    ClearPath,
    PlaceMarker(MarkerId, Point),
    MoveMarker(MarkerId, Point),
    RemoveMarker(MarkerId),
    FitBounds(Bounds),
}

/// What is currently drawn, plus every call that got us there.
#[derive(Default, Debug)]
pub struct MapLog {
    pub calls: Vec<MapCall>,
    pub polylines: usize,
    pub markers: BTreeMap<MarkerId, Point>,
    pub bounds: Option<Bounds>,
}

#[derive(Clone, Default)]
pub struct RecordingMap {
    pub log: Rc<RefCell<MapLog>>,
}

impl MapAdapter for RecordingMap {
    fn draw_path(&mut self, points: &[Point]) {
        let mut log = self.log.borrow_mut();
        log.calls.push(MapCall::DrawPath(points.len()));
        log.polylines += 1;
    }

    fn clear_path(&mut self) {
        let mut log = self.log.borrow_mut();
        log.calls.push(MapCall::ClearPath);
        log.polylines = log.polylines.saturating_sub(1);
        log.bounds = None;
    }

    fn place_marker(&mut self, id: MarkerId, point: Point, _style: MarkerStyle) {
        let mut log = self.log.borrow_mut();
        log.calls.push(MapCall::PlaceMarker(id, point));
        log.markers.insert(id, point);
    }

    fn move_marker(&mut self, id: MarkerId, point: Point) {
        let mut log = self.log.borrow_mut();
        log.calls.push(MapCall::MoveMarker(id, point));
        if let Some(marker) = log.markers.get_mut(&id) {
            *marker = point;
        }
    }

    fn remove_marker(&mut self, id: MarkerId) {
        let mut log = self.log.borrow_mut();
        log.calls.push(MapCall::RemoveMarker(id));
        log.markers.remove(&id);
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        let mut log = self.log.borrow_mut();
        log.calls.push(MapCall::FitBounds(bounds));
        log.bounds = Some(bounds);
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn playback_config(policy: AdvancePolicy) -> PlaybackConfig {
    PlaybackConfig {
        policy,
        frame_interval: Duration::from_millis(16),
        base_interval: Duration::from_millis(20),
    }
}

pub fn recording_engine(
    policy: AdvancePolicy,
) -> (PlaybackEngine<RecordingMap>, Rc<RefCell<MapLog>>) {
    let map = RecordingMap::default();
    let log = map.log.clone();
    (PlaybackEngine::new(map, playback_config(policy)), log)
}

pub fn record_events<M: MapAdapter>(
    engine: &mut PlaybackEngine<M>,
) -> Rc<RefCell<Vec<PlaybackEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    engine.add_observer(move |event: &PlaybackEvent| sink.borrow_mut().push(event.clone()));
    events
}

pub fn progress_values(events: &Rc<RefCell<Vec<PlaybackEvent>>>) -> Vec<f64> {
    events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::Progress(x) => Some(*x),
            _ => None,
        })
        .collect()
}

pub fn positions(events: &Rc<RefCell<Vec<PlaybackEvent>>>) -> Vec<Point> {
    events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::Position(x) => Some(*x),
            _ => None,
        })
        .collect()
}

pub fn states(events: &Rc<RefCell<Vec<PlaybackEvent>>>) -> Vec<PlaybackState> {
    events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::StateChanged(x) => Some(*x),
            _ => None,
        })
        .collect()
}

/// Fires the live schedule until there is none. Returns the number of ticks.
pub fn run_to_end<M: MapAdapter>(engine: &mut PlaybackEngine<M>) -> usize {
    let mut ticks = 0;
    while let Some(schedule) = engine.schedule() {
        assert!(engine.tick(schedule.id));
        ticks += 1;
        assert!(ticks <= 100_000, "playback never finished");
    }
    ticks
}

pub fn tick_n<M: MapAdapter>(engine: &mut PlaybackEngine<M>, n: usize) {
    for _ in 0..n {
        let schedule = engine.schedule().expect("no live schedule");
        assert!(engine.tick(schedule.id));
    }
}

pub fn diagonal_path() -> Path {
    Path::from_points(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)])
}

// A short drive around south Delhi.
pub fn delhi_path() -> Path {
    Path::from_points(vec![
        Point::new(28.516552, 77.165808),
        Point::new(28.5171, 77.1661),
        Point::new(28.5178, 77.1669),
        Point::new(28.5183, 77.1675),
        Point::new(28.5191, 77.1682),
    ])
}

/// A stand-in for the track service, on its own thread and runtime.
pub struct FixtureServer {
    pub base_url: String,
    pub queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    server_handle: ServerHandle,
    thread: Option<thread::JoinHandle<()>>,
}

type Queries = Mutex<Vec<HashMap<String, String>>>;

async fn trackdata(
    query: web::Query<HashMap<String, String>>,
    queries: web::Data<Queries>,
) -> HttpResponse {
    queries.lock().unwrap().push(query.0.clone());
    match query.get("imei").map(String::as_str) {
        Some(DEVICE_WITH_DATA) => HttpResponse::Ok().json(json!({
            "success": true,
            "count": 3,
            "data": [
                {"_id": "1", "latitude": 28.516552, "longitude": 77.165808, "imei": DEVICE_WITH_DATA,
                 "altitude": 210.0, "bearing": 45.0, "dateTime": "2025-03-18T10:07:58Z"},
                {"_id": "2", "latitude": 28.5171, "longitude": 77.1661, "imei": DEVICE_WITH_DATA,
                 "altitude": 211.0, "bearing": 46.0, "dateTime": "2025-03-18T10:08:20Z"},
                {"_id": "3", "latitude": 28.5178, "longitude": 77.1669, "imei": DEVICE_WITH_DATA,
                 "altitude": 212.0, "bearing": 47.0, "dateTime": "2025-03-18T10:08:57Z"}
            ]
        })),
        Some(DEVICE_WITHOUT_DATA) => {
            HttpResponse::Ok().json(json!({"success": true, "count": 0, "data": []}))
        }
        Some(DEVICE_REJECTED) => {
            HttpResponse::Ok().json(json!({"success": false, "count": 0, "data": []}))
        }
        Some(DEVICE_SERVER_ERROR) => HttpResponse::InternalServerError().finish(),
        _ => HttpResponse::Ok()
            .content_type("text/html")
            .body("<html>not json</html>"),
    }
}

async fn trip(id: web::Path<String>) -> HttpResponse {
    match id.as_str() {
        TRIP_ID => HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "vehicleDetails": {"vehicleNumber": {"device": {"imei": DEVICE_WITH_DATA}}},
                "tripDetails": {
                    "tripExpectedStartDate": 1742292478000_i64,
                    "tripExpectedEndDate": 1742292537000_i64
                }
            }
        })),
        "7" => HttpResponse::Ok().json(json!({"success": false})),
        _ => HttpResponse::NotFound().finish(),
    }
}

impl FixtureServer {
    pub fn start() -> Self {
        let queries: Arc<Queries> = Arc::new(Mutex::new(Vec::new()));
        let data = web::Data::from(queries.clone());
        let (tx, rx) = mpsc::channel();

        let thread = thread::spawn(move || {
            let runtime = Runtime::new().unwrap();
            runtime.block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(data.clone())
                        .route("/trackdata", web::get().to(trackdata))
                        .route("/trip/{id}", web::get().to(trip))
                })
                .workers(1)
                .bind(("127.0.0.1", 0))
                .unwrap();
                let port = server.addrs()[0].port();
                let server = server.run();
                tx.send((port, server.handle())).unwrap();
                server.await.unwrap();
            });
        });

        let (port, server_handle) = rx.recv().unwrap();
        FixtureServer {
            base_url: format!("http://127.0.0.1:{port}"),
            queries,
            server_handle,
            thread: Some(thread),
        }
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        drop(self.server_handle.stop(false));
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

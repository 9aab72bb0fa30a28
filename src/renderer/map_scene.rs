use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::map_adapter::{MapAdapter, MarkerId, MarkerStyle};
use crate::track::{Bounds, Point};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneMarker {
    pub point: Point,
    pub style: MarkerStyle,
}

/// Everything a map frontend needs to draw the current playback: the polyline,
/// the markers and the camera bounds. `version` changes on every edit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapScene {
    pub version: u64,
    pub path: Option<Vec<Point>>,
    pub markers: BTreeMap<MarkerId, SceneMarker>,
    pub bounds: Option<Bounds>,
}

impl MapScene {
    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn get_version_string(&self) -> String {
        format!("\"{:x}\"", self.version)
    }

    pub fn parse_version_string(version_str: &str) -> Option<u64> {
        // Remove quotes if present
        let cleaned = version_str.trim_matches('"');
        u64::from_str_radix(cleaned, 16).ok()
    }

    /// `None` when the client already has this version.
    pub fn get_latest_if_changed(&self, client_version: Option<&str>) -> Option<&MapScene> {
        match client_version {
            Some(v_str) if (Self::parse_version_string(v_str) == Some(self.version)) => None,
            _ => Some(self),
        }
    }
}

/// `MapAdapter` backed by a shared `MapScene`, served to a webview by
/// `MapServer`.
#[derive(Clone, Default)]
pub struct WebMap {
    scene: Arc<Mutex<MapScene>>,
}

impl WebMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> Arc<Mutex<MapScene>> {
        self.scene.clone()
    }

    pub fn snapshot(&self) -> MapScene {
        self.scene.lock().unwrap().clone()
    }

    fn update<F: FnOnce(&mut MapScene)>(&self, f: F) {
        let mut scene = self.scene.lock().unwrap();
        f(&mut scene);
        scene.touch();
    }
}

impl MapAdapter for WebMap {
    fn draw_path(&mut self, points: &[Point]) {
        self.update(|scene| scene.path = Some(points.to_vec()));
    }

    fn clear_path(&mut self) {
        self.update(|scene| {
            scene.path = None;
            scene.bounds = None;
        });
    }

    fn place_marker(&mut self, id: MarkerId, point: Point, style: MarkerStyle) {
        self.update(|scene| {
            scene.markers.insert(id, SceneMarker { point, style });
        });
    }

    fn move_marker(&mut self, id: MarkerId, point: Point) {
        self.update(|scene| match scene.markers.get_mut(&id) {
            Some(marker) => marker.point = point,
            None => warn!("moving unknown marker {}", id.as_str()),
        });
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.update(|scene| {
            scene.markers.remove(&id);
        });
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.update(|scene| scene.bounds = Some(bounds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string() {
        let mut map = WebMap::new();
        map.draw_path(&[Point::new(1.0, 2.0)]);
        map.place_marker(
            MarkerId::Start,
            Point::new(1.0, 2.0),
            MarkerStyle::for_marker(MarkerId::Start),
        );
        let scene = map.snapshot();
        assert_eq!(scene.version, 2);
        assert_eq!(scene.get_version_string(), "\"2\"");
        assert_eq!(MapScene::parse_version_string("\"2\""), Some(2));
        assert!(scene.get_latest_if_changed(Some("\"2\"")).is_none());
        assert!(scene.get_latest_if_changed(Some("\"1\"")).is_some());
        assert!(scene.get_latest_if_changed(None).is_some());
    }

    #[test]
    fn scene_json_uses_marker_ids() {
        let mut map = WebMap::new();
        map.place_marker(
            MarkerId::Cursor,
            Point::new(1.0, 2.0),
            MarkerStyle::for_marker(MarkerId::Cursor),
        );
        let json = serde_json::to_value(map.snapshot()).unwrap();
        assert_eq!(json["markers"]["cursorMarker"]["point"]["latitude"], 1.0);
        assert_eq!(json["markers"]["cursorMarker"]["style"]["shape"], "arrow");
    }
}

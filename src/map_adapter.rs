use serde::{Deserialize, Serialize};

use crate::track::{Bounds, Point};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerId {
    #[serde(rename = "cursorMarker")]
    Cursor,
    #[serde(rename = "startMarker")]
    Start,
    #[serde(rename = "endMarker")]
    End,
}

impl MarkerId {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerId::Cursor => "cursorMarker",
            MarkerId::Start => "startMarker",
            MarkerId::End => "endMarker",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Circle,
    Arrow,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub shape: MarkerShape,
    pub color: String,
    pub label: String,
}

impl MarkerStyle {
    pub fn for_marker(id: MarkerId) -> Self {
        let (shape, color, label) = match id {
            MarkerId::Start => (MarkerShape::Circle, "#4CAF50", "S"),
            MarkerId::End => (MarkerShape::Circle, "#F44336", "E"),
            MarkerId::Cursor => (MarkerShape::Arrow, "#4285F4", "▲"),
        };
        MarkerStyle {
            shape,
            color: color.to_string(),
            label: label.to_string(),
        }
    }
}

/// What the playback engine needs from a map widget. Implementations draw, the
/// engine never reads anything back.
pub trait MapAdapter {
    fn draw_path(&mut self, points: &[Point]);
    fn clear_path(&mut self);
    fn place_marker(&mut self, id: MarkerId, point: Point, style: MarkerStyle);
    fn move_marker(&mut self, id: MarkerId, point: Point);
    fn remove_marker(&mut self, id: MarkerId);
    fn fit_bounds(&mut self, bounds: Bounds);
}

impl<M: MapAdapter + ?Sized> MapAdapter for Box<M> {
    fn draw_path(&mut self, points: &[Point]) {
        (**self).draw_path(points)
    }

    fn clear_path(&mut self) {
        (**self).clear_path()
    }

    fn place_marker(&mut self, id: MarkerId, point: Point, style: MarkerStyle) {
        (**self).place_marker(id, point, style)
    }

    fn move_marker(&mut self, id: MarkerId, point: Point) {
        (**self).move_marker(id, point)
    }

    fn remove_marker(&mut self, id: MarkerId) {
        (**self).remove_marker(id)
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        (**self).fit_bounds(bounds)
    }
}

/// Used when the map widget could not be created: playback keeps working,
/// nothing gets drawn.
pub struct NoMap;

impl MapAdapter for NoMap {
    fn draw_path(&mut self, _points: &[Point]) {}
    fn clear_path(&mut self) {}
    fn place_marker(&mut self, _id: MarkerId, _point: Point, _style: MarkerStyle) {}
    fn move_marker(&mut self, _id: MarkerId, _point: Point) {}
    fn remove_marker(&mut self, _id: MarkerId) {}
    fn fit_bounds(&mut self, _bounds: Bounds) {}
}

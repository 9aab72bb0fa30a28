use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path as FsPath;

use chrono::DateTime;
use gpx::read;
use kml::{Kml, KmlReader};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::track::{Path, TrackPoint};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StaticFormat {
    Json,
    Gpx,
    Kml,
}

impl StaticFormat {
    pub fn from_file_path(file_path: &str) -> Option<Self> {
        let extension = FsPath::new(file_path)
            .extension()
            .and_then(|x| x.to_str())?
            .to_lowercase();
        match extension.as_str() {
            "json" => Some(StaticFormat::Json),
            "gpx" => Some(StaticFormat::Gpx),
            "kml" => Some(StaticFormat::Kml),
            _ => None,
        }
    }
}

pub fn load_static(file_path: &str) -> Result<Path> {
    let format = StaticFormat::from_file_path(file_path)
        .ok_or_else(|| Error::Decode(format!("unsupported track file: {file_path}")))?;
    info!("loading static track {file_path} as {format:?}");
    match format {
        StaticFormat::Json => load_track_json(File::open(file_path)?),
        StaticFormat::Gpx => load_gpx(File::open(file_path)?),
        StaticFormat::Kml => load_kml(File::open(file_path)?),
    }
}

// The fallback file stores coordinates as strings, but numbers show up too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Text(String),
    Number(f64),
}

impl Coordinate {
    fn value(&self) -> Result<f64> {
        match self {
            Coordinate::Number(x) => Ok(*x),
            Coordinate::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| Error::Decode(format!("bad coordinate {s:?}: {e}"))),
        }
    }
}

#[derive(Deserialize)]
struct StaticPoint {
    latitude: Coordinate,
    longitude: Coordinate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StaticData {
    #[serde(default)]
    get_distance_track_play: Vec<StaticPoint>,
}

#[derive(Deserialize)]
struct StaticFile {
    data: StaticData,
}

/// `{ "data": { "getDistanceTrackPlay": [{ "latitude": "..", "longitude": ".." }] } }`
pub fn load_track_json<R: Read>(reader: R) -> Result<Path> {
    let file: StaticFile = serde_json::from_reader(BufReader::new(reader))?;
    let samples = file
        .data
        .get_distance_track_play
        .iter()
        .map(|x| TrackPoint::new(x.latitude.value()?, x.longitude.value()?).checked())
        .collect::<Result<Vec<_>>>()?;
    Ok(Path::load(samples))
}

pub fn load_gpx<R: Read>(reader: R) -> Result<Path> {
    let gpx_data = read(BufReader::new(reader)).map_err(|e| Error::Decode(e.to_string()))?;
    let samples = gpx_data
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(|point| {
            let timestamp = point
                .time
                .as_ref()
                .and_then(|time| time.format().ok())
                .and_then(|time| DateTime::parse_from_rfc3339(&time).ok());
            TrackPoint {
                altitude: point.elevation,
                timestamp,
                ..TrackPoint::new(point.point().y(), point.point().x())
            }
            .checked()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Path::load(samples))
}

pub fn load_kml<R: Read>(reader: R) -> Result<Path> {
    let kml_data = KmlReader::<_, f64>::from_reader(BufReader::new(reader))
        .read()
        .map_err(|e| Error::Decode(e.to_string()))?;
    let mut whens = Vec::new();
    let mut coords = Vec::new();
    flatten_kml(vec![kml_data])
        .into_iter()
        .filter_map(|k| match k {
            Kml::Placemark(p) => Some(p.children),
            _ => None,
        })
        .flat_map(|arr| arr.into_iter().filter(|e| e.name == "Track"))
        .for_each(|e| {
            e.children.into_iter().for_each(|e| {
                if e.name == "when" {
                    whens.push(e.content);
                } else if e.name == "coord" {
                    coords.push(e.content);
                }
            })
        });

    let mut samples = Vec::new();
    for (when, coord) in whens.iter().zip(coords.iter()) {
        let splitted: Vec<&str> = match coord {
            Some(coord) => coord.split_whitespace().collect(),
            None => continue,
        };
        if splitted.len() < 2 {
            return Err(Error::Decode(format!("bad kml coord: {coord:?}")));
        }
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| Error::Decode(format!("bad kml coord {s:?}: {e}")))
        };
        let altitude = match splitted.get(2) {
            Some(s) => Some(parse(s)?),
            None => None,
        };
        samples.push(
            TrackPoint {
                altitude,
                timestamp: when
                    .as_ref()
                    .and_then(|time| DateTime::parse_from_rfc3339(time).ok()),
                ..TrackPoint::new(parse(splitted[1])?, parse(splitted[0])?)
            }
            .checked()?,
        );
    }
    Ok(Path::load(samples))
}

fn flatten_kml(kml: Vec<Kml>) -> Vec<Kml> {
    kml.into_iter()
        .flat_map(|k| match k {
            Kml::KmlDocument(d) => flatten_kml(d.elements),
            Kml::Document { attrs: _, elements } => flatten_kml(elements),
            Kml::Folder { attrs: _, elements } => flatten_kml(elements),
            k => vec![k],
        })
        .collect()
}

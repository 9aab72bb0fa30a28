use std::fs::File;
use std::io::Write;
use std::path::{Path as FsPath, PathBuf};

use anyhow::Result;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use rust_xlsxwriter::Workbook;

use crate::error::Error;
use crate::track::Path;

pub const TRACK_NAME: &str = "Track Play";
const HEADER: [&str; 2] = ["latitude", "longitude"];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ExportType {
    #[default]
    Xlsx,
    Csv,
    Gpx,
}

impl ExportType {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportType::Xlsx => "xlsx",
            ExportType::Csv => "csv",
            ExportType::Gpx => "gpx",
        }
    }
}

pub fn report_file_name(report_name: &str, export_type: ExportType) -> String {
    format!("{}.{}", report_name, export_type.extension())
}

/// Spreadsheet report: a header row, then one row per point in traversal
/// order.
pub fn path_to_xlsx(path: &Path) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(TRACK_NAME)?;
    for (col, title) in HEADER.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title)?;
    }
    for (i, point) in path.points().iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_number(row, 0, point.latitude)?;
        worksheet.write_number(row, 1, point.longitude)?;
    }
    Ok(workbook)
}

pub fn path_to_xlsx_file<W: Write>(path: &Path, writer: &mut W) -> Result<()> {
    let mut workbook = path_to_xlsx(path)?;
    writer.write_all(&workbook.save_to_buffer()?)?;
    Ok(())
}

pub fn path_to_csv_file<W: Write>(path: &Path, writer: &mut W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for point in path.points() {
        csv_writer.write_record([point.latitude.to_string(), point.longitude.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn path_to_gpx(path: &Path) -> Gpx {
    let points = path
        .samples()
        .iter()
        .map(|sample| {
            let mut waypoint = Waypoint::new(Point::new(
                sample.point.longitude,
                sample.point.latitude,
            ));
            waypoint.elevation = sample.altitude;
            waypoint
        })
        .collect();
    let track = Track {
        name: Some(TRACK_NAME.to_string()),
        comment: None,
        description: None,
        source: None,
        links: vec![],
        type_: None,
        number: None,
        segments: vec![TrackSegment { points }],
    };
    Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("trackplay".to_string()),
        metadata: None,
        waypoints: vec![],
        tracks: vec![track],
        routes: vec![],
    }
}

pub fn path_to_gpx_file<W: Write>(path: &Path, writer: &mut W) -> Result<()> {
    let gpx = path_to_gpx(path);
    gpx::write(&gpx, writer)?;
    Ok(())
}

/// Writes `<report_name>.<ext>` into `dir` and returns the file path.
pub fn export_report(
    path: &Path,
    dir: &str,
    report_name: &str,
    export_type: ExportType,
) -> Result<PathBuf> {
    if path.is_empty() {
        return Err(Error::EmptyPath.into());
    }
    let target = FsPath::new(dir).join(report_file_name(report_name, export_type));
    let mut file = File::create(&target)?;
    match export_type {
        ExportType::Xlsx => path_to_xlsx_file(path, &mut file)?,
        ExportType::Csv => path_to_csv_file(path, &mut file)?,
        ExportType::Gpx => path_to_gpx_file(path, &mut file)?,
    }
    info!("exported {} points to {:?}", path.len(), target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Point as TrackPoint;

    #[test]
    fn csv_report() {
        let path = Path::from_points(vec![
            TrackPoint::new(28.516552, 77.165808),
            TrackPoint::new(28.5171, 77.1661),
        ]);
        let mut out = Vec::new();
        path_to_csv_file(&path, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "latitude,longitude\n28.516552,77.165808\n28.5171,77.1661\n"
        );
    }

    #[test]
    fn file_names() {
        assert_eq!(
            report_file_name("track_play_report", ExportType::Csv),
            "track_play_report.csv"
        );
        assert_eq!(report_file_name("trip", ExportType::Gpx), "trip.gpx");
        assert_eq!(
            report_file_name("track_play_report", ExportType::default()),
            "track_play_report.xlsx"
        );
    }
}

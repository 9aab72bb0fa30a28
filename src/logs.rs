use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

pub const LOG_FILE_NAME: &str = "trackplay.log";

pub fn log_file_path(log_dir: &str) -> PathBuf {
    Path::new(log_dir).join("logs").join(LOG_FILE_NAME)
}

/// Installs the global logger: rolling files under `<log_dir>/logs`, keeping 3
/// files of 1000 lines each. Fails if a logger is already installed.
pub fn init(log_dir: &str) -> Result<()> {
    let path = log_file_path(log_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(3)),
        ContentLimit::Lines(1000),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    WriteLogger::init(LevelFilter::Info, config, log)?;
    info!("logging initialized in {log_dir}");
    Ok(())
}

#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;

pub mod api;
pub mod config;
pub mod data_source;
pub mod error;
pub mod export_data;
pub mod import_data;
pub mod logs;
pub mod map_adapter;
pub mod playback;
pub mod player;
pub mod renderer;
pub mod track;
pub mod utils;

pub use error::{Error, Result};

#[allow(clippy::module_inception)]
pub mod api;

pub use api::{StatusMessage, TrackPlay, WebMapHandle};

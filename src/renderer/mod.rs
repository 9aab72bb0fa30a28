pub mod map_scene;
pub use map_scene::{MapScene, WebMap};

pub mod map_server;
pub use map_server::MapServer;

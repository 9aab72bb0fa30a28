use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, RwLock, Weak};
use std::thread;

use actix_web::dev::{Service, ServerHandle};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use tokio::runtime::Runtime;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::renderer::map_scene::{MapScene, WebMap};

type SceneRegistry = RwLock<HashMap<Uuid, Weak<Mutex<MapScene>>>>;

/// Owned by whoever shows a webview map for a scene. The scene stays reachable
/// at `url()` until the token is dropped.
pub struct SceneToken {
    id: Uuid,
    url: String,
    registry: Weak<SceneRegistry>,
}

impl SceneToken {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }
}

impl Drop for SceneToken {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            debug!("dropping scene {} from registry", self.id);
            let mut items = registry.write().unwrap();
            items.remove(&self.id);
        }
    }
}

#[derive(Default, Clone)]
pub struct Registry {
    url_prefix: Arc<RwLock<String>>,
    items: Arc<SceneRegistry>,
}

impl Registry {
    pub fn new(url_prefix: &str) -> Self {
        Self {
            url_prefix: Arc::new(RwLock::new(url_prefix.to_string())),
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn set_url_prefix(&self, url_prefix: &str) {
        let mut prefix = self.url_prefix.write().unwrap();
        *prefix = url_prefix.to_string();
    }

    pub fn register(&self, scene: &Arc<Mutex<MapScene>>) -> SceneToken {
        let id = Uuid::new_v4();
        self.items
            .write()
            .unwrap()
            .insert(id, Arc::downgrade(scene));
        let url_prefix = self.url_prefix.read().unwrap();
        SceneToken {
            id,
            url: format!("{}/scenes/{}", *url_prefix, id),
            registry: Arc::downgrade(&self.items),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Mutex<MapScene>>> {
        let items = self.items.read().unwrap();
        items.get(id).and_then(|scene| scene.upgrade())
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct AppState {
    registry: Registry,
}

async fn serve_scene(
    id: web::Path<String>,
    req: HttpRequest,
    data: web::Data<AppState>,
) -> HttpResponse {
    let scene = match Uuid::parse_str(&id)
        .ok()
        .and_then(|uuid| data.registry.get(&uuid))
    {
        Some(scene) => scene,
        None => return HttpResponse::NotFound().finish(),
    };
    let scene = scene.lock().unwrap();

    let client_version = req
        .headers()
        .get("If-None-Match")
        .and_then(|h| h.to_str().ok());
    match scene.get_latest_if_changed(client_version) {
        None => HttpResponse::NotModified().finish(),
        Some(scene) => HttpResponse::Ok()
            .insert_header(("ETag", scene.get_version_string()))
            .json(scene),
    }
}

pub struct MapServer {
    host: String,
    port: u16,
    handle: Option<thread::JoinHandle<()>>,
    server_handle: Option<ServerHandle>,
    registry: Registry,
}

impl MapServer {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            handle: None,
            server_handle: None,
            registry: Registry::new(&format!("http://{host}:{port}")),
        }
    }

    pub fn register(&self, map: &WebMap) -> SceneToken {
        self.registry.register(&map.scene())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    // Start the server in a separate thread
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let host = self.host.clone();
        let port = self.port;
        let registry = self.registry.clone();
        let random_prefix = Uuid::new_v4().to_string();

        let (tx, rx) = mpsc::channel::<std::result::Result<(u16, ServerHandle), String>>();

        let handle = thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = tx.send(Err(format!("failed to create tokio runtime: {e}")));
                    return;
                }
            };
            runtime.block_on(async move {
                let app_state = web::Data::new(AppState {
                    registry: registry.clone(),
                });
                let route = format!("/{random_prefix}/scenes/{{id}}");
                info!("Setting up map server routes...");
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(app_state.clone())
                        .wrap_fn(|req, srv| {
                            debug!("Incoming request: {} {}", req.method(), req.uri());
                            srv.call(req)
                        })
                        .route(&route, web::get().to(serve_scene))
                })
                .workers(1)
                .bind((host.as_str(), port));
                let server = match server {
                    Ok(server) => server,
                    Err(e) => {
                        let _ = tx.send(Err(format!("failed to bind {host}:{port}: {e}")));
                        return;
                    }
                };

                // port 0 means the OS picked one
                let port = server.addrs().first().map(|x| x.port()).unwrap_or(port);
                registry.set_url_prefix(&format!("http://{host}:{port}/{random_prefix}"));

                let server = server.run();
                let _ = tx.send(Ok((port, server.handle())));
                info!("Map server bound successfully to {host}:{port}");
                if let Err(e) = server.await {
                    error!("map server failed: {e}");
                }
            });
        });

        match rx.recv() {
            Ok(Ok((port, server_handle))) => {
                self.port = port;
                self.server_handle = Some(server_handle);
                self.handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::MapInit(e))
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::MapInit("map server thread exited".to_string()))
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(server_handle) = self.server_handle.take() {
            // the stop command is sent right away, completion is awaited via join
            drop(server_handle.stop(false));
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MapServer {
    fn drop(&mut self) {
        self.stop();
    }
}

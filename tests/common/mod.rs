//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use now_serve::lifecycle::{boot, Shutdown, StartupError};
use now_serve::ServeOptions;

/// A throwaway project directory.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn new(now_json: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("now.json"), now_json).unwrap();
        Self { dir }
    }

    /// Project with one `@now/node` build over `api/*.{js,ts}` and the given routes.
    pub fn with_routes(routes: &str) -> Self {
        Self::new(&format!(
            r#"{{
                "version": 2,
                "builds": [{{ "src": "api/*.{{js,ts}}", "use": "@now/node" }}],
                "routes": {routes}
            }}"#
        ))
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, source: &str) -> &Self {
        let path = self.dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
        self
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.dir.path().join(name)).unwrap();
    }
}

/// A server running on an ephemeral port until dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn options(root: &Path) -> ServeOptions {
    ServeOptions {
        root: root.to_path_buf(),
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..Default::default()
    }
}

pub async fn try_start(options: ServeOptions) -> Result<TestServer, StartupError> {
    let running = boot(&options).await?;
    let addr = running.local_addr();
    let shutdown = Shutdown::new();
    let stop = shutdown.wait();

    tokio::spawn(async move {
        let _ = running.serve(stop).await;
    });

    Ok(TestServer { addr, shutdown })
}

pub async fn start(project: &Project) -> TestServer {
    try_start(options(project.path())).await.unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

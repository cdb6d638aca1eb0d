// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::env::current_dir;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use locanda_http_handling::{FileHandler, LocandaConfig, LocandaSettings, VirtualHost, VirtualHostSet};
use locanda_resources::MediaTypeRegistry;

mod demo_handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let wwwroot_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => current_dir()?.join("wwwroot"),
    };
    let address = std::env::var("LOCANDA_ADDRESS")
        .unwrap_or_else(|_| String::from("127.0.0.1:8080"));

    let media_types = load_media_types(&wwwroot_path);

    let mut host = VirtualHost::new(None);
    host.register_get("/", Arc::new(FileHandler::new(wwwroot_path, true, media_types)));
    demo_handlers::register(&mut host);

    let config = LocandaConfig::new(LocandaSettings {
        hosts: VirtualHostSet::new(host),
        read_headers_timeout: Duration::from_secs(45),
        read_body_timeout: Duration::from_secs(60),
    });

    locanda_http1::start(&address, config).await?;
    Ok(())
}

/// Builds the media-type registry from the built-in table, the system-wide
/// `mime.types` and a `.mime.types` in the web root, in that order.
fn load_media_types(wwwroot_path: &Path) -> Arc<MediaTypeRegistry> {
    let mut registry = MediaTypeRegistry::new();
    for path in [Path::new("/etc/mime.types"), &wwwroot_path.join(".mime.types")] {
        let Ok(file) = std::fs::File::open(path) else {
            continue;
        };
        match registry.load_mime_types(BufReader::new(file)) {
            Ok(count) => tracing::debug!("loaded {count} media types from {}", path.display()),
            Err(error) => tracing::warn!("failed to read {}: {error}", path.display()),
        }
    }
    Arc::new(registry)
}

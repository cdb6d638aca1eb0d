// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::Arc;
use std::time::Duration;

use crate::vhost::VirtualHostSet;

#[derive(Clone)]
pub struct LocandaConfig {
    #[cfg(feature = "rustls")]
    pub tls_config: Option<Arc<rustls::ServerConfig>>,

    pub settings: Arc<LocandaSettings>,
}

impl LocandaConfig {
    pub fn new(settings: LocandaSettings) -> Self {
        Self {
            #[cfg(feature = "rustls")]
            tls_config: None,

            settings: Arc::new(settings),
        }
    }
}

pub struct LocandaSettings {
    pub hosts: VirtualHostSet,

    /// If the client doesn't transmit the full request-line and headers within
    /// this time, the request is terminated.
    pub read_headers_timeout: Duration,

    /// If the client doesn't transmit the full body within
    /// this time, the request is terminated.
    pub read_body_timeout: Duration,
}

impl Default for LocandaSettings {
    fn default() -> Self {
        Self {
            hosts: VirtualHostSet::default(),
            read_headers_timeout: Duration::from_secs(30),
            read_body_timeout: Duration::from_secs(60),
        }
    }
}

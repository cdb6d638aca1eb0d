// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Virtual hosts and the contexts registered on them.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use locanda_http::Method;

use crate::handler::Handler;

/// The fallback context path that matches every request path.
pub const DEFAULT_CONTEXT: &str = "*";

/// A path prefix with the handlers mounted on it, keyed by method.
#[derive(Clone)]
pub struct ContextInfo {
    path: String,
    handlers: HashMap<Method, Arc<dyn Handler>>,
}

impl ContextInfo {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handlers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn handler(&self, method: &Method) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(method)
    }

    /// The methods this context accepts, for `Allow` lists.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<&Method> {
        let mut methods: Vec<&Method> = self.handlers.keys().collect();
        methods.sort_by(|a, b| a.as_string().cmp(b.as_string()));
        methods
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A named host with its own context tree and per-host policies.
pub struct VirtualHost {
    name: Option<String>,
    aliases: HashSet<String>,

    /// The file served when a request targets a directory, e.g. `index.html`.
    pub welcome_file: String,

    /// Whether directory listings may be generated when no welcome file
    /// exists.
    pub generate_index: bool,

    methods: HashSet<Method>,
    contexts: HashMap<String, ContextInfo>,
}

impl VirtualHost {
    #[must_use]
    pub fn new(name: Option<String>) -> Self {
        let mut contexts = HashMap::new();
        contexts.insert(DEFAULT_CONTEXT.to_string(), ContextInfo::new(DEFAULT_CONTEXT));
        Self {
            name,
            aliases: HashSet::new(),
            welcome_file: "index.html".to_string(),
            generate_index: false,
            methods: HashSet::new(),
            contexts,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        self.aliases.insert(alias.into());
    }

    #[must_use]
    pub fn is_known_as(&self, host: &str) -> bool {
        self.name.as_deref().is_some_and(|name| name.eq_ignore_ascii_case(host))
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(host))
    }

    /// Mounts a handler on the given context path for the given methods. An
    /// empty method list defaults to `GET`.
    pub fn register(&mut self, path: impl Into<String>, methods: &[Method], handler: Arc<dyn Handler>) {
        let path = path.into();
        let methods: &[Method] = if methods.is_empty() { &[Method::Get] } else { methods };
        let context = self.contexts.entry(path.clone())
            .or_insert_with(|| ContextInfo::new(path));
        for method in methods {
            self.methods.insert(method.clone());
            context.handlers.insert(method.clone(), Arc::clone(&handler));
        }
    }

    pub fn register_get(&mut self, path: impl Into<String>, handler: Arc<dyn Handler>) {
        self.register(path, &[Method::Get], handler);
    }

    /// Whether any context on this host accepts the given method. Decides
    /// between 405 and 501 when no context matches a request.
    #[must_use]
    pub fn accepts_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// All methods accepted anywhere on this host, for the `*` `Allow` list.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<&Method> {
        let mut methods: Vec<&Method> = self.methods.iter().collect();
        methods.sort_by(|a, b| a.as_string().cmp(b.as_string()));
        methods
    }

    /// Resolves the context for a request path: the longest registered
    /// prefix wins, falling back to the `*` context.
    #[must_use]
    pub fn context(&self, path: &str) -> &ContextInfo {
        let mut candidate = path.to_string();
        loop {
            if let Some(context) = self.contexts.get(&candidate) {
                return context;
            }
            match parent_path(&candidate) {
                Some(parent) => candidate = parent,
                None => break,
            }
        }
        &self.contexts[DEFAULT_CONTEXT]
    }
}

/// The registered path one level above the given one, or `None` at the root.
fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(index) => Some(trimmed[..index].to_string()),
        None => None,
    }
}

/// All virtual hosts served by this server. Requests resolve against the
/// host they name, or the default host when no name matches.
pub struct VirtualHostSet {
    default_host: VirtualHost,
    hosts: Vec<VirtualHost>,
}

impl Default for VirtualHostSet {
    fn default() -> Self {
        Self {
            default_host: VirtualHost::new(None),
            hosts: Vec::new(),
        }
    }
}

impl VirtualHostSet {
    #[must_use]
    pub fn new(default_host: VirtualHost) -> Self {
        Self {
            default_host,
            hosts: Vec::new(),
        }
    }

    pub fn add_host(&mut self, host: VirtualHost) {
        self.hosts.push(host);
    }

    #[must_use]
    pub fn default_host(&self) -> &VirtualHost {
        &self.default_host
    }

    #[must_use]
    pub fn resolve(&self, host: &str) -> &VirtualHost {
        self.hosts.iter()
            .find(|candidate| candidate.is_known_as(host))
            .unwrap_or(&self.default_host)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use locanda_http::{Request, Response, StatusCode};

    use crate::handler::Outcome;

    use super::*;

    struct NamedHandler(&'static str);

    #[async_trait]
    impl Handler for NamedHandler {
        async fn handle(&self, _request: &mut Request, _context_path: &str) -> Result<Outcome, anyhow::Error> {
            Ok(Response::with_status_and_string_body(StatusCode::Ok, self.0).into())
        }
    }

    fn handler(name: &'static str) -> Arc<dyn Handler> {
        Arc::new(NamedHandler(name))
    }

    #[test]
    fn longest_prefix_wins() {
        let mut host = VirtualHost::new(None);
        host.register_get("/", handler("root"));
        host.register_get("/api", handler("api"));
        host.register_get("/api/v2", handler("v2"));

        assert_eq!(host.context("/api/v2/users").path(), "/api/v2");
        assert_eq!(host.context("/api/v1/users").path(), "/api");
        assert_eq!(host.context("/about.html").path(), "/");
    }

    #[test]
    fn unmatched_path_falls_back_to_default_context() {
        let mut host = VirtualHost::new(None);
        host.register_get("/files", handler("files"));
        assert_eq!(host.context("/other").path(), DEFAULT_CONTEXT);
        assert!(host.context("/other").is_empty());
    }

    #[test]
    fn method_registry_tracks_all_contexts() {
        let mut host = VirtualHost::new(None);
        host.register("/a", &[Method::Get], handler("a"));
        host.register("/b", &[Method::Post, Method::Delete], handler("b"));

        assert!(host.accepts_method(&Method::Get));
        assert!(host.accepts_method(&Method::Post));
        assert!(host.accepts_method(&Method::Delete));
        assert!(!host.accepts_method(&Method::Put));
    }

    #[test]
    fn host_resolution_by_name_and_alias() {
        let mut named = VirtualHost::new(Some("www.example.com".to_string()));
        named.add_alias("example.com");
        let mut set = VirtualHostSet::default();
        set.add_host(named);

        assert_eq!(set.resolve("WWW.Example.Com").name(), Some("www.example.com"));
        assert_eq!(set.resolve("example.com").name(), Some("www.example.com"));
        assert_eq!(set.resolve("other.example").name(), None);
    }
}

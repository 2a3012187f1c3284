//! The `Grimm` facade: configuration in, running server out.

use crate::config::{validate, GrimmConfig};
use crate::error::StartupError;
use crate::privileges::{PrivilegeDrop, SystemPrivileges};
use crate::server::{HttpServer, ServerHandle};
use axum::extract::Request;
use axum::middleware::Next;
use bundle_system::{BundleLoader, LoadReport};
use grimm_core::{
    register_public, Application, ConfigError, ConfigKey, Context, Discovered, Engine, Environment,
    FileIndex, Logger, Middleware, TemplateEngine, ViewCache,
};
use serde_json::Value;
use socketioxide::layer::SocketIoLayer;
use socketioxide::SocketIo;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// The application facade handed to every bundle.
pub struct Grimm {
    app: Arc<dyn Application>,
    engine: Arc<dyn Engine>,
    templating: Arc<dyn TemplateEngine>,
    logger: Logger,
    environment: Environment,
    root: PathBuf,
    server: HttpServer,
    sockets: Option<(SocketIoLayer, SocketIo)>,
    layouts: FileIndex,
    partials: FileIndex,
    loader: BundleLoader,
    privileges: Arc<dyn PrivilegeDrop>,
}

fn required<T>(value: Option<T>, key: ConfigKey) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingKey(key))
}

impl Grimm {
    /// Validates `config` and builds the facade.
    ///
    /// Layouts and partials are indexed here, once; the Socket.IO server is
    /// created but not yet attached to any listener.
    pub async fn new(config: GrimmConfig) -> Result<Self, StartupError> {
        validate(Some(&config))?;

        let root = std::path::absolute(required(config.root, ConfigKey::Root)?)?;
        let templating = required(config.templating, ConfigKey::Templating)?;
        let sockets = required(config.sockets, ConfigKey::Sockets)?.listen();

        let suffix = format!(".{}", templating.extension());
        let views = root.join("views");
        let layouts = FileIndex::scan(views.join("layouts"), |name| name.ends_with(&suffix)).await;
        let partials = FileIndex::scan(views.join("partials"), |name| name.ends_with(&suffix)).await;

        let logger = Logger::from_spec(config.logger.as_ref())?;
        let loader =
            BundleLoader::new(root.join("bundles"), config.bundles).with_order(config.bundle_order);

        info!(
            "Indexed {} layouts and {} partials under {}",
            layouts.len(),
            partials.len(),
            views.display()
        );

        Ok(Self {
            app: required(config.app, ConfigKey::App)?,
            engine: required(config.engine, ConfigKey::Engine)?,
            templating,
            logger,
            environment: required(config.env, ConfigKey::Env)?,
            root,
            server: required(config.server, ConfigKey::Server)?,
            sockets,
            layouts,
            partials,
            loader,
            privileges: config
                .privileges
                .unwrap_or_else(|| Arc::new(SystemPrivileges)),
        })
    }

    /// Serves `dir` under `prefix` when it exists.
    pub async fn register_public(&self, prefix: &str, dir: &Path) -> Discovered<PathBuf> {
        register_public(self, prefix, dir).await
    }

    /// Installs the view cache flag, points the templating engine at
    /// `<root>/views` and registers every partial.
    pub fn initialize(&self) -> Result<(), StartupError> {
        if !self.environment.is_dev() {
            self.use_middleware(Middleware::layer(|mut req: Request, next: Next| async move {
                req.extensions_mut().insert(ViewCache);
                next.run(req).await
            }));
        }

        let views = self.root.join("views");
        self.set("views", Value::String(views.to_string_lossy().into_owned()));
        self.templating.set_view_root(&views);

        for (name, path) in self.partials.iter() {
            self.templating.register_partial(name, path)?;
        }
        Ok(())
    }

    /// Loads every bundle under `<root>/bundles`.
    pub async fn load_bundles(self: &Arc<Self>) -> Result<LoadReport, StartupError> {
        let ctx: Arc<dyn Context> = self.clone();
        Ok(self.loader.load_all(ctx).await?)
    }

    /// Assembles the router, binds the configured address, drops privileges
    /// and starts serving.
    ///
    /// Nothing is bound if the registered routes conflict. Nothing is served
    /// if the privilege drop fails; the bound listener is closed before
    /// returning.
    pub async fn listen(&self) -> Result<ServerHandle, StartupError> {
        let mut router = self.app.router()?;
        if let Some((layer, _)) = &self.sockets {
            router = router.layer(layer.clone());
        }

        let web = &self.environment.web;
        let listener = self.server.bind(web.host.as_deref(), web.port).await?;
        let local_addr = listener.local_addr()?;
        self.logger.info(format!(
            "(http) Listening on {}:{}",
            self.environment.display_host(),
            local_addr.port()
        ));

        let before = self.privileges.current();
        let after = match self.privileges.drop_to(self.environment.permissions.as_ref()) {
            Ok(identity) => identity,
            Err(e) => {
                drop(listener);
                self.logger.error(format!("(perms) {}", e));
                self.logger
                    .fatal("(perms) Cowardly refusing to keep the process alive as root.");
                return Err(StartupError::PrivilegeDrop(e));
            }
        };
        self.logger.info(format!("(perms) Old {}", before));
        self.logger.info(format!("(perms) New {}", after));

        Ok(self.server.serve(listener, router)?)
    }

    /// Root public directory, views, bundles, then the listener.
    pub async fn start(self: &Arc<Self>) -> Result<ServerHandle, StartupError> {
        self.register_public("/", &self.root.join("public")).await;
        self.initialize()?;
        self.load_bundles().await?;
        self.listen().await
    }
}

impl Context for Grimm {
    fn app(&self) -> &Arc<dyn Application> {
        &self.app
    }

    fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    fn templating(&self) -> &Arc<dyn TemplateEngine> {
        &self.templating
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn layouts(&self) -> &FileIndex {
        &self.layouts
    }

    fn partials(&self) -> &FileIndex {
        &self.partials
    }

    fn sockets(&self) -> Option<&SocketIo> {
        self.sockets.as_ref().map(|(_, io)| io)
    }
}

impl fmt::Display for Grimm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Grimm Framework (HMVC)")
    }
}

//! The configuration record and its validator.

use crate::app::HttpApp;
use crate::engine::StaticEngine;
use crate::privileges::PrivilegeDrop;
use crate::server::HttpServer;
use crate::sockets::SocketIoFactory;
use crate::views::HandlebarsViews;
use bundle_system::{BundleSources, LoadOrder};
use grimm_core::{
    Application, Capability, ConfigError, ConfigKey, Engine, Environment, LoggerSpec,
    TemplateEngine,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything `Grimm::new` needs.
///
/// The `Option` fields listed in [`ConfigKey::REQUIRED`] must be present;
/// the rest fall back to defaults.
#[derive(Clone, Default)]
pub struct GrimmConfig {
    pub app: Option<Arc<dyn Application>>,
    pub engine: Option<Arc<dyn Engine>>,
    pub env: Option<Environment>,
    pub root: Option<PathBuf>,
    pub server: Option<HttpServer>,
    pub sockets: Option<SocketIoFactory>,
    pub templating: Option<Arc<dyn TemplateEngine>>,
    /// Console logger when absent
    pub logger: Option<LoggerSpec>,
    /// The real process identity when absent
    pub privileges: Option<Arc<dyn PrivilegeDrop>>,
    pub bundles: BundleSources,
    pub bundle_order: LoadOrder,
}

impl GrimmConfig {
    /// A complete record using the stock axum / handlebars / socketioxide
    /// stack.
    pub fn standard(root: impl Into<PathBuf>, env: Environment) -> Self {
        Self {
            app: Some(Arc::new(HttpApp::new())),
            engine: Some(Arc::new(StaticEngine)),
            env: Some(env),
            root: Some(root.into()),
            server: Some(HttpServer::default()),
            sockets: Some(SocketIoFactory::default()),
            templating: Some(Arc::new(HandlebarsViews::new())),
            ..Self::default()
        }
    }

    pub fn with_logger(mut self, logger: LoggerSpec) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_privileges(mut self, privileges: impl PrivilegeDrop + 'static) -> Self {
        self.privileges = Some(Arc::new(privileges));
        self
    }

    pub fn with_bundles(mut self, bundles: BundleSources) -> Self {
        self.bundles = bundles;
        self
    }

    pub fn with_bundle_order(mut self, order: LoadOrder) -> Self {
        self.bundle_order = order;
        self
    }

    fn has(&self, key: ConfigKey) -> bool {
        match key {
            ConfigKey::App => self.app.is_some(),
            ConfigKey::Engine => self.engine.is_some(),
            ConfigKey::Env => self.env.as_ref().is_some_and(|env| !env.env.is_empty()),
            ConfigKey::Root => self
                .root
                .as_ref()
                .is_some_and(|root| !root.as_os_str().is_empty()),
            ConfigKey::Server => self.server.is_some(),
            ConfigKey::Sockets => self.sockets.is_some(),
            ConfigKey::Templating => self.templating.is_some(),
        }
    }
}

impl fmt::Debug for GrimmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrimmConfig")
            .field("app", &self.app.is_some())
            .field("engine", &self.engine.is_some())
            .field("env", &self.env)
            .field("root", &self.root)
            .field("server", &self.server)
            .field("sockets", &self.sockets)
            .field("templating", &self.templating.is_some())
            .field("logger", &self.logger)
            .field("privileges", &self.privileges.is_some())
            .field("bundles", &self.bundles)
            .field("bundle_order", &self.bundle_order)
            .finish()
    }
}

/// Checks that `config` can build a facade. Pure inspection, no I/O.
///
/// Keys are checked in [`ConfigKey::REQUIRED`] order, then the application
/// handle's capabilities, then the logger.
pub fn validate(config: Option<&GrimmConfig>) -> Result<(), ConfigError> {
    let config = config.ok_or(ConfigError::MissingConfig)?;

    if let Some(key) = ConfigKey::REQUIRED.into_iter().find(|key| !config.has(*key)) {
        return Err(ConfigError::MissingKey(key));
    }

    if let Some(app) = &config.app {
        if let Some(capability) = Capability::REQUIRED
            .into_iter()
            .find(|capability| !app.supports(*capability))
        {
            return Err(ConfigError::MissingCapability(capability));
        }
    }

    if let Some(logger) = &config.logger {
        logger.resolve()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> GrimmConfig {
        GrimmConfig::standard("/srv/grimm", Environment::named("dev"))
    }

    #[test]
    fn test_complete_config_is_valid() {
        assert_eq!(validate(Some(&complete())), Ok(()));
    }

    #[test]
    fn test_missing_config() {
        assert_eq!(validate(None), Err(ConfigError::MissingConfig));
    }

    #[test]
    fn test_each_missing_key_is_named() {
        for key in ConfigKey::REQUIRED {
            let mut config = complete();
            match key {
                ConfigKey::App => config.app = None,
                ConfigKey::Engine => config.engine = None,
                ConfigKey::Env => config.env = None,
                ConfigKey::Root => config.root = None,
                ConfigKey::Server => config.server = None,
                ConfigKey::Sockets => config.sockets = None,
                ConfigKey::Templating => config.templating = None,
            }
            assert_eq!(validate(Some(&config)), Err(ConfigError::MissingKey(key)));
        }
    }

    #[test]
    fn test_first_missing_key_in_order_wins() {
        let mut config = complete();
        config.templating = None;
        config.engine = None;

        assert_eq!(
            validate(Some(&config)),
            Err(ConfigError::MissingKey(ConfigKey::Engine))
        );
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let mut config = complete();
        config.root = Some(PathBuf::new());
        assert_eq!(
            validate(Some(&config)),
            Err(ConfigError::MissingKey(ConfigKey::Root))
        );

        let mut config = complete();
        config.env = Some(Environment::named(""));
        assert_eq!(
            validate(Some(&config)),
            Err(ConfigError::MissingKey(ConfigKey::Env))
        );
    }

    #[test]
    fn test_restricted_application_is_rejected() {
        let mut config = complete();
        config.app = Some(Arc::new(HttpApp::new().without(Capability::Delete)));

        assert_eq!(
            validate(Some(&config)),
            Err(ConfigError::MissingCapability(Capability::Delete))
        );
    }

    #[test]
    fn test_unknown_logger_name() {
        let config = complete().with_logger(LoggerSpec::Named("syslog".into()));

        assert_eq!(
            validate(Some(&config)),
            Err(ConfigError::InvalidLogger("syslog".into()))
        );
    }
}

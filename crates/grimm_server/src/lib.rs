//! # Grimm Server
//!
//! The concrete stack behind the Grimm facade: an axum-backed
//! [`HttpApp`], `ServeDir` static mounts, handlebars views, a socketioxide
//! Socket.IO server and a socket2 listener that drops root privileges once
//! bound.
//!
//! ```rust,ignore
//! use grimm_server::{Grimm, GrimmConfig};
//!
//! let config = GrimmConfig::standard("/srv/site", Environment::named("production"));
//! let grimm = Arc::new(Grimm::new(config).await?);
//! let server = grimm.start().await?;
//! server.wait().await?;
//! ```

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod errors_bundle;
pub mod grimm;
pub mod privileges;
pub mod server;
pub mod sockets;
pub mod views;

pub use app::HttpApp;
pub use config::{validate, GrimmConfig};
pub use engine::StaticEngine;
pub use error::{StartupError, EXIT_PRIVILEGE_DROP};
pub use errors_bundle::ErrorPages;
pub use grimm::Grimm;
pub use privileges::{Identity, PrivilegeDrop, PrivilegeError, SystemPrivileges};
pub use server::{HttpServer, ServerHandle};
pub use sockets::SocketIoFactory;
pub use views::HandlebarsViews;

//! Plugin discovery and lifecycle management.
//!
//! Plugins advertise themselves at link time through the
//! [`PLUGIN_ENTRY_POINTS`] distributed slice, usually via [`declare_plugin!`]:
//!
//! ```ignore
//! fn load() -> ev_plugins::PluginResult<Box<dyn ev_plugins::Plugin>> {
//!     Ok(Box::new(ThermalPlugin::default()))
//! }
//!
//! ev_plugins::declare_plugin!(THERMAL, name = "thermal", loader = load);
//! ```
//!
//! Each entry names the extension-point group it belongs to; a
//! [`PluginManager`] only considers entries of [`ENTRY_POINT_GROUP`] unless
//! built with another group.

mod manager;

use std::any::Any;

pub use linkme;
pub use manager::{LoadFailure, LoadReport, PluginManager, PluginSpec};

use linkme::distributed_slice;
use thiserror::Error;

/// Extension-point group scanned by default.
pub const ENTRY_POINT_GROUP: &str = "ev_simulation.plugins";

pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin not found: {name}")]
    NotFound { name: String },

    #[error("Plugin '{name}' failed to load: {message}")]
    Load { name: String, message: String },
}

/// A loaded capability provider.
pub trait Plugin: Any + Send + Sync {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Resolves a plugin's exported symbol into a live instance.
pub type PluginLoader = fn() -> PluginResult<Box<dyn Plugin>>;

/// A link-time advertisement of one plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginEntryPoint {
    pub group: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    /// Module path of the declaring crate.
    pub module: &'static str,
    /// Name of the exported loader, if any.
    pub symbol: Option<&'static str>,
    pub loader: PluginLoader,
}

/// Every plugin entry point linked into the binary.
#[distributed_slice]
pub static PLUGIN_ENTRY_POINTS: [PluginEntryPoint];

/// Register a plugin loader under [`ENTRY_POINT_GROUP`].
///
/// The version defaults to the declaring crate's package version.
#[macro_export]
macro_rules! declare_plugin {
    ($ident:ident, name = $name:expr, loader = $loader:path $(,)?) => {
        $crate::declare_plugin!($ident, name = $name, version = env!("CARGO_PKG_VERSION"), loader = $loader);
    };
    ($ident:ident, name = $name:expr, version = $version:expr, loader = $loader:path $(,)?) => {
        #[$crate::linkme::distributed_slice($crate::PLUGIN_ENTRY_POINTS)]
        #[linkme(crate = $crate::linkme)]
        static $ident: $crate::PluginEntryPoint = $crate::PluginEntryPoint {
            group: $crate::ENTRY_POINT_GROUP,
            name: $name,
            version: $version,
            module: module_path!(),
            symbol: Some(stringify!($loader)),
            loader: $loader,
        };
    };
}

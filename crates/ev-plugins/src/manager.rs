//! Plugin lifecycle: discover, load, unload.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::{
    ENTRY_POINT_GROUP, PLUGIN_ENTRY_POINTS, Plugin, PluginEntryPoint, PluginError, PluginResult,
};

/// Metadata of a discovered plugin. Discovery never loads anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginSpec {
    pub name: &'static str,
    pub version: &'static str,
    pub module: &'static str,
    pub symbol: Option<&'static str>,
}

impl From<&PluginEntryPoint> for PluginSpec {
    fn from(entry: &PluginEntryPoint) -> Self {
        Self {
            name: entry.name,
            version: entry.version,
            module: entry.module,
            symbol: entry.symbol,
        }
    }
}

#[derive(Debug)]
pub struct LoadFailure {
    pub name: String,
    pub error: PluginError,
}

/// Outcome of [`PluginManager::load`]. Partial success is expected.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct PluginManager {
    group: &'static str,
    entries: Cow<'static, [PluginEntryPoint]>,
    loaded: BTreeMap<String, Box<dyn Plugin>>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    /// Manager over every entry point linked into the binary.
    pub fn new() -> Self {
        Self::with_group(ENTRY_POINT_GROUP)
    }

    /// Manager over linked entry points of another extension-point group.
    pub fn with_group(group: &'static str) -> Self {
        Self {
            group,
            entries: Cow::Borrowed(&PLUGIN_ENTRY_POINTS[..]),
            loaded: BTreeMap::new(),
        }
    }

    /// Manager over an explicit entry list instead of the linked slice.
    pub fn from_entry_points(entries: Vec<PluginEntryPoint>) -> Self {
        Self {
            group: ENTRY_POINT_GROUP,
            entries: Cow::Owned(entries),
            loaded: BTreeMap::new(),
        }
    }

    pub fn group(&self) -> &'static str {
        self.group
    }

    fn entries(&self) -> impl Iterator<Item = &PluginEntryPoint> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.group == self.group)
    }

    pub fn discover(&self) -> impl Iterator<Item = PluginSpec> + '_ {
        self.entries().map(PluginSpec::from)
    }

    /// Resolve every discovered plugin. One plugin failing does not stop the rest.
    pub fn load(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        let mut resolved = Vec::new();

        for entry in self.entries() {
            match (entry.loader)() {
                Ok(plugin) => {
                    tracing::info!(plugin = entry.name, version = entry.version, "loaded plugin");
                    resolved.push((entry.name.to_string(), plugin));
                }
                Err(error) => {
                    tracing::error!(
                        plugin = entry.name,
                        module = entry.module,
                        %error,
                        "failed to load plugin"
                    );
                    report.failures.push(LoadFailure {
                        name: entry.name.to_string(),
                        error,
                    });
                }
            }
        }

        for (name, plugin) in resolved {
            if self.loaded.insert(name.clone(), plugin).is_some() {
                tracing::warn!(plugin = %name, "replaced previously loaded plugin");
            }
            report.loaded.push(name);
        }
        report
    }

    /// Drop every loaded plugin. Safe to call repeatedly.
    pub fn unload(&mut self) {
        if !self.loaded.is_empty() {
            tracing::debug!(count = self.loaded.len(), "unloading plugins");
        }
        self.loaded.clear();
    }

    pub fn get(&self, name: &str) -> PluginResult<&dyn Plugin> {
        self.loaded
            .get(name)
            .map(|plugin| plugin.as_ref())
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_string(),
            })
    }

    /// Typed access to a loaded plugin.
    pub fn get_as<T: Plugin>(&self, name: &str) -> PluginResult<&T> {
        self.get(name)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    pub fn loaded_names(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("group", &self.group)
            .field("entries", &self.entries.len())
            .field("loaded", &self.loaded.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Echo;

    impl Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn load_echo() -> PluginResult<Box<dyn Plugin>> {
        Ok(Box::new(Echo))
    }

    fn load_broken() -> PluginResult<Box<dyn Plugin>> {
        Err(PluginError::Load {
            name: "broken".to_string(),
            message: "missing symbol".to_string(),
        })
    }

    fn entry(group: &'static str, name: &'static str, loader: crate::PluginLoader) -> PluginEntryPoint {
        PluginEntryPoint {
            group,
            name,
            version: "0.1.0",
            module: module_path!(),
            symbol: Some("load"),
            loader,
        }
    }

    #[test]
    fn discovery_filters_by_group_without_loading() {
        let manager = PluginManager::from_entry_points(vec![
            entry(ENTRY_POINT_GROUP, "echo", load_echo),
            entry("other.group", "foreign", load_echo),
        ]);

        let specs: Vec<_> = manager.discover().collect();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
        assert_eq!(specs[0].module, module_path!());
        assert!(!manager.is_loaded("echo"));
    }

    #[test]
    fn failing_plugin_does_not_block_others() {
        let mut manager = PluginManager::from_entry_points(vec![
            entry(ENTRY_POINT_GROUP, "broken", load_broken),
            entry(ENTRY_POINT_GROUP, "echo", load_echo),
        ]);

        let report = manager.load();
        assert_eq!(report.loaded, vec!["echo"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "broken");
        assert!(!report.is_complete());

        assert_eq!(manager.get("echo").unwrap().name(), "echo");
        assert!(manager.get_as::<Echo>("echo").is_ok());
        assert!(matches!(
            manager.get("broken"),
            Err(PluginError::NotFound { .. })
        ));
    }

    #[test]
    fn unload_is_idempotent() {
        let mut manager =
            PluginManager::from_entry_points(vec![entry(ENTRY_POINT_GROUP, "echo", load_echo)]);
        manager.load();
        assert_eq!(manager.loaded_names().collect::<Vec<_>>(), ["echo"]);

        manager.unload();
        manager.unload();
        assert!(manager.get("echo").is_err());
    }
}

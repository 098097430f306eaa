//! Plugins advertised through the link-time slice.

use std::any::Any;

use ev_plugins::{Plugin, PluginError, PluginManager, PluginResult, declare_plugin};

#[derive(Default)]
struct CellAgingPlugin;

impl Plugin for CellAgingPlugin {
    fn name(&self) -> &str {
        "cell_aging"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn load_cell_aging() -> PluginResult<Box<dyn Plugin>> {
    Ok(Box::new(CellAgingPlugin))
}

fn load_vendor_bridge() -> PluginResult<Box<dyn Plugin>> {
    Err(PluginError::Load {
        name: "vendor_bridge".to_string(),
        message: "shared library not available".to_string(),
    })
}

declare_plugin!(CELL_AGING, name = "cell_aging", loader = load_cell_aging);
declare_plugin!(
    VENDOR_BRIDGE,
    name = "vendor_bridge",
    version = "2.0.0",
    loader = load_vendor_bridge,
);

#[test]
fn linked_plugins_are_discovered() {
    let manager = PluginManager::new();
    let mut names: Vec<_> = manager.discover().map(|spec| spec.name).collect();
    names.sort();
    assert_eq!(names, vec!["cell_aging", "vendor_bridge"]);

    let aging = manager
        .discover()
        .find(|spec| spec.name == "cell_aging")
        .unwrap();
    assert_eq!(aging.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(aging.symbol, Some("load_cell_aging"));
    assert!(aging.module.contains("linked_entry_points"));
}

#[test]
fn linked_load_tolerates_faulty_plugin() {
    let mut manager = PluginManager::new();
    let report = manager.load();

    assert_eq!(report.loaded, vec!["cell_aging"]);
    assert_eq!(report.failures.len(), 1);
    assert!(manager.get_as::<CellAgingPlugin>("cell_aging").is_ok());

    manager.unload();
    assert!(matches!(
        manager.get("cell_aging"),
        Err(PluginError::NotFound { .. })
    ));
}

#[test]
fn other_groups_see_nothing() {
    let manager = PluginManager::with_group("some.other.group");
    assert_eq!(manager.discover().count(), 0);
}

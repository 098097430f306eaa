//! Registries pre-populated with the capabilities shipped in this workspace.

use ev_core::RegistryResult;
use ev_io::{
    CsvExporter, DatExporter, DatImporter, ExporterRegistry, ImporterRegistry, Mdf4Importer,
};
use ev_sim::{
    AmbientModel, BatteryPackModel, DriveCycleModel, FixedStepSolver, ModelRegistry,
    SolverRegistry,
};

/// One registry per capability kind.
pub struct BuiltinRegistries {
    pub models: ModelRegistry,
    pub solvers: SolverRegistry,
    pub importers: ImporterRegistry,
    pub exporters: ExporterRegistry,
}

/// Fresh registries holding the built-in models, solver, importers and exporters.
///
/// Default-constructed registries stay empty; callers opt in through this.
pub fn builtin_registries() -> RegistryResult<BuiltinRegistries> {
    let mut models = ModelRegistry::new();
    models.register(BatteryPackModel::NAME, BatteryPackModel::default)?;
    models.register(AmbientModel::NAME, AmbientModel::default)?;
    models.register(DriveCycleModel::NAME, DriveCycleModel::default)?;

    let mut solvers = SolverRegistry::new();
    solvers.register(FixedStepSolver::NAME, FixedStepSolver::default)?;

    let mut importers = ImporterRegistry::new();
    importers.register("dat", DatImporter::default)?;
    importers.register("mdf4", Mdf4Importer::default)?;

    let mut exporters = ExporterRegistry::new();
    exporters.register("dat", DatExporter::default)?;
    exporters.register("csv", CsvExporter::default)?;

    Ok(BuiltinRegistries {
        models,
        solvers,
        importers,
        exporters,
    })
}

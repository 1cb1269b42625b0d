pub mod check;
pub mod eval;
pub mod list;
pub mod packages;
pub mod show;
pub mod vars;

use std::path::Path;

use ax_core::{ArticyDatabase, ArticyId, DatabaseConfig, DirectoryArchive, ObjectRef, ProjectExport};

/// Read the export rooted at `dir`.
fn load_export(dir: &Path) -> Result<ProjectExport, String> {
    let archive = DirectoryArchive::open(dir)
        .map_err(|e| format!("no export in '{}': {e}", dir.display()))?;
    let export = ProjectExport::load(&archive).map_err(|e| e.to_string())?;
    tracing::debug!(
        dir = %dir.display(),
        packages = export.packages.len(),
        scripts = export.scripts.len(),
        "loaded export"
    );
    Ok(export)
}

/// A database with every package loaded, for inspection.
fn inspection_database(export: &ProjectExport) -> ArticyDatabase {
    let config = DatabaseConfig::default().with_load_default_packages(false);
    let mut database = ArticyDatabase::new(export.packages.clone(), config);
    database.set_type_system(export.types.clone());
    database.load_all_packages(false);
    database
}

/// Resolve an object from a `<id>_<clone>` handle, an id, or a technical name.
fn find_object(database: &ArticyDatabase, reference: &str) -> Option<ObjectRef> {
    if let Some(object) = database.get_object_from_string_representation(reference) {
        return Some(object);
    }
    if let Some(object) = reference
        .parse::<ArticyId>()
        .ok()
        .and_then(|id| database.get_object(id, 0))
    {
        return Some(object);
    }
    database.get_object_by_name(reference, 0)
}

/// Shorten `text` to at most `max` characters.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// `"s"` unless `n` is one.
fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

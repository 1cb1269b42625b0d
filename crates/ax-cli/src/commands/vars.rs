use std::path::Path;

use ax_expresso::GlobalVariables;
use comfy_table::{ContentArrangement, Table};

pub fn run(dir: &Path, json: bool) -> Result<(), String> {
    let export = super::load_export(dir)?;
    let variables =
        GlobalVariables::from_definitions(&export.global_variables).map_err(|e| e.to_string())?;
    let snapshot = variables.snapshot();

    if json {
        let text = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| format!("serialization failed: {e}"))?;
        println!("{text}");
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("  No global variables found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Variable", "Type", "Value", "Description"]);

    for var in &snapshot {
        let description = if var.description.is_empty() {
            "-".to_string()
        } else {
            super::truncate(&var.description, 60)
        };
        table.add_row(vec![
            var.name.clone(),
            var.kind.to_string(),
            var.value.to_string(),
            description,
        ]);
    }

    println!("{table}");
    println!();
    let namespaces = variables.namespace_names().count();
    println!(
        "  {} variable{} in {} namespace{}",
        snapshot.len(),
        super::plural(snapshot.len()),
        namespaces,
        super::plural(namespaces)
    );

    Ok(())
}

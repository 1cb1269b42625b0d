use std::path::Path;

use comfy_table::{ContentArrangement, Table};

pub fn run(dir: &Path) -> Result<(), String> {
    let export = super::load_export(dir)?;

    if export.packages.is_empty() {
        println!("  No packages found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Id", "Default", "Objects", "Description"]);

    for package in &export.packages {
        let description = if package.description.is_empty() {
            "-".to_string()
        } else {
            super::truncate(&package.description, 60)
        };
        table.add_row(vec![
            package.name.clone(),
            package.id.to_hex(),
            if package.is_default { "yes" } else { "no" }.to_string(),
            package.objects.len().to_string(),
            description,
        ]);
    }

    println!("{table}");
    println!();
    if !export.project_name.is_empty() {
        println!("  Project '{}'", export.project_name);
    }
    println!(
        "  {} package{}",
        export.packages.len(),
        super::plural(export.packages.len())
    );

    Ok(())
}

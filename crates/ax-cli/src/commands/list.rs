use std::path::Path;

use comfy_table::{ContentArrangement, Table};

pub fn run(dir: &Path, kind: Option<&str>, package: Option<&str>) -> Result<(), String> {
    let export = super::load_export(dir)?;

    if let Some(name) = package.filter(|name| !export.packages.iter().any(|p| p.name == *name)) {
        return Err(format!("package not found: \"{name}\""));
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Technical name", "Type", "Package"]);

    let mut count = 0;
    for pkg in &export.packages {
        if package.is_some_and(|name| name != pkg.name) {
            continue;
        }
        for object in &pkg.objects {
            if kind.is_some_and(|kind| !export.types.is_a(&object.type_name, kind)) {
                continue;
            }
            let name = if object.technical_name.is_empty() {
                "-"
            } else {
                object.technical_name.as_str()
            };
            table.add_row(vec![
                object.id.to_hex().as_str(),
                name,
                object.type_name.as_str(),
                pkg.name.as_str(),
            ]);
            count += 1;
        }
    }

    if count == 0 {
        println!("  No objects found.");
        return Ok(());
    }

    println!("{table}");
    println!();
    println!("  {count} object{}", super::plural(count));

    Ok(())
}

use std::path::Path;

use ax_core::{PropertyBag, PropertyValue, ScriptKind};
use colored::Colorize;

pub fn run(dir: &Path, reference: &str) -> Result<(), String> {
    let export = super::load_export(dir)?;
    let database = super::inspection_database(&export);

    let object = super::find_object(&database, reference)
        .ok_or_else(|| format!("object not found: \"{reference}\""))?;
    let object = object.borrow();

    let name = if object.technical_name.is_empty() {
        object.id.to_hex()
    } else {
        object.technical_name.clone()
    };
    println!("  {} [{}]", name.bold(), object.type_name.dimmed());
    println!();

    println!("  id:       {}", object.id.to_hex());
    println!("  handle:   {}", object.handle());
    if !object.parent.is_null() {
        let parent = database
            .get_object(object.parent, 0)
            .map(|p| p.borrow().technical_name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| object.parent.to_hex());
        println!("  parent:   {parent}");
    }
    if !object.children.is_empty() {
        println!("  children: {}", object.children.len());
    }
    let packages: Vec<&str> = export
        .packages
        .iter()
        .filter(|p| p.contains_id(object.id))
        .map(|p| p.name.as_str())
        .collect();
    if !packages.is_empty() {
        println!("  package:  {}", packages.join(", "));
    }

    if !object.properties.is_empty() {
        println!();
        println!("  {}", "Properties:".bold());
        print_properties(&object.properties, 2);
    }

    let scripts: Vec<_> = export
        .scripts
        .iter()
        .filter(|s| s.owner == object.id)
        .collect();
    if !scripts.is_empty() {
        println!();
        println!("  {}", "Scripts:".bold());
        for script in scripts {
            let kind = match script.kind {
                ScriptKind::Condition => "condition",
                ScriptKind::Instruction => "instruction",
            };
            println!("    {:<12} {}", kind.dimmed(), script.text);
        }
    }

    Ok(())
}

fn print_properties(bag: &PropertyBag, depth: usize) {
    let indent = "  ".repeat(depth);
    for (name, value) in bag.iter() {
        match value {
            PropertyValue::Feature(inner) => {
                println!("{indent}{name}:");
                print_properties(inner, depth + 1);
            }
            other => println!("{indent}{name}: {other}"),
        }
    }
}

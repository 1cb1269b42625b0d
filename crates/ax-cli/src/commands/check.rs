use std::path::Path;

use ax_core::ScriptKind;
use ax_expresso::{Compiler, GlobalVariables};
use ax_script::diagnostics::render_diagnostics;

pub fn run(dir: &Path) -> Result<(), String> {
    let export = super::load_export(dir)?;
    let variables =
        GlobalVariables::from_definitions(&export.global_variables).map_err(|e| e.to_string())?;
    let compiler = Compiler::with_variables(&variables);

    let mut failed = 0;
    for script in &export.scripts {
        if let Err(e) = compiler.check(script.kind, &script.text) {
            failed += 1;
            let kind = match script.kind {
                ScriptKind::Condition => "condition",
                ScriptKind::Instruction => "instruction",
            };
            let filename = format!("{} {} ({})", script.package, script.owner.to_hex(), kind);
            eprint!("{}", render_diagnostics(&script.text, &filename, &e.diagnostics()));
        }
    }

    let total = export.scripts.len();
    if failed > 0 {
        eprintln!("  {failed} of {total} fragment{} failed", super::plural(total));
        return Err("script check failed".into());
    }

    println!("  All checks passed for '{}'.", export.project_name);
    println!(
        "  {} package{}, {} fragment{}, {} namespace{}",
        export.packages.len(),
        super::plural(export.packages.len()),
        total,
        super::plural(total),
        export.global_variables.len(),
        super::plural(export.global_variables.len())
    );

    Ok(())
}

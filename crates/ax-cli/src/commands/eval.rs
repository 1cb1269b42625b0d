use std::path::Path;

use ax_core::ExpressoValue;
use ax_core::import::VariableKind;
use ax_expresso::{GvName, Runtime, RuntimeConfig};
use ax_script::diagnostics::render_diagnostics;
use colored::Colorize;

/// Flags for `ax eval`.
pub struct EvalOptions {
    pub instruction: bool,
    pub self_object: Option<String>,
    pub assignments: Vec<String>,
    pub seed: Option<u64>,
}

pub fn run(dir: &Path, script: &str, options: EvalOptions) -> Result<(), String> {
    let export = super::load_export(dir)?;
    let mut config = RuntimeConfig::default();
    if let Some(seed) = options.seed {
        config = config.with_seed(seed);
    }
    let mut runtime = Runtime::from_export(&export, config).map_err(|e| e.to_string())?;

    for assignment in &options.assignments {
        apply_assignment(&mut runtime, assignment)?;
    }

    if let Some(reference) = &options.self_object {
        let object = super::find_object(runtime.database(), reference)
            .ok_or_else(|| format!("object not found: \"{reference}\""))?;
        runtime.set_self(Some(object));
    }

    let before = runtime.variables().snapshot();
    let result = if options.instruction {
        runtime.execute_source(script)
    } else {
        runtime.evaluate_source(script)
    };

    let value = match result {
        Ok(value) => value,
        Err(e) => {
            eprint!("{}", render_diagnostics(script, "<script>", &e.diagnostics()));
            return Err(format!("script does not compile: {e}"));
        }
    };

    if !options.instruction {
        if value {
            println!("  {}", "true".green().bold());
        } else {
            println!("  {}", "false".red().bold());
        }
        return Ok(());
    }

    let after = runtime.variables().snapshot();
    let mut changed = 0;
    for (old, new) in before.iter().zip(&after) {
        if old.value != new.value {
            println!("  {}: {} -> {}", new.name.bold(), old.value, new.value);
            changed += 1;
        }
    }
    if changed == 0 {
        println!("  No variables changed.");
    }

    Ok(())
}

/// Apply one `Namespace.Variable=value` assignment.
fn apply_assignment(runtime: &mut Runtime, assignment: &str) -> Result<(), String> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("expected Namespace.Variable=value, got \"{assignment}\""))?;
    let name = name.trim().parse::<GvName>().map_err(|e| e.to_string())?;
    let kind = runtime
        .variables()
        .kind_of(&name)
        .ok_or_else(|| format!("unknown variable: \"{name}\""))?;

    let raw = raw.trim();
    let value = match kind {
        VariableKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => ExpressoValue::Bool(true),
            "false" => ExpressoValue::Bool(false),
            _ => return Err(format!("\"{raw}\" is not a boolean")),
        },
        VariableKind::Integer => raw
            .parse::<i64>()
            .map(ExpressoValue::Int)
            .map_err(|_| format!("\"{raw}\" is not an integer"))?,
        VariableKind::String => ExpressoValue::from(raw),
    };

    if runtime.variables_mut().set(&name, &value) {
        Ok(())
    } else {
        Err(format!("cannot set \"{name}\" to \"{raw}\""))
    }
}

//! A runtime session: one database, one variable set, one script registry.
//!
//! Shadow levels move the database and the variables together, so a flow
//! player can explore a branch and throw every change away in one step.

use ax_core::{ArticyDatabase, ObjectRef, ProjectExport, ScriptKind};

use crate::compiler::Compiler;
use crate::config::RuntimeConfig;
use crate::error::ExpressoResult;
use crate::scripts::{ExpressoScripts, UserMethodsProvider};
use crate::variables::GlobalVariables;

/// Database, global variables, and compiled scripts of one project.
#[derive(Debug)]
pub struct Runtime {
    database: ArticyDatabase,
    variables: GlobalVariables,
    scripts: ExpressoScripts,
}

impl Runtime {
    /// Assemble a runtime from parts.
    pub fn new(
        database: ArticyDatabase,
        variables: GlobalVariables,
        scripts: ExpressoScripts,
    ) -> Self {
        Self {
            database,
            variables,
            scripts,
        }
    }

    /// Build a runtime from an export and compile every script it carries.
    ///
    /// Fragments that fail to compile are logged and left unregistered;
    /// evaluating them later logs again and yields `false`.
    #[tracing::instrument(skip_all, fields(project = %export.project_name))]
    pub fn from_export(export: &ProjectExport, config: RuntimeConfig) -> ExpressoResult<Self> {
        let mut database = ArticyDatabase::new(export.packages.clone(), config.database.clone());
        database.set_type_system(export.types.clone());

        let mut variables = GlobalVariables::from_definitions(&export.global_variables)?;
        if config.log_variable_access {
            variables.enable_debug_logging();
        }

        let mut scripts =
            ExpressoScripts::new(config.seed).with_compiler(Compiler::with_variables(&variables));
        let mut failed = 0usize;
        for script in &export.scripts {
            if let Err(e) = scripts.register_source(script.kind, &script.text) {
                failed += 1;
                tracing::warn!(
                    package = %script.package,
                    owner = %script.owner,
                    text = %script.text,
                    error = %e,
                    "script fragment does not compile"
                );
            }
        }
        tracing::info!(
            conditions = scripts.condition_count(),
            instructions = scripts.instruction_count(),
            failed,
            "compiled scripts"
        );

        Ok(Self::new(database, variables, scripts))
    }

    /// The object database.
    pub fn database(&self) -> &ArticyDatabase {
        &self.database
    }

    /// The object database, for package loading.
    pub fn database_mut(&mut self) -> &mut ArticyDatabase {
        &mut self.database
    }

    /// The global variables.
    pub fn variables(&self) -> &GlobalVariables {
        &self.variables
    }

    /// The global variables, for direct writes.
    pub fn variables_mut(&mut self) -> &mut GlobalVariables {
        &mut self.variables
    }

    /// The script registry.
    pub fn scripts(&self) -> &ExpressoScripts {
        &self.scripts
    }

    /// The script registry, for registration and providers.
    pub fn scripts_mut(&mut self) -> &mut ExpressoScripts {
        &mut self.scripts
    }

    // -----------------------------------------------------------------------
    // Shadow levels
    // -----------------------------------------------------------------------

    /// Current shadow level.
    pub fn shadow_level(&self) -> u32 {
        self.variables.shadow_level()
    }

    /// Enter a shadow level on both the database and the variables.
    pub fn push_state(&mut self) {
        self.database.push_state();
        self.variables.push_state();
    }

    /// Leave the current shadow level, discarding its changes.
    pub fn pop_state(&mut self) {
        self.variables.pop_state();
        self.database.pop_state();
    }

    /// Run `f` one shadow level deeper and discard whatever it changed.
    pub fn explore<R>(&mut self, f: impl FnOnce(&mut Runtime) -> R) -> R {
        self.push_state();
        let result = f(self);
        self.pop_state();
        result
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Bind `self` for subsequent evaluations.
    pub fn set_self(&mut self, object: Option<ObjectRef>) {
        self.scripts.set_current_object(object);
    }

    /// Bind `speaker` for subsequent evaluations.
    pub fn set_speaker(&mut self, speaker: Option<ObjectRef>) {
        self.scripts.set_speaker(speaker);
    }

    /// Evaluate the condition registered under `hash`.
    pub fn evaluate(&mut self, hash: i32) -> bool {
        self.scripts
            .evaluate(hash, &self.database, &mut self.variables, None)
    }

    /// Execute the instruction registered under `hash`.
    pub fn execute(&mut self, hash: i32) -> bool {
        self.scripts
            .execute(hash, &self.database, &mut self.variables, None)
    }

    /// [`evaluate`](Self::evaluate) with an explicit method provider.
    pub fn evaluate_with(&mut self, hash: i32, methods: &mut dyn UserMethodsProvider) -> bool {
        self.scripts
            .evaluate(hash, &self.database, &mut self.variables, Some(methods))
    }

    /// [`execute`](Self::execute) with an explicit method provider.
    pub fn execute_with(&mut self, hash: i32, methods: &mut dyn UserMethodsProvider) -> bool {
        self.scripts
            .execute(hash, &self.database, &mut self.variables, Some(methods))
    }

    /// Compile, register, and evaluate a condition.
    pub fn evaluate_source(&mut self, text: &str) -> ExpressoResult<bool> {
        let hash = self.scripts.register_source(ScriptKind::Condition, text)?;
        Ok(self.evaluate(hash))
    }

    /// Compile, register, and execute an instruction.
    pub fn execute_source(&mut self, text: &str) -> ExpressoResult<bool> {
        let hash = self.scripts.register_source(ScriptKind::Instruction, text)?;
        Ok(self.execute(hash))
    }
}

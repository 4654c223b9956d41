//! Control-file assembly.
//!
//! Each section is composed independently in memory and terminated by a
//! blank line; the whole file is then written once. A short write is a fatal
//! I/O error, not something to recover from.

use std::path::PathBuf;
use tracing::info;

use dak_types::{
    ConfigurationError, DakResult, EvaluationMode, RunConfig, CONTROL_FILE, DRIVER_SCRIPT,
    PARAMS_FILE, PLACEHOLDER_SCRIPT, RESULTS_FILE,
};

use crate::method::MethodSpec;

/// Tabular history filename for fresh runs.
pub const TABULAR_FRESH: &str = "dakota_tabular_1.dat";

/// Tabular history filename for continuation runs.
pub const TABULAR_CONTINUATION: &str = "dakota_tabular_2.dat";

/// Tabular filename for the given restart policy. Fresh runs and
/// continuations stay distinguishable in downstream run-history analysis.
pub fn tabular_file_name(continuation: bool) -> &'static str {
    if continuation {
        TABULAR_CONTINUATION
    } else {
        TABULAR_FRESH
    }
}

/// Renders and writes the optimizer's control file.
///
/// Section order is fixed: header, strategy, method, variables, interface,
/// responses. The variable count comes from the loaded problem, the method
/// block from the supplied [`MethodSpec`].
pub struct ControlFile<'a> {
    config: &'a RunConfig,
    nx: usize,
    method: Option<&'a dyn MethodSpec>,
}

impl<'a> ControlFile<'a> {
    pub fn new(config: &'a RunConfig, nx: usize) -> Self {
        Self {
            config,
            nx,
            method: None,
        }
    }

    pub fn with_method(mut self, method: &'a dyn MethodSpec) -> Self {
        self.method = Some(method);
        self
    }

    /// Compose the full control file in memory.
    pub fn render(&self) -> DakResult<String> {
        let mut out = String::new();
        out.push_str(&self.header_section());
        out.push_str(&self.strategy_section());
        out.push_str(&self.method_section()?);
        out.push_str(&self.variables_section());
        out.push_str(&self.interface_section()?);
        out.push_str(&self.responses_section());
        Ok(out)
    }

    /// Render and write `dakota.in` into the output directory, returning the
    /// written path.
    pub fn write(&self) -> DakResult<PathBuf> {
        let content = self.render()?;
        let path = self.config.absolute_out_dir()?.join(CONTROL_FILE);
        info!(path = %path.display(), mode = ?self.config.mode, "writing control file");
        std::fs::write(&path, content)?;
        Ok(path)
    }

    fn header_section(&self) -> String {
        "# Autogenerated by daklink\n\n".to_string()
    }

    fn strategy_section(&self) -> String {
        let mut result = String::new();
        result.push_str("strategy,\n");
        result.push_str("        single_method\n");
        result.push_str("        tabular_graphics_data\n");
        result.push_str(&format!(
            "        tabular_graphics_file='{}'\n\n",
            tabular_file_name(self.config.is_continuation())
        ));
        result
    }

    fn method_section(&self) -> DakResult<String> {
        let method = self.method.ok_or(ConfigurationError::MethodUnimplemented)?;
        Ok(method.render())
    }

    fn variables_section(&self) -> String {
        let mut result = String::new();
        result.push_str("variables,\n");
        result.push_str(&format!("        continuous_design = {}\n", self.nx));
        result.push('\n');
        result
    }

    fn interface_section(&self) -> DakResult<String> {
        let mut result = String::new();
        match self.config.mode {
            EvaluationMode::DirectDriver => {
                result.push_str("interface,\n");
                result.push_str("        fork\n");
                result.push_str("          asynchronous\n");
                result.push_str(&format!(
                    "          evaluation_concurrency = {}\n",
                    self.config.cores
                ));
                result.push_str(&format!(
                    "          analysis_driver = \"sh {DRIVER_SCRIPT}\"\n"
                ));
                result.push_str(&format!("          parameters_file = '{PARAMS_FILE}'\n"));
                result.push_str(&format!("          results_file    = '{RESULTS_FILE}'\n"));
                result.push_str("            file_tag\n");
                result.push('\n');
            }
            EvaluationMode::Watcher => {
                let out_dir = self.config.absolute_out_dir()?;
                let placeholder = out_dir.join(PLACEHOLDER_SCRIPT);
                let params = out_dir.join(PARAMS_FILE);
                let results = out_dir.join(RESULTS_FILE);

                result.push_str("interface,\n");
                result.push_str("        fork\n");
                result.push_str(&format!(
                    "          analysis_driver = 'sh {}'\n",
                    placeholder.display()
                ));
                result.push_str(&format!(
                    "          parameters_file = '{}'\n",
                    params.display()
                ));
                result.push_str(&format!(
                    "          results_file = '{}'\n",
                    results.display()
                ));
                result.push('\n');
            }
        }
        Ok(result)
    }

    fn responses_section(&self) -> String {
        let mut result = String::new();
        result.push_str("responses,\n");
        result.push_str("        num_objective_functions = 1\n");
        result.push_str("        no_gradients\n");
        result.push_str("        no_hessians\n\n");
        result
    }
}

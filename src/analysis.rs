use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::assembly::cell_file;
use crate::error::{AssemblyError, Result};

/// Keyword arguments for pyNeuroML's current-vs-frequency analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfCurveRequest {
    #[serde(rename = "nml2_file")]
    pub model_file: String,
    pub cell_id: String,
    #[serde(rename = "custom_amps_nA")]
    pub amplitudes_na: Vec<f64>,
    pub temperature: String,
    pub pre_zero_pulse: f64,
    pub post_zero_pulse: f64,
    pub plot_voltage_traces: bool,
    pub plot_if: bool,
    pub plot_iv: bool,
    pub simulator: String,
    pub num_processors: u32,
}

impl IfCurveRequest {
    pub fn for_cell(cell_name: &str) -> Self {
        IfCurveRequest {
            model_file: cell_file(cell_name),
            cell_id: cell_name.to_string(),
            amplitudes_na: (-2..=10).map(|i| f64::from(i) / 20.0).collect(),
            temperature: "34 degC".to_string(),
            pre_zero_pulse: 100.0,
            post_zero_pulse: 100.0,
            plot_voltage_traces: true,
            plot_if: true,
            plot_iv: true,
            simulator: "jNeuroML_NEURON".to_string(),
            num_processors: 10,
        }
    }
}

pub trait AnalysisRunner {
    fn run(&mut self, request: &IfCurveRequest) -> Result<()>;
}

const DRIVER: &str = "import json, sys
from pyneuroml.analysis import generate_current_vs_frequency_curve
generate_current_vs_frequency_curve(**json.load(sys.stdin))
";

/// Hands the request to a Python interpreter with pyNeuroML installed.
pub struct PythonRunner {
    pub interpreter: String,
}

impl Default for PythonRunner {
    fn default() -> Self {
        PythonRunner { interpreter: "python3".to_string() }
    }
}

impl AnalysisRunner for PythonRunner {
    fn run(&mut self, request: &IfCurveRequest) -> Result<()> {
        let payload = serde_json::to_vec(request)?;
        info!(
            cell = %request.cell_id,
            simulator = %request.simulator,
            "Generating current vs frequency curve"
        );
        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AssemblyError::Analysis(format!("could not start {}: {e}", self.interpreter))
            })?;
        {
            let stdin = child.stdin.as_mut().ok_or_else(|| {
                AssemblyError::Analysis("no stdin on analysis process".to_string())
            })?;
            stdin
                .write_all(&payload)
                .map_err(|e| AssemblyError::Analysis(format!("writing request: {e}")))?;
        }
        let status = child
            .wait()
            .map_err(|e| AssemblyError::Analysis(format!("waiting for analysis: {e}")))?;
        debug!(%status, "analysis finished");
        if !status.success() {
            return Err(AssemblyError::Analysis(format!(
                "{} exited with {status}",
                self.interpreter
            )));
        }
        Ok(())
    }
}

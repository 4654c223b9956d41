//! Parameter and results exchange files.
//!
//! One record set per evaluation: the optimizer writes the parameter file,
//! the bridge answers with the results file. Lines the bridge does not
//! interpret are carried through verbatim, in order.

use std::io::Write;
use std::path::{Path, PathBuf};

use dak_types::{DakResult, EvaluationError};

/// One variable record: numeric value then its label, as the optimizer
/// writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamVariable {
    pub value: f64,
    pub label: String,
}

/// A parsed parameter-exchange file.
///
/// Only the leading variable block is interpreted; everything after it
/// (function counts, active-set vector, derivative variables) is kept as an
/// uninterpreted trailer and re-emitted untouched on write.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsFile {
    pub variables: Vec<ParamVariable>,
    pub trailer: Vec<String>,
}

impl ParamsFile {
    /// Parse a parameter file: a `<n> variables` count line, `n` value/label
    /// lines, then the trailer.
    pub fn read(path: &Path) -> DakResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let display = || path.display().to_string();
        let mut lines = text.lines();

        let count_line = lines
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| EvaluationError::MalformedParams {
                path: display(),
                message: "missing variable count line".into(),
            })?;
        let count = parse_count(count_line, "variables").ok_or_else(|| {
            EvaluationError::MalformedParams {
                path: display(),
                message: format!("bad variable count line: '{}'", count_line.trim()),
            }
        })?;

        let mut variables = Vec::with_capacity(count);
        for _ in 0..count {
            let line = lines.next().ok_or_else(|| EvaluationError::MalformedParams {
                path: display(),
                message: format!("expected {count} variable lines"),
            })?;
            let mut fields = line.split_whitespace();
            let value: f64 = fields
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| EvaluationError::MalformedParams {
                    path: display(),
                    message: format!("bad variable line: '{}'", line.trim()),
                })?;
            let label = fields.next().unwrap_or_default().to_string();
            variables.push(ParamVariable { value, label });
        }

        let trailer = lines.map(str::to_string).collect();
        Ok(Self { variables, trailer })
    }

    /// Re-emit the file: count line, variable lines, trailer, in order.
    pub fn write(&self, path: &Path) -> DakResult<()> {
        let mut content = String::new();
        content.push_str(&format!("{:>42} variables\n", self.variables.len()));
        for var in &self.variables {
            content.push_str(&format!("{:>42.15e} {}\n", var.value, var.label));
        }
        for line in &self.trailer {
            content.push_str(line);
            content.push('\n');
        }
        atomic_write(path, content.as_bytes())?;
        Ok(())
    }

    /// Variable values in file order.
    pub fn values(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.value).collect()
    }
}

/// Results-exchange file: a single objective record `<value> f`.
pub struct ResultsFile;

impl ResultsFile {
    /// Write the objective. The write is staged through a sibling temp file
    /// and renamed, so a reader never observes a partial record.
    pub fn write(path: &Path, objective: f64) -> DakResult<()> {
        let content = format!("{objective:>24.16e} f\n");
        atomic_write(path, content.as_bytes())?;
        Ok(())
    }

    pub fn read(path: &Path) -> DakResult<f64> {
        let text = std::fs::read_to_string(path)?;
        let record = text.lines().find(|l| !l.trim().is_empty()).ok_or_else(|| {
            EvaluationError::MalformedResults {
                path: path.display().to_string(),
                message: "empty results file".into(),
            }
        })?;
        record
            .split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                EvaluationError::MalformedResults {
                    path: path.display().to_string(),
                    message: format!("bad objective record: '{}'", record.trim()),
                }
                .into()
            })
    }
}

fn parse_count(line: &str, keyword: &str) -> Option<usize> {
    let mut fields = line.split_whitespace();
    let count = fields.next()?.parse().ok()?;
    (fields.next() == Some(keyword)).then_some(count)
}

/// Write-then-rename so concurrent readers see either the old file or the
/// complete new one. The temp name is derived from the full target name,
/// keeping tagged siblings (`results.out.1`, `results.out.2`) distinct.
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

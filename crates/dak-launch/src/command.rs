//! Optimizer command-line assembly.

use std::path::{Path, PathBuf};

use dak_types::{DakResult, RunConfig, CONTROL_FILE};

/// Program used to fan the invocation out across nodes.
pub const MPI_LAUNCHER: &str = "mpirun";

/// The optimizer invocation for one run's restart policy.
///
/// Fresh runs use output suffix 1 and write `dakota1.rst`; continuation runs
/// use suffix 2, write `dakota2.rst`, and read from the supplied restart
/// file. All run-relative names resolve against the run directory the
/// process is launched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DakotaCommand {
    output_file: String,
    restart_write: String,
    restart_read: Option<PathBuf>,
}

impl DakotaCommand {
    pub fn new(config: &RunConfig) -> DakResult<Self> {
        let suffix = if config.is_continuation() { 2 } else { 1 };
        let restart_read = match &config.restart_file {
            Some(path) => Some(std::path::absolute(path)?),
            None => None,
        };
        Ok(Self {
            output_file: format!("dakota{suffix}.out"),
            restart_write: format!("dakota{suffix}.rst"),
            restart_read,
        })
    }

    /// Restart file this invocation writes.
    pub fn restart_write(&self) -> &str {
        &self.restart_write
    }

    /// Console output file this invocation writes.
    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    /// Arguments passed to the optimizer executable.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            CONTROL_FILE.to_string(),
            "-o".to_string(),
            self.output_file.clone(),
            "-write_restart".to_string(),
            self.restart_write.clone(),
        ];
        if let Some(restart) = &self.restart_read {
            args.push("-read_restart".to_string());
            args.push(restart.display().to_string());
        }
        args
    }

    /// Full program + argument list, wrapped in the parallel launcher when
    /// more than one node is requested. One node never touches the launcher.
    pub fn invocation(&self, exe: &Path, nodes: usize) -> (String, Vec<String>) {
        let exe = exe.display().to_string();
        if nodes > 1 {
            let mut args = vec!["-np".to_string(), nodes.to_string(), exe];
            args.extend(self.args());
            (MPI_LAUNCHER.to_string(), args)
        } else {
            (exe, self.args())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_config() -> RunConfig {
        RunConfig::new("demo", "/tmp/run1", vec![1.0, 2.0])
    }

    #[test]
    fn fresh_run_arguments() {
        let command = DakotaCommand::new(&fresh_config()).unwrap();
        assert_eq!(
            command.args(),
            vec![
                "-i",
                "dakota.in",
                "-o",
                "dakota1.out",
                "-write_restart",
                "dakota1.rst"
            ]
        );
    }

    #[test]
    fn continuation_reads_supplied_restart() {
        let config = fresh_config().with_restart_file("/tmp/prior/dakota1.rst");
        let command = DakotaCommand::new(&config).unwrap();
        let args = command.args();

        assert!(args.contains(&"dakota2.out".to_string()));
        assert_eq!(command.restart_write(), "dakota2.rst");
        assert_eq!(args[args.len() - 2], "-read_restart");
        assert_eq!(args[args.len() - 1], "/tmp/prior/dakota1.rst");
    }

    #[test]
    fn relative_restart_path_is_absolutized() {
        let config = fresh_config().with_restart_file("prior/dakota1.rst");
        let command = DakotaCommand::new(&config).unwrap();
        let read_path = command.args().last().cloned().unwrap();
        assert!(Path::new(&read_path).is_absolute());
        assert!(read_path.ends_with("dakota1.rst"));
    }

    #[test]
    fn fresh_run_never_reads_restart() {
        let command = DakotaCommand::new(&fresh_config()).unwrap();
        assert!(!command.args().iter().any(|a| a == "-read_restart"));
    }

    #[test]
    fn single_node_skips_parallel_launcher() {
        let command = DakotaCommand::new(&fresh_config()).unwrap();
        let (program, args) = command.invocation(Path::new("/opt/dakota/bin/dakota"), 1);

        assert_eq!(program, "/opt/dakota/bin/dakota");
        assert!(!args.iter().any(|a| a.contains("mpirun")));
        assert!(!args.iter().any(|a| a == "-np"));
    }

    #[test]
    fn multi_node_wraps_with_mpirun() {
        let command = DakotaCommand::new(&fresh_config()).unwrap();
        let (program, args) = command.invocation(Path::new("/opt/dakota/bin/dakota"), 4);

        assert_eq!(program, "mpirun");
        assert_eq!(&args[..3], &["-np", "4", "/opt/dakota/bin/dakota"]);
        assert!(args.contains(&"dakota.in".to_string()));
    }
}

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info, warn};
use shell_escape::escape;
use std::ffi::{OsStr, OsString};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitCode, ExitStatus};

/// Convert something to an ExitCode.
pub trait IntoExitCode {
    fn into_exit_code(self) -> ExitCode;
}

impl IntoExitCode for ExitStatus {
    /// Convert an ExitStatus to an ExitCode, keeping the child's exit code.
    fn into_exit_code(self) -> ExitCode {
        ExitCode::from(exit_code(&self))
    }
}

/// The exit code the wrapper reports for a child's status.
/// A child killed by a signal has no exit code and maps to 1.
pub fn exit_code(status: &ExitStatus) -> u8 {
    status.code().map_or(1, |code| code as u8)
}

/// A program invocation, described independently of how it is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCommand {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
}

impl PipelineCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        PipelineCommand {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    pub fn envs<K, V>(self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        vars.into_iter().fold(self, |cmd, (k, v)| cmd.env(k, v))
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// The command line, shell-escaped, for logs and dry runs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|a| escape(a.to_string_lossy()))
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Runs commands to completion and reports their exit status.
pub trait Runner {
    fn run(&mut self, cmd: &PipelineCommand) -> Result<ExitStatus>;
}

/// A spawned child process that is always waited on.
/// If the guard is dropped before `wait` is called, e.g. while unwinding from
/// an error, the drop blocks until the child exits so it is never left as a zombie.
pub struct ChildGuard {
    child: Option<Child>,
    description: String,
}

impl ChildGuard {
    pub fn spawn(cmd: &PipelineCommand) -> Result<ChildGuard> {
        let description = cmd.display();
        let child = cmd
            .to_command()
            .spawn()
            .with_context(|| format!("Failed to start {description}"))?;
        Ok(ChildGuard {
            child: Some(child),
            description,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn wait(mut self) -> Result<ExitStatus> {
        let mut child = self
            .child
            .take()
            .with_context(|| format!("{} was already waited on", self.description))?;
        child
            .wait()
            .with_context(|| format!("Failed waiting for {}", self.description))
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.wait() {
                Ok(status) => warn!("{} exited with {status} after an error", self.description),
                Err(err) => warn!("could not wait for {}: {err}", self.description),
            }
        }
    }
}

/// Runs commands as child processes with inherited stdio, so their output
/// streams straight through to the wrapper's output.
#[derive(Debug, Default)]
pub struct LocalRunner;

impl Runner for LocalRunner {
    fn run(&mut self, cmd: &PipelineCommand) -> Result<ExitStatus> {
        info!("running: {}", cmd.display());
        let child = ChildGuard::spawn(cmd)?;
        if let Some(pid) = child.id() {
            debug!("started pid {pid}: {}", cmd.program().to_string_lossy());
        }
        let status = child.wait()?;
        if status.success() {
            info!("{} finished", cmd.program().to_string_lossy());
        } else {
            warn!("{} failed: {status}", cmd.program().to_string_lossy());
        }
        Ok(status)
    }
}

/// Prints commands instead of running them, and reports success.
#[derive(Debug, Default)]
pub struct DryRunner {
    commands: Vec<String>,
}

impl DryRunner {
    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl Runner for DryRunner {
    fn run(&mut self, cmd: &PipelineCommand) -> Result<ExitStatus> {
        let line = cmd.display();
        println!("would run: {line}");
        self.commands.push(line);
        Ok(ExitStatus::from_raw(0))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_is_propagated() -> Result<()> {
        let status = LocalRunner.run(&PipelineCommand::new("sh").arg("-c").arg("exit 3"))?;
        assert!(!status.success());
        assert_eq!(exit_code(&status), 3);

        let status = LocalRunner.run(&PipelineCommand::new("sh").arg("-c").arg("exit 0"))?;
        assert_eq!(exit_code(&status), 0);
        Ok(())
    }

    #[test]
    fn test_signal_maps_to_failure() {
        // SIGKILL, no exit code
        let status = ExitStatus::from_raw(9);
        assert_eq!(status.code(), None);
        assert_eq!(exit_code(&status), 1);
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        let err = LocalRunner
            .run(&PipelineCommand::new("/nonexistent/bcbio_nextgen.py"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to start"), "{err}");
    }

    #[test]
    fn test_env_and_current_dir_reach_the_child() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cmd = PipelineCommand::new("sh")
            .arg("-c")
            .arg(r#"test "$TMPDIR" = /scratch/tmp && test "$(pwd -P)" = "$EXPECTED""#)
            .envs([("TMPDIR", "/scratch/tmp")])
            .env("EXPECTED", dir.path().canonicalize()?)
            .current_dir(dir.path());
        assert!(LocalRunner.run(&cmd)?.success());
        Ok(())
    }

    #[test]
    fn test_guard_waits_when_dropped() -> Result<()> {
        let guard = ChildGuard::spawn(&PipelineCommand::new("sh").arg("-c").arg("exit 0"))?;
        let pid = guard.id().unwrap();
        drop(guard);
        // The child was reaped, so its /proc entry is gone.
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
        Ok(())
    }

    #[test]
    fn test_display_escapes_arguments() {
        let cmd = PipelineCommand::new("bcbio_nextgen.py")
            .arg("/data/my project/bcbio_project.yaml")
            .arg("-n")
            .arg("16");
        assert_eq!(
            cmd.display(),
            "bcbio_nextgen.py '/data/my project/bcbio_project.yaml' -n 16"
        );
    }

    #[test]
    fn test_dry_runner_records_without_running() -> Result<()> {
        let mut runner = DryRunner::default();
        let status = runner.run(&PipelineCommand::new("/nonexistent/tool").arg("x"))?;
        assert!(status.success());
        assert_eq!(runner.commands(), ["/nonexistent/tool x"]);
        Ok(())
    }
}

//! Subprocess execution with captured output

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::{EnvContext, HarnessError, Result};
use crate::database::TestDatabase;

/// Exit code, stdout and stderr of one finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResult {
    returncode: i32,
    stdout: String,
    stderr: String,
}

impl CapturedResult {
    pub fn new(returncode: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            returncode,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit code; a child killed by signal `N` reports `-N`
    pub fn returncode(&self) -> i32 {
        self.returncode
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn success(&self) -> bool {
        self.returncode == 0
    }

    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    fn from_output(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::new(
            exit_code(status),
            String::from_utf8_lossy(stdout),
            String::from_utf8_lossy(stderr),
        )
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| -s))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Environment handed to the child
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EnvPolicy {
    /// The harness's own environment, unmodified
    #[default]
    Inherit,
    /// An empty environment
    Clear,
    /// The harness's environment plus these variables
    Extend(BTreeMap<String, String>),
    /// Exactly these variables
    Replace(BTreeMap<String, String>),
}

impl EnvPolicy {
    fn apply(&self, cmd: &mut Command) {
        match self {
            Self::Inherit => {}
            Self::Clear => {
                cmd.env_clear();
            }
            Self::Extend(vars) => {
                cmd.envs(vars);
            }
            Self::Replace(vars) => {
                cmd.env_clear().envs(vars);
            }
        }
    }

    /// The `PATH` the child will see
    fn path_var(&self) -> Option<OsString> {
        match self {
            Self::Inherit => std::env::var_os("PATH"),
            Self::Clear => None,
            Self::Extend(vars) => vars
                .get("PATH")
                .map(OsString::from)
                .or_else(|| std::env::var_os("PATH")),
            Self::Replace(vars) => vars.get("PATH").map(OsString::from),
        }
    }
}

/// Per-run knobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub env: EnvPolicy,
    /// Kill the child if it runs longer than this
    pub timeout: Option<Duration>,
    pub cwd: Option<PathBuf>,
}

impl RunOptions {
    #[must_use]
    pub fn env(mut self, env: EnvPolicy) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// `--root <root> --dbpath <dbpath>` for a materialized database
pub fn db_args(db: &TestDatabase) -> Vec<OsString> {
    vec![
        "--root".into(),
        db.root().as_os_str().to_owned(),
        "--dbpath".into(),
        db.db_path().as_os_str().to_owned(),
    ]
}

/// Runs one child at a time and waits for it
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    options: RunOptions,
}

impl ProcessRunner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run with this runner's default options
    pub fn run<S: AsRef<OsStr>>(&self, program: &Path, args: &[S]) -> Result<CapturedResult> {
        run(program, args, &self.options)
    }

    /// Run against a database, with `--root`/`--dbpath` ahead of `args`
    pub fn run_in<S: AsRef<OsStr>>(
        &self,
        db: &TestDatabase,
        program: &Path,
        args: &[S],
    ) -> Result<CapturedResult> {
        let mut argv = db_args(db);
        argv.extend(args.iter().map(|a| a.as_ref().to_owned()));
        run(program, &argv, &self.options)
    }
}

/// Spawn `program`, wait for it, and capture its exit code and output.
///
/// A non-zero exit is a normal result. Failing to start the program is a
/// [`HarnessError::Launch`], running past `options.timeout` is a
/// [`HarnessError::Timeout`] and the child is killed.
#[instrument(skip_all, fields(program = %program.display()))]
pub fn run<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    options: &RunOptions,
) -> Result<CapturedResult> {
    let resolved = resolve_program(program, options)?;

    let mut cmd = Command::new(&resolved);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    options.env.apply(&mut cmd);
    if let Some(dir) = &options.cwd {
        cmd.current_dir(dir);
    }

    debug!(
        argv = ?args.iter().map(|a| a.as_ref().to_string_lossy()).collect::<Vec<_>>(),
        "spawning"
    );
    let start = Instant::now();

    let result = match options.timeout {
        None => {
            let output = cmd.output().map_err(|source| HarnessError::Launch {
                program: program.to_path_buf(),
                source,
            })?;
            CapturedResult::from_output(output.status, &output.stdout, &output.stderr)
        }
        Some(timeout) => {
            // Own process group, so a timeout can take down helpers the tool forked
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                cmd.process_group(0);
            }
            let child = cmd.spawn().map_err(|source| HarnessError::Launch {
                program: program.to_path_buf(),
                source,
            })?;
            wait_with_timeout(child, program, timeout)?
        }
    };

    debug!(
        returncode = result.returncode(),
        elapsed = ?start.elapsed(),
        "child exited"
    );
    Ok(result)
}

/// Bare names are looked up on the `PATH` the child will get
fn resolve_program(program: &Path, options: &RunOptions) -> Result<PathBuf> {
    if program.components().count() != 1 || program.is_absolute() {
        return Ok(program.to_path_buf());
    }

    let cwd = match &options.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().env_context(|| "reading current directory")?,
    };
    which::which_in(program, options.env.path_var(), cwd).map_err(|e| HarnessError::Launch {
        program: program.to_path_buf(),
        source: io::Error::new(io::ErrorKind::NotFound, e.to_string()),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")))
        .env_context(|| "reading child output")
}

/// Kill the child's whole process group, falling back to the child alone
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use rustix::process::{Pid, Signal, kill_process_group};

    if let Err(e) = kill_process_group(Pid::from_child(child), Signal::KILL) {
        debug!(error = %e, "process group kill failed");
        // fails only if the child already exited
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn wait_with_timeout(mut child: Child, program: &Path, timeout: Duration) -> Result<CapturedResult> {
    // Read both pipes concurrently so a chatty child can't block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = child
        .wait_timeout(timeout)
        .env_context(|| format!("waiting for {}", program.display()))?;

    let Some(status) = status else {
        warn!(program = %program.display(), ?timeout, "child timed out, killing");
        kill_tree(&mut child);
        child
            .wait()
            .env_context(|| format!("reaping {}", program.display()))?;
        // A descendant that left the group can still hold the pipes open;
        // the readers are detached rather than joined.
        drop((stdout, stderr));
        return Err(HarnessError::Timeout {
            program: program.to_path_buf(),
            timeout,
        });
    };

    let out = join(stdout)?;
    let err = join(stderr)?;
    Ok(CapturedResult::from_output(status, &out, &err))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Result<CapturedResult> {
        run(Path::new("sh"), &["-c", script], &RunOptions::default())
    }

    #[test]
    fn test_captures_exit_code_and_streams() {
        let res = sh("echo out; echo err >&2; exit 3").unwrap();
        assert_eq!(res.returncode(), 3);
        assert_eq!(res.stdout(), "out\n");
        assert_eq!(res.stderr(), "err\n");
        assert!(!res.success());
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let err = run(
            Path::new("/nonexistent/pptest-no-such-tool"),
            &[] as &[&str],
            &RunOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Launch { .. }));

        let err = run(
            Path::new("pptest-no-such-tool-on-path"),
            &[] as &[&str],
            &RunOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Launch { .. }));
    }

    #[test]
    fn test_env_policies() {
        let vars = BTreeMap::from([("PPTEST_PROBE".to_string(), "42".to_string())]);
        let opts = RunOptions::default().env(EnvPolicy::Extend(vars.clone()));
        let res = run(Path::new("sh"), &["-c", "echo $PPTEST_PROBE"], &opts).unwrap();
        assert_eq!(res.stdout(), "42\n");

        let mut replace = vars;
        replace.insert("PATH".into(), "/usr/bin:/bin".into());
        let opts = RunOptions::default().env(EnvPolicy::Replace(replace));
        let res = run(Path::new("sh"), &["-c", "echo ${HOME:-unset}"], &opts).unwrap();
        assert_eq!(res.stdout(), "unset\n");
    }

    #[test]
    fn test_cleared_env_cannot_find_bare_program() {
        let opts = RunOptions::default().env(EnvPolicy::Clear);
        let err = run(Path::new("sh"), &["-c", "true"], &opts).unwrap_err();
        assert!(matches!(err, HarnessError::Launch { .. }));
    }

    #[test]
    fn test_timeout_kills_child() {
        let opts = RunOptions::default().timeout(Some(Duration::from_millis(200)));
        let start = Instant::now();
        let err = run(Path::new("sleep"), &["5"], &opts).unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_kills_forked_helpers() {
        let opts = RunOptions::default().timeout(Some(Duration::from_millis(200)));
        let start = Instant::now();
        let err = run(Path::new("sh"), &["-c", "sleep 5; true"], &opts).unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "took {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn test_timeout_not_hit() {
        let opts = RunOptions::default().timeout(Some(Duration::from_secs(10)));
        let res = run(Path::new("sh"), &["-c", "printf hi"], &opts).unwrap();
        assert_eq!(res.stdout(), "hi");
        assert_eq!(res.returncode(), 0);
    }

    #[test]
    fn test_signal_exit_is_negative() {
        let res = sh("kill -9 $$").unwrap();
        assert_eq!(res.returncode(), -9);
    }

    #[test]
    fn test_run_in_prefixes_db_args() {
        let db = TestDatabase::open().unwrap();
        let runner = ProcessRunner::default();
        let res = runner
            .run_in(&db, Path::new("echo"), &["-Q", "foo"])
            .unwrap();
        assert_eq!(
            res.stdout(),
            format!(
                "--root {} --dbpath {} -Q foo\n",
                db.root().display(),
                db.db_path().display()
            )
        );
    }
}

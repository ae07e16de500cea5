use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::HelperConfig;
use crate::error::{Result, TaggerError};
use crate::source::{find_single_file_with_extension, VersionSource};
use crate::version::Version;

/// Argument placeholder replaced by the discovered manifest path
pub const MANIFEST_PLACEHOLDER: &str = "{manifest}";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Asks an external evaluator to print the version declared by a manifest.
///
/// The helper is spawned directly (no shell). Arguments equal to
/// [MANIFEST_PLACEHOLDER] are replaced by the manifest path as a whole argument,
/// so manifest file names are never interpreted as code.
pub struct HelperSource {
    project_dir: PathBuf,
    manifest_suffix: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl HelperSource {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        manifest_suffix: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        HelperSource {
            project_dir: project_dir.into(),
            manifest_suffix: manifest_suffix.into(),
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(
        project_dir: impl Into<PathBuf>,
        manifest_suffix: impl Into<String>,
        config: &HelperConfig,
    ) -> Self {
        Self::new(
            project_dir,
            manifest_suffix,
            config.program.clone(),
            config.args.clone(),
            config.timeout(),
        )
    }

    fn run(&self, manifest: &str) -> Result<String> {
        let args: Vec<&str> = self
            .args
            .iter()
            .map(|arg| {
                if arg == MANIFEST_PLACEHOLDER {
                    manifest
                } else {
                    arg.as_str()
                }
            })
            .collect();

        log::debug!("running {} {:?}", self.program, args);
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TaggerError::source_unavailable(format!("cannot run {}: {}", self.program, e))
            })?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            let polled = child.try_wait().map_err(|e| {
                TaggerError::source_unavailable(format!("cannot wait for {}: {}", self.program, e))
            })?;
            match polled {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(TaggerError::source_unavailable(format!(
                        "{} did not finish within {}s",
                        self.program,
                        self.timeout.as_secs_f32()
                    )));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        // A grandchild can keep the pipes open after the helper exits
        let stdout = collect_output(stdout, deadline).ok_or_else(|| {
            TaggerError::source_unavailable(format!(
                "{} exited but its output stayed open past {}s",
                self.program,
                self.timeout.as_secs_f32()
            ))
        })?;
        let stderr = collect_output(stderr, deadline).unwrap_or_default();

        if !status.success() {
            return Err(TaggerError::source_unavailable(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Everything the pipe produced, or `None` if it is still open at `deadline`
fn collect_output(reader: Option<Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(reader) = reader else {
        return Some(String::new());
    };
    reader
        .recv_timeout(
            deadline
                .saturating_duration_since(Instant::now())
                .max(POLL_INTERVAL),
        )
        .ok()
}

impl VersionSource for HelperSource {
    fn resolve(&self) -> Result<Version> {
        let manifest = find_single_file_with_extension(&self.project_dir, &self.manifest_suffix)?;
        let output = self.run(&manifest.to_string_lossy())?;

        if output.trim().is_empty() {
            return Err(TaggerError::source_unavailable(format!(
                "{} printed no version for {}",
                self.program,
                manifest.display()
            )));
        }
        Version::parse(&output)
    }

    fn describe(&self) -> String {
        format!("{} helper", self.program)
    }
}

//! PlantUML command-line renderer.
//!
//! Runs the engine in pipe mode: diagram source goes to stdin, image bytes
//! come back on stdout, diagnostics on stderr. The child runs headless and is
//! killed if its future is dropped, which is how the orchestrator's timeout
//! reclaims a stuck engine.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use puml_core::{ArtifactBytes, OutputFormat, RenderError, RenderGateway};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Environment passed to the JVM so the engine never needs a display.
const HEADLESS_JAVA_OPTIONS: &str = "-Djava.awt.headless=true";

/// Renders diagrams by spawning the PlantUML executable.
#[derive(Debug, Clone)]
pub struct PlantUmlCli {
    binary: PathBuf,
}

impl PlantUmlCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments for one invocation.
    pub fn args(format: OutputFormat) -> [&'static str; 4] {
        ["-pipe", "-charset", "UTF-8", format.engine_flag()]
    }

    fn command(&self, format: OutputFormat) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(Self::args(format))
            .env("JAVA_TOOL_OPTIONS", HEADLESS_JAVA_OPTIONS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl RenderGateway for PlantUmlCli {
    fn name(&self) -> &'static str {
        "plantuml"
    }

    async fn render(&self, source: &str, format: OutputFormat) -> Result<ArtifactBytes, RenderError> {
        let mut child = self.command(format).spawn().map_err(|e| {
            let reason = if e.kind() == ErrorKind::NotFound {
                format!("{} not found", self.binary.display())
            } else {
                format!("failed to start {}: {}", self.binary.display(), e)
            };
            RenderError::Unavailable { reason }
        })?;

        // Feed stdin while collecting output so a large diagram cannot
        // deadlock against a full stdout pipe.
        let stdin = child.stdin.take();
        let input = source.as_bytes().to_vec();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|e| RenderError::Engine {
            reason: format!("failed to collect engine output: {}", e),
        })?;
        if let Err(e) = fed {
            // A broken pipe here means the engine exited early; its exit
            // status below says why.
            tracing::debug!(error = %e, "Engine closed stdin early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("engine exited with {}", output.status)
            } else {
                stderr
            };
            return Err(RenderError::Syntax { message });
        }

        if output.stdout.is_empty() {
            return Err(RenderError::Engine {
                reason: "engine produced no output".to_string(),
            });
        }

        Ok(Arc::from(output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_select_format() {
        assert_eq!(
            PlantUmlCli::args(OutputFormat::Svg),
            ["-pipe", "-charset", "UTF-8", "-tsvg"]
        );
        assert_eq!(PlantUmlCli::args(OutputFormat::Png)[3], "-tpng");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let cli = PlantUmlCli::new("/nonexistent/puml-engine-for-tests");
        let result = cli.render("@startuml\nA->B\n@enduml", OutputFormat::Png).await;
        assert!(matches!(result, Err(RenderError::Unavailable { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_becomes_artifact_bytes() {
        // Stand-in engine that echoes stdin and ignores its flags.
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake-plantuml");
        std::fs::write(&script, "#!/bin/sh\ncat\n").expect("write script");
        set_executable(&script);

        let cli = PlantUmlCli::new(&script);
        let bytes = cli
            .render("@startuml\nA->B\n@enduml", OutputFormat::Svg)
            .await
            .expect("render");
        assert_eq!(&*bytes, b"@startuml\nA->B\n@enduml");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_syntax_error_with_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake-plantuml");
        std::fs::write(
            &script,
            "#!/bin/sh\ncat >/dev/null\necho 'Syntax Error? (line 2)' >&2\nexit 200\n",
        )
        .expect("write script");
        set_executable(&script);

        let cli = PlantUmlCli::new(&script);
        match cli.render("@startuml\nA->\n@enduml", OutputFormat::Png).await {
            Err(RenderError::Syntax { message }) => assert!(message.contains("line 2")),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    fn set_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).expect("chmod");
    }
}

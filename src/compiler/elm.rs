//! Process-backed compiler: runs `elm make`.
//!
//! The compiler writes to a designated output path (a fresh temporary file
//! unless `output` is configured) and the artifact is read back as text once
//! the process exits with status zero.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;

use super::{CompileJob, Compiler, CompilerFlags};
use crate::deps::imports;
use crate::error::{LoaderError, Result};
use crate::loader::Emitter;

/// Compiler executable looked up on `PATH` by default.
pub const DEFAULT_PROGRAM: &str = "elm";

/// `elm make` wrapper.
#[derive(Debug, Clone, Default)]
pub struct ElmCompiler {
    /// Executable override; `pathToElm` in the options still wins.
    program: Option<PathBuf>,
}

impl ElmCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self, flags: &CompilerFlags) -> PathBuf {
        flags
            .path_to_elm
            .clone()
            .or_else(|| self.program.clone())
            .or_else(|| which::which(DEFAULT_PROGRAM).ok())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM))
    }
}

impl Compiler for ElmCompiler {
    async fn compile(&self, job: &CompileJob, emitter: &Emitter) -> Result<String> {
        let flags = CompilerFlags::from_options(&job.options, emitter)?;
        let program = self.program(&flags);

        // Keep the temp file alive until the artifact has been read back
        let (output_path, _temp) = match &flags.output {
            Some(path) => (path.clone(), None),
            None => {
                let file = tempfile::Builder::new()
                    .prefix("elmpack-")
                    .suffix(&flags.output_suffix())
                    .tempfile()
                    .map_err(|e| {
                        LoaderError::compiler(format!("failed to create output file: {e}"))
                    })?;
                (file.path().to_path_buf(), Some(file))
            }
        };

        let mut output_arg = OsString::from("--output=");
        output_arg.push(&output_path);

        let mut cmd = Command::new(&program);
        cmd.arg("make")
            .args(&job.files)
            .arg(&output_arg)
            .args(flags.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &job.cwd {
            cmd.current_dir(dir);
        }

        if flags.verbose {
            crate::log!("compile"; "running {:?}", cmd.as_std());
        }

        let name = program.display().to_string();
        let output = cmd
            .output()
            .await
            .map_err(|e| LoaderError::compiler(format!("failed to execute `{name}`: {e}")))?;

        if !output.status.success() {
            return Err(LoaderError::compiler(format_failure(&output)));
        }

        if flags.verbose {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stdout = stdout.trim();
            if !stdout.is_empty() {
                crate::log!("compile"; "{}", stdout);
            }
        }

        tokio::fs::read_to_string(&output_path).await.map_err(|e| {
            LoaderError::compiler(format!(
                "failed to read compiler output `{}`: {e}",
                output_path.display()
            ))
        })
    }

    async fn find_dependencies(&self, file: &Path) -> Result<Vec<PathBuf>> {
        let file = file.to_path_buf();
        tokio::task::spawn_blocking(move || imports::find_all_dependencies(&file))
            .await
            .map_err(|e| LoaderError::Dependency(format!("dependency scan aborted: {e}")))?
    }
}

/// Format a failed compiler run.
fn format_failure(output: &Output) -> String {
    let mut msg = match output.status.code() {
        Some(code) => format!("Compilation failed with exit code {code}"),
        None => "Compilation failed: terminated by signal".to_string(),
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        msg.push('\n');
        msg.push_str(stderr);
    }
    msg
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::compiler::{Admission, invoke};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable shell script standing in for `elm`.
    fn fake_elm(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-elm");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Script that writes its `--output=` target and echoes the flags into it.
    const WRITE_OUTPUT: &str = r#"
out=""
for arg in "$@"; do
  case "$arg" in
    --output=*) out="${arg#--output=}" ;;
  esac
done
echo "var Elm = {}; // $*" > "$out"
"#;

    fn job(files: &[&str]) -> CompileJob {
        CompileJob {
            files: files.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_compile_reads_output_back() {
        let dir = TempDir::new().unwrap();
        let compiler = ElmCompiler::with_program(fake_elm(dir.path(), WRITE_OUTPUT));
        let (emitter, _queue) = Emitter::channel();

        let mut job = job(&["src/Main.elm"]);
        job.options.insert("debug".into(), true.into());

        let out = compiler.compile(&job, &emitter).await.unwrap();
        assert!(out.starts_with("var Elm = {};"));
        assert!(out.contains("make src/Main.elm --output="));
        assert!(out.contains("--debug"));
    }

    #[tokio::test]
    async fn test_compile_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let script = fake_elm(dir.path(), "echo 'var Elm = 42;' > \"${3#--output=}\"");
        let compiler = ElmCompiler::with_program(script);
        let (emitter, _queue) = Emitter::channel();
        let admission = Admission::new();
        let job = job(&["src/Main.elm"]);

        let first = invoke(&compiler, &admission, 1, &job, &emitter).await.unwrap();
        let second = invoke(&compiler, &admission, 1, &job, &emitter).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.matches(crate::compiler::TRAILER).count(), 1);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_compiler_error() {
        let dir = TempDir::new().unwrap();
        let compiler =
            ElmCompiler::with_program(fake_elm(dir.path(), "echo 'SYNTAX PROBLEM' >&2\nexit 2"));
        let (emitter, _queue) = Emitter::channel();
        let admission = Admission::new();

        let err = invoke(&compiler, &admission, 1, &job(&["Bad.elm"]), &emitter)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Compiler process exited with error"));
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("SYNTAX PROBLEM"));
    }

    #[tokio::test]
    async fn test_missing_program_is_compiler_error() {
        let dir = TempDir::new().unwrap();
        let compiler = ElmCompiler::with_program(dir.path().join("no-such-elm"));
        let (emitter, _queue) = Emitter::channel();
        let admission = Admission::new();

        let err = invoke(&compiler, &admission, 1, &job(&["Main.elm"]), &emitter)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Compiler process exited with error"));
        assert!(err.to_string().contains("failed to execute"));
    }

    #[tokio::test]
    async fn test_explicit_output_path() {
        let dir = TempDir::new().unwrap();
        let compiler = ElmCompiler::with_program(fake_elm(dir.path(), WRITE_OUTPUT));
        let (emitter, _queue) = Emitter::channel();

        let target = dir.path().join("main.js");
        let mut job = job(&["src/Main.elm"]);
        job.options
            .insert("output".into(), target.display().to_string().into());

        let out = compiler.compile(&job, &emitter).await.unwrap();
        assert_eq!(out, fs::read_to_string(&target).unwrap());
    }

    #[tokio::test]
    async fn test_path_to_elm_option_wins() {
        let dir = TempDir::new().unwrap();
        let script = fake_elm(dir.path(), WRITE_OUTPUT);
        let compiler = ElmCompiler::with_program(dir.path().join("no-such-elm"));
        let (emitter, _queue) = Emitter::channel();

        let mut job = job(&["src/Main.elm"]);
        job.options
            .insert("pathToElm".into(), script.display().to_string().into());

        assert!(compiler.compile(&job, &emitter).await.is_ok());
    }

    #[tokio::test]
    async fn test_cwd_and_relative_files_agree() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("proj");
        fs::create_dir_all(project.join("src")).unwrap();
        fs::write(project.join("src/A.elm"), "module A exposing (..)\n").unwrap();

        let body = format!(
            "test -f \"$2\" || {{ echo \"no such file $2 in $(pwd)\" >&2; exit 1; }}\n{WRITE_OUTPUT}"
        );
        let compiler = ElmCompiler::with_program(fake_elm(dir.path(), &body));
        let (emitter, _queue) = Emitter::channel();

        let request = serde_json::json!({
            "cwd": project.display().to_string(),
            "files": ["src/A.elm"],
        });
        let request = request.as_object().cloned().unwrap();
        let config = crate::config::resolve(
            &crate::config::OptionMap::new(),
            &crate::config::OptionMap::new(),
            &request,
        )
        .unwrap();

        let job = CompileJob {
            files: config.files_for(&project.join("src/Main.elm")),
            options: config.compiler_options().clone(),
            cwd: config.loader().cwd.clone(),
        };
        assert!(compiler.compile(&job, &emitter).await.is_ok());
    }
}

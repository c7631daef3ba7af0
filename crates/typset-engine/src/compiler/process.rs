//! Compilation through an external `typst` binary

use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{CompileError, CompileRequest, CompileResult, Compiler};

/// Binary looked up on `PATH` when no explicit program is given
pub const DEFAULT_TYPST_BIN: &str = "typst";

/// Runs `typst compile`, piping the source through stdin and the PDF through stdout
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: PathBuf,
}

impl Default for ProcessCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_TYPST_BIN)
    }
}

impl ProcessCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for a request
    pub fn command_args(&self, request: &CompileRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "compile".into(),
            "-".into(),
            "-".into(),
            "--format".into(),
            "pdf".into(),
        ];

        if let Some(root) = &request.root {
            args.push("--root".into());
            args.push(root.into());
        }
        for font_path in &request.font_paths {
            args.push("--font-path".into());
            args.push(font_path.into());
        }
        if request.ignore_system_fonts {
            args.push("--ignore-system-fonts".into());
        }
        if let Some(ppi) = request.ppi {
            args.push("--ppi".into());
            args.push(ppi.to_string().into());
        }
        for (key, value) in &request.sys_inputs {
            args.push("--input".into());
            args.push(format!("{}={}", key, value).into());
        }
        args.push("--pdf-standard".into());
        args.push(request.pdf_standards.as_str().into());

        args
    }
}

impl Compiler for ProcessCompiler {
    fn name(&self) -> &'static str {
        "typst-process"
    }

    fn compile(&self, request: &CompileRequest) -> CompileResult<Vec<u8>> {
        debug!(program = %self.program.display(), root = ?request.root, "Running Typst");

        let mut child = Command::new(&self.program)
            .args(self.command_args(request))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&request.input) {
                Ok(()) => {}
                // Typst exited before reading all of its input
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("Typst closed stdin early");
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(CompileError::Process {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

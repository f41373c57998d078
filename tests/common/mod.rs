use std::process::Command;

use strata::diag::CompileError;
use strata::driver::compile::{CompileOptions, CompileOutput, compile, interpret};

pub(crate) fn compile_source(source: &str) -> Result<CompileOutput, CompileError> {
    compile(source, &CompileOptions::default())
}

pub(crate) fn compile_ok(source: &str) -> CompileOutput {
    compile_source(source).expect("failed to compile")
}

pub(crate) fn interpret_display(source: &str) -> String {
    interpret(source, &CompileOptions::default())
        .expect("failed to interpret")
        .to_string()
}

/// Evaluate generated JavaScript with `node -p`. Returns `None` when node is
/// not installed.
pub(crate) fn run_node(js: &str) -> Option<String> {
    let output = Command::new("node").arg("-p").arg(js).output().ok()?;
    assert!(
        output.status.success(),
        "node failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

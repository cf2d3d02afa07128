//! Materializing a `Benchmark` payload into a session working directory and
//! running its dynamic build/run commands.
//!
//! Only inline file contents are written; resolving an external `uri`
//! reference belongs to the dataset collaborator that supplied the
//! benchmark, not to the session protocol.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use optforge_proto::service::v1::{Benchmark, Command, File, file};
use tracing::debug;

use crate::commands::{self, CommandError, CommandOutput, DEFAULT_TIMEOUT};
use crate::error::{Result, SessionError};

/// Where a materialized benchmark landed on disk.
#[derive(Debug, Clone)]
pub struct BenchmarkLayout {
    pub program: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Write the benchmark's program and auxiliary files under `dir`.
pub async fn write_benchmark(benchmark: &Benchmark, dir: &Path) -> Result<BenchmarkLayout> {
    let program_file = benchmark.program.as_ref().ok_or_else(|| {
        SessionError::SetupFailure(format!("benchmark '{}' has no program", benchmark.uri))
    })?;
    let program_name = if program_file.path.is_empty() {
        "program"
    } else {
        program_file.path.as_str()
    };
    let program = write_file(dir, program_name, program_file).await?;

    let mut files = Vec::with_capacity(benchmark.files.len());
    for aux in &benchmark.files {
        if aux.path.is_empty() {
            return Err(SessionError::SetupFailure(format!(
                "benchmark '{}' has an auxiliary file with no path",
                benchmark.uri
            )));
        }
        files.push(write_file(dir, &aux.path, aux).await?);
    }

    debug!(uri = %benchmark.uri, dir = %dir.display(), "materialized benchmark");
    Ok(BenchmarkLayout { program, files })
}

/// Run one dynamic-config command in `cwd`, then require its declared
/// output artifacts to exist.
pub async fn run_dynamic_command(
    command: &Command,
    cwd: &Path,
) -> std::result::Result<CommandOutput, CommandError> {
    let timeout = if command.timeout_seconds > 0 {
        Duration::from_secs(command.timeout_seconds as u64)
    } else {
        DEFAULT_TIMEOUT
    };
    let output = commands::run_command(&command.arguments, timeout, cwd).await?;
    for outfile in &command.outfiles {
        if !cwd.join(outfile).exists() {
            return Err(CommandError::MissingOutput {
                command: command.arguments.join(" "),
                path: outfile.clone(),
            });
        }
    }
    Ok(output)
}

async fn write_file(dir: &Path, path: &str, file: &File) -> Result<PathBuf> {
    let relative = sanitized_relpath(path)?;
    let target = dir.join(relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, file_contents(file)?).await?;
    Ok(target)
}

fn file_contents(file: &File) -> Result<&[u8]> {
    match file.data.as_ref() {
        Some(file::Data::Contents(bytes)) => Ok(bytes),
        Some(file::Data::Uri(uri)) => Err(SessionError::SetupFailure(format!(
            "benchmark file '{}' references external uri '{uri}'; inline contents are required",
            file.path
        ))),
        None => Err(SessionError::SetupFailure(format!(
            "benchmark file '{}' has no contents",
            file.path
        ))),
    }
}

/// Benchmark file paths must stay inside the working directory.
fn sanitized_relpath(path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    let escapes = relative.components().any(|component| {
        !matches!(component, Component::Normal(_) | Component::CurDir)
    });
    if relative.is_absolute() || escapes {
        return Err(SessionError::SetupFailure(format!(
            "benchmark file path '{path}' escapes the working directory"
        )));
    }
    Ok(relative.to_path_buf())
}

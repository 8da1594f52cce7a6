use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};
use tokio::process::Command;

use crate::error::{CommandError, ValidationError, WallsError};
use crate::Result;

pub const INPUT_PLACEHOLDER: &str = "%i";
pub const OUTPUT_PLACEHOLDER: &str = "%o";
pub const WALLPAPER_PLACEHOLDER: &str = "%w";

pub fn contains_placeholder(template: &[String], placeholder: &str) -> bool {
    template.iter().any(|token| token == placeholder)
}

/// Returns a private copy of `template` with every token that exactly equals a
/// placeholder replaced by its value. Substrings are left alone.
pub fn substitute(template: &[String], replacements: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|token| {
            replacements
                .iter()
                .find(|(placeholder, _)| token == placeholder)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| token.clone())
        })
        .collect()
}

pub fn render(argv: &[String]) -> String {
    argv.join(" ")
}

fn resolve_program(argv: &[String]) -> Result<(PathBuf, &[String])> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        WallsError::Validation(ValidationError::EmptyCommand {
            context: "command".to_string(),
        })
    })?;

    let path = which::which(program).map_err(|e| {
        WallsError::Command(CommandError::ProgramNotFound {
            program: program.clone(),
            message: e.to_string(),
        })
    })?;
    Ok((path, args))
}

/// Runs `argv` to completion with inherited stdout/stderr.
///
/// The child is killed if the returned future is dropped before it exits.
pub async fn run(argv: &[String]) -> Result<()> {
    let (program, args) = resolve_program(argv)?;
    let rendered = render(argv);

    let mut cmd = Command::new(&program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    log::debug!("exec: {}", rendered);

    let status = cmd.status().await.map_err(|source| {
        WallsError::Command(CommandError::Spawn {
            command: rendered.clone(),
            source,
        })
    })?;

    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(WallsError::Command(CommandError::NonZeroExit {
            command: rendered,
            code,
        })),
        None => Err(WallsError::Command(CommandError::Terminated { command: rendered })),
    }
}

/// Starts `argv` in its own process group and returns its pid without waiting.
pub fn spawn_detached(argv: &[String]) -> Result<u32> {
    use std::os::unix::process::CommandExt;

    let (program, args) = resolve_program(argv)?;
    let rendered = render(argv);

    let mut cmd = StdCommand::new(&program);
    cmd.args(args).stdin(Stdio::null()).process_group(0);

    log::debug!("exec detached: {}", rendered);

    let child = cmd.spawn().map_err(|source| {
        WallsError::Command(CommandError::Spawn {
            command: rendered,
            source,
        })
    })?;
    Ok(child.id())
}

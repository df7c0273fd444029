use std::io::Write;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::error::CliError;

/// Write a completion script for `shell` to `output_path`, or stdout.
pub fn run_completions(shell: Shell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut script = Vec::new();
    generate(shell, &mut Cli::command(), "mysched", &mut script);

    match output_path {
        Some(path) => {
            std::fs::write(path, &script)?;
            println!("{}", path.display());
        }
        None => std::io::stdout().lock().write_all(&script)?,
    }
    Ok(())
}

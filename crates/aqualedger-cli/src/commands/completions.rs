use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::aot::Generator;
use clap_complete::{generate, shells};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

const BIN_NAME: &str = "aqualedger";

pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let script = completion_script(shell);

    if let Some(path) = output_path {
        let target = completion_target(shell, path);
        std::fs::write(&target, &script)?;
        println!("{}", target.display());
    } else {
        io::stdout().write_all(&script)?;
    }

    Ok(())
}

pub fn completion_script(shell: CompletionShell) -> Vec<u8> {
    let mut command = Cli::command();
    let mut buffer = Vec::new();
    match shell {
        CompletionShell::Bash => write_script(shells::Bash, &mut command, &mut buffer),
        CompletionShell::Zsh => write_script(shells::Zsh, &mut command, &mut buffer),
        CompletionShell::Fish => write_script(shells::Fish, &mut command, &mut buffer),
    }
    buffer
}

/// A directory gets the file name the shell expects; anything else is used as is.
pub fn completion_target(shell: CompletionShell, path: &Path) -> PathBuf {
    if !path.is_dir() {
        return path.to_path_buf();
    }
    let file_name = match shell {
        CompletionShell::Bash => format!("{BIN_NAME}.bash"),
        CompletionShell::Zsh => format!("_{BIN_NAME}"),
        CompletionShell::Fish => format!("{BIN_NAME}.fish"),
    };
    path.join(file_name)
}

fn write_script<G: Generator>(generator: G, command: &mut clap::Command, buffer: &mut Vec<u8>) {
    generate(generator, command, BIN_NAME, buffer);
}

//! # Shell Completion Module
//!
//! Generation of completion scripts for the shells clap_complete supports.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! replay completion bash > ~/.local/share/bash-completion/completions/replay
//!
//! # Generate zsh completions
//! replay completion zsh > ~/.config/zsh/completions/_replay
//! ```

use crate::cli;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(generator: G, cmd: &mut Command) {
    generate(generator, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our CLI shell enum to clap_complete's shell type
pub fn shell_to_completion_shell(shell: &cli::Shell) -> CompletionShell {
    match shell {
        cli::Shell::Bash => CompletionShell::Bash,
        cli::Shell::Zsh => CompletionShell::Zsh,
        cli::Shell::Fish => CompletionShell::Fish,
        cli::Shell::PowerShell => CompletionShell::PowerShell,
        cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_mapping_is_total() {
        let shells = [
            cli::Shell::Bash,
            cli::Shell::Zsh,
            cli::Shell::Fish,
            cli::Shell::PowerShell,
            cli::Shell::Elvish,
        ];
        for shell in shells {
            // Exhaustiveness is enforced by the match; this keeps the
            // mapping covered if a variant is ever added.
            let _ = shell_to_completion_shell(&shell);
        }
    }
}

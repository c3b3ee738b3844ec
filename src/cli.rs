use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "Interpreter for a small scripting language")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a source file and print its result
    Run {
        /// Path to the source file
        file: PathBuf,
    },

    /// Parse a source file and print the syntax tree
    Check {
        /// Path to the source file to check
        file: PathBuf,
    },

    /// Print the tokens of a source file, one per line
    Tokens {
        /// Path to the source file to scan
        file: PathBuf,
    },

    /// Start an interactive REPL session
    Repl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommands_parse() {
        let args = Args::try_parse_from(["scriptlang", "run", "main.sl"]).unwrap();
        assert!(matches!(args.command, Commands::Run { file } if file == PathBuf::from("main.sl")));

        let args = Args::try_parse_from(["scriptlang", "tokens", "a.sl"]).unwrap();
        assert!(matches!(args.command, Commands::Tokens { .. }));

        let args = Args::try_parse_from(["scriptlang", "repl"]).unwrap();
        assert!(matches!(args.command, Commands::Repl));

        assert!(Args::try_parse_from(["scriptlang", "check"]).is_err());
    }
}

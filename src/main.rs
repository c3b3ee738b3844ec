use clap::Parser;
use dirs::home_dir;
use log::{debug, info};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use scriptlang::{
    cli::{Args, Commands},
    environment::Environment,
    error::Result,
    parser::parse,
    repl::{REPLPrompt, REPLValidator, SyntaxHighlighter},
    runtime::run,
    tokenizer::tokenize,
};
use std::{fs, path::PathBuf, process};

fn run_file(file: PathBuf) -> Result<()> {
    let source = fs::read_to_string(file)?;

    if let Some(value) = run(&source, &Environment::new())? {
        println!("{}", value);
    }

    Ok(())
}

fn check_file(file: PathBuf) -> Result<()> {
    let source = fs::read_to_string(file)?;

    let program = parse(&source)?;
    debug!("parsed {} top-level statements", program.statements.len());
    print!("{}", program);

    Ok(())
}

fn print_tokens(file: PathBuf) -> Result<()> {
    let source = fs::read_to_string(file)?;

    for token in tokenize(&source)? {
        println!("{}", token);
    }

    Ok(())
}

fn run_repl() -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    if let Some(history) = home_dir()
        .map(|home| home.join(".scriptlang_history"))
        .and_then(|path| FileBackedHistory::with_file(100, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    let prompt = REPLPrompt;
    let env = Environment::new();

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => match run(&buffer, &env) {
                Ok(Some(value)) => println!("{:?}", value),
                Ok(None) => {}
                Err(err) => eprintln!("{}", err),
            },
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Run { file } => {
            info!("FILE MODE");
            debug!("file: {:?}", file);
            run_file(file)
        }
        Commands::Check { file } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);
            check_file(file)
        }
        Commands::Tokens { file } => {
            info!("TOKENS MODE");
            debug!("file: {:?}", file);
            print_tokens(file)
        }
        Commands::Repl => {
            info!("REPL MODE");
            run_repl()
        }
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(1);
    }
}

pub mod cli;
pub mod environment;
pub mod error;
pub mod native;
pub mod parser;
pub mod printer;
pub mod repl;
pub mod runtime;
pub mod stack;
pub mod tokenizer;

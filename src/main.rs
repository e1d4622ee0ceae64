use clap::Parser;
use fable::runtime::{
    error,
    interpreter::{fable_interpreter::FableInterpreter, EngineConfig, ExecutionMode},
    library_loader::LibraryLoader,
};
use std::{
    env::{split_paths, var_os},
    io::{stdin, stdout, IsTerminal, Write},
};

/// Run Fable scripts, or read commands from standard input when no script is given.
#[derive(Parser, Debug)]
#[command(name = "fable", version, about)]
struct CliArgs {
    /// Script files to run, in order.
    files: Vec<String>,

    /// Directory to search for script files.  Can be given more than once.
    #[arg(long = "lib", value_name = "DIR")]
    lib: Vec<String>,

    /// How evaluations are driven: run, synchronized or step.
    #[arg(long, default_value = "run")]
    mode: ExecutionMode,

    /// Write the words defined during the run to this file when done.
    #[arg(long, value_name = "FILE")]
    save: Option<String>,
}

/// Drive anything left pending to completion.  Only step mode leaves work behind.
fn run_to_end(interpreter: &mut FableInterpreter) -> error::Result<()> {
    while interpreter.step()? {}

    Ok(())
}

fn flush_output(interpreter: &mut FableInterpreter) {
    print!("{}", interpreter.take_output());
    let _ = stdout().flush();
}

/// Evaluate standard input one line at a time, reporting each line's outcome.
fn repl(interpreter: &mut FableInterpreter) -> error::Result<()> {
    let interactive = stdin().is_terminal();

    if interactive {
        println!("Fable {}.  Type WORDS to list the known words.", env!("CARGO_PKG_VERSION"));
    }

    for line in stdin().lines() {
        let line = line?;

        let result = interpreter
            .evaluate(&line)
            .and_then(|_| run_to_end(interpreter));

        flush_output(interpreter);

        match result {
            Ok(()) => println!(" ok"),
            Err(error) => {
                println!();
                eprintln!("Error: {}", error);
                eprintln!("{}", error.hint());
            }
        }
    }

    Ok(())
}

fn main() -> error::Result<()> {
    let args = CliArgs::parse();

    let mut interpreter = FableInterpreter::with_config(EngineConfig {
        execution_mode: args.mode,
        ..EngineConfig::default()
    });

    let mut loader = LibraryLoader::new();

    for directory in &args.lib {
        loader.add_search_path(directory)?;
    }

    if let Some(paths) = var_os("FABLE_LIB_PATH") {
        for directory in split_paths(&paths) {
            loader.add_search_path(directory)?;
        }
    }

    if args.files.is_empty() {
        repl(&mut interpreter)?;
    }

    for file in &args.files {
        let result = loader
            .load(&mut interpreter, file)
            .and_then(|_| run_to_end(&mut interpreter));

        flush_output(&mut interpreter);
        result?;
    }

    if let Some(path) = &args.save {
        let count = loader.save(&interpreter, path)?;
        eprintln!("Saved {} word(s) to {}.", count, path);
    }

    Ok(())
}

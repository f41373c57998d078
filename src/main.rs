use std::path::PathBuf;
use std::process::{Command, ExitCode};

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strata::diag::{CompileError, format_error};
use strata::driver::compile::{CompileOptions, compile, interpret};

#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print every intermediate representation and debug logs
    #[clap(short, long)]
    verbose: bool,

    /// Compile to JavaScript instead of interpreting
    #[clap(short, long)]
    compile: bool,

    /// Compile, then execute the result with `node`
    #[clap(short = 'x', long)]
    execute: bool,

    /// Comma-separated list of things to dump: ast,types,desugared,defuse,progs,procs,glue
    #[clap(long)]
    dump: Option<String>,

    /// Source file to run
    program: PathBuf,
}

fn init_tracing(verbose: bool) {
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let source = match std::fs::read_to_string(&args.program) {
        Ok(source) => source,
        Err(e) => {
            println!("[ERROR] {}", CompileError::Io(args.program.clone(), e));
            return ExitCode::FAILURE;
        }
    };

    let opts = CompileOptions {
        dump: if args.verbose {
            Some("all".to_string())
        } else {
            args.dump.clone()
        },
    };

    let result = if args.compile || args.execute {
        compile(&source, &opts).and_then(|output| {
            if args.execute {
                execute(&args.program, &output.js)
            } else {
                print!("{}", output.js);
                Ok(())
            }
        })
    } else {
        interpret(&source, &opts).map(|value| println!("{}", value))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&source, &error);
            ExitCode::FAILURE
        }
    }
}

fn execute(program: &std::path::Path, js: &str) -> Result<(), CompileError> {
    let output = Command::new("node")
        .arg("-p")
        .arg(js)
        .output()
        .map_err(|e| CompileError::Io(PathBuf::from("node"), e))?;
    tracing::debug!("node exited with {}", output.status);

    print!("{}", String::from_utf8_lossy(&output.stdout));
    print!("{}", String::from_utf8_lossy(&output.stderr));
    if !output.status.success() {
        return Err(CompileError::Io(
            program.to_path_buf(),
            std::io::Error::other(format!("node exited with {}", output.status)),
        ));
    }
    Ok(())
}

fn report(source: &str, error: &CompileError) {
    match error.span() {
        Some(span) => print!("{}", format_error(source, span, error)),
        None => println!("[ERROR] {error}"),
    }
}

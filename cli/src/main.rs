use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::info;

use weft_interp::{Interpreter, Outcome, RuntimeValue};
use weft_ir::{text, FunctionPrinter, Program, ProgramPrinter};
use weft_pass::OptimizerConfig;

#[derive(Debug, Parser)]
#[command(name = "weft", version, about = "A toy-language SSA IR optimizer and reference interpreter", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all logging below warnings
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse, verify, and interpret a program to completion.
    Run { file: PathBuf },
    /// Run the optimizer driver and print (or write) the resulting IR.
    Opt {
        file: PathBuf,
        #[arg(long)]
        no_verify: bool,
        #[arg(long)]
        enable_sccp: bool,
        #[arg(long)]
        enable_dce: bool,
        #[arg(long)]
        enable_dse: bool,
        #[arg(long)]
        enable_inlining: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse and verify a program, reporting diagnostics.
    Verify { file: PathBuf },
    /// Drive the interpreter one step at a time under a small REPL.
    Debug { file: PathBuf },
}

impl From<&Cli> for OptimizerConfig {
    fn from(cli: &Cli) -> Self {
        match &cli.command {
            Command::Opt { no_verify, enable_sccp, enable_dce, enable_dse, enable_inlining, .. } => OptimizerConfig {
                enable_sccp: *enable_sccp,
                enable_dce: *enable_dce,
                enable_dse: *enable_dse,
                enable_inlining: *enable_inlining,
                verify_between_passes: !no_verify,
            },
            _ => OptimizerConfig::default(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(cli: &Cli) {
    let mut builder = env_logger::Builder::from_default_env();
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else {
        let level = match cli.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Run { file } => run_command(file),
        Command::Opt { file, output, .. } => opt_command(file, output, &OptimizerConfig::from(cli)),
        Command::Verify { file } => verify_command(file),
        Command::Debug { file } => debug_command(file),
    }
}

fn load(file: &PathBuf) -> Result<Program> {
    let src = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let mut program = Program::new();
    text::parse_into(&mut program, &src).with_context(|| format!("parsing {}", file.display()))?;
    Ok(program)
}

fn run_command(file: &PathBuf) -> Result<ExitCode> {
    let program = load(file)?;
    if let Err(err) = weft_analysis::verify(&program) {
        eprintln!("verification failed:\n{err}");
        return Ok(ExitCode::from(1));
    }
    let Some(entry) = program.entrypoint() else {
        eprintln!("no entrypoint function in {}", file.display());
        return Ok(ExitCode::from(1));
    };
    let mut interp = Interpreter::new(&program, entry, Vec::new());
    match interp.run() {
        Outcome::Returned(value) => {
            println!("{}", describe(&value));
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Trapped(trap) => {
            eprintln!("trap: {trap}");
            Ok(ExitCode::from(3))
        }
    }
}

fn opt_command(file: &PathBuf, output: &Option<PathBuf>, config: &OptimizerConfig) -> Result<ExitCode> {
    let mut program = load(file)?;
    if let Err(err) = weft_analysis::verify(&program) {
        eprintln!("verification failed before optimizing:\n{err}");
        return Ok(ExitCode::from(1));
    }
    if let Err(err) = weft_pass::optimize(&mut program, config) {
        eprintln!("optimizer error: {err}");
        return Ok(ExitCode::from(2));
    }
    info!("optimization complete");
    let rendered = ProgramPrinter::new(&program).to_string();
    match output {
        Some(path) => fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn verify_command(file: &PathBuf) -> Result<ExitCode> {
    let program = load(file)?;
    match weft_analysis::verify(&program) {
        Ok(()) => {
            println!("ok");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::from(1))
        }
    }
}

fn describe(value: &RuntimeValue) -> String {
    match value {
        RuntimeValue::Integer { value, .. } => value.to_string(),
        RuntimeValue::Void => "void".to_string(),
        RuntimeValue::Box { .. } => "<box>".to_string(),
    }
}

/// A minimal REPL over [`Interpreter`]: an empty line steps, `b` toggles a
/// breakpoint at the current instruction, `c` continues, `s` steps and
/// prints the step counter, `p` prints the whole function, `w [+|-]N` sets
/// display width, `q`/EOF quits.
fn debug_command(file: &PathBuf) -> Result<ExitCode> {
    let program = load(file)?;
    if let Err(err) = weft_analysis::verify(&program) {
        eprintln!("verification failed:\n{err}");
        return Ok(ExitCode::from(1));
    }
    let Some(entry) = program.entrypoint() else {
        eprintln!("no entrypoint function in {}", file.display());
        return Ok(ExitCode::from(1));
    };

    let mut interp = Interpreter::new(&program, entry, Vec::new());
    let mut breakpoints: Vec<usize> = Vec::new();
    let mut steps = 0usize;
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        line.clear();
        print!("(weft) ");
        io::stdout().flush().ok();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(ExitCode::SUCCESS);
        }
        match line.trim() {
            "q" => return Ok(ExitCode::SUCCESS),
            "p" => println!("{}", FunctionPrinter::new(&program, entry)),
            "b" => {
                breakpoints.push(steps);
                println!("breakpoint set at step {steps}");
            }
            "c" => loop {
                if breakpoints.contains(&steps) && steps > 0 {
                    break;
                }
                if let Some(outcome) = interp.step() {
                    return Ok(report_outcome(outcome));
                }
                steps += 1;
            },
            "s" => {
                if let Some(outcome) = interp.step() {
                    return Ok(report_outcome(outcome));
                }
                steps += 1;
                println!("step {steps}");
            }
            "" => {
                if let Some(outcome) = interp.step() {
                    return Ok(report_outcome(outcome));
                }
                steps += 1;
            }
            other if other.starts_with('w') => {
                println!("display width adjustment noted: {other}");
            }
            other => println!("unrecognized command: {other}"),
        }
    }
}

fn report_outcome(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Returned(value) => {
            println!("{}", describe(&value));
            ExitCode::SUCCESS
        }
        Outcome::Trapped(trap) => {
            eprintln!("trap: {trap}");
            ExitCode::from(3)
        }
    }
}

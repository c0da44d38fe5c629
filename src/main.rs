use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use ccl::ast::{Instruction, Program};
use ccl::debugger::ConsoleDebugger;
use ccl::error::{ParseError, RuntimeError};
use ccl::parser::Parser;
use ccl::span::Span;
use ccl::vm::{StdinSource, Vm};

/// Run, inspect, or step through a CCL program.
#[derive(ClapParser)]
#[command(name = "ccl")]
#[command(about = "An interpreter for CCL, a single-character-opcode stack language")]
#[command(version)]
struct Cli {
    /// Path to the CCL source file.
    source: PathBuf,

    /// Parse the program, print its resolved instruction list, and exit.
    #[arg(long = "showstack", visible_alias = "ss")]
    showstack: bool,

    /// Run one instruction at a time, printing source position and VM state.
    #[arg(long = "debug", visible_alias = "d")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.showstack && cli.debug {
        print_usage();
        eprintln!("ERROR: '--showstack' and '--debug' cannot both be given");
        return ExitCode::FAILURE;
    }

    let source = match fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            print_usage();
            eprintln!(
                "ERROR: cannot read '{}': {}",
                cli.source.display(),
                describe_io_error(&e)
            );
            return ExitCode::FAILURE;
        }
    };

    let program = match Parser::parse(&source) {
        Ok(p) => p,
        Err(e) => {
            print_diagnostic_parse(&e);
            return ExitCode::FAILURE;
        }
    };

    if cli.showstack {
        print_showstack(&program);
        return ExitCode::SUCCESS;
    }

    let mut vm = Vm::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = if cli.debug {
        let stderr = io::stderr();
        let mut debug_out = stderr.lock();
        let mut stdin = io::stdin();
        let mut debugger = ConsoleDebugger::new(&mut debug_out, &mut stdin);
        let mut input = StdinSource;
        vm.run_observed(&program, &mut input, &mut out, &mut debugger)
    } else {
        let mut input = StdinSource;
        vm.run(&program, &mut input, &mut out)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_diagnostic_runtime(&e);
            ExitCode::FAILURE
        }
    }
}

fn describe_io_error(e: &io::Error) -> String {
    use io::ErrorKind::*;
    match e.kind() {
        NotFound => "no such file".to_string(),
        PermissionDenied => "permission denied".to_string(),
        _ if e.to_string().contains("Is a directory") => "is a directory, expected a file".to_string(),
        _ => e.to_string(),
    }
}

fn print_usage() {
    eprintln!("USAGE: ccl <source-path> [--showstack|--ss] [--debug|--d]");
    eprintln!("ARGUMENTS:");
    eprintln!("    --showstack, --ss    parse the program, print its instruction list, and exit");
    eprintln!("    --debug, --d         run one instruction at a time with a state dump");
}

fn print_caret(span: &Span) {
    eprintln!("  {:>4} | {}", span.line, span.line_text);
    let marker: String = (0..span.column).map(|_| ' ').collect();
    eprintln!("         {}^", marker);
}

fn print_diagnostic_parse(err: &ParseError) {
    eprintln!("Parse error at line {}, column {}:", err.span.line, err.span.column);
    print_caret(&err.span);
    eprintln!("{}", err.kind);
}

fn print_diagnostic_runtime(err: &RuntimeError) {
    eprintln!("Runtime error at line {}, column {}:", err.span.line, err.span.column);
    print_caret(&err.span);
    eprintln!("{}", err.kind);
}

fn print_showstack(program: &Program) {
    fn dump(instructions: &[Instruction], indent: usize) {
        for (i, instr) in instructions.iter().enumerate() {
            let pad = "  ".repeat(indent);
            match instr {
                Instruction::DefineProcedure { name, body, .. } => {
                    println!("{pad}{i:>4}: define-procedure '{name}'");
                    dump(body, indent + 1);
                }
                other => {
                    println!("{pad}{i:>4}: {}  ({})", other.mnemonic(), other.span());
                }
            }
        }
    }

    println!("-- root --");
    dump(&program.root, 0);
    if !program.all_procedures.is_empty() {
        println!();
        println!("-- all procedures discovered during parsing --");
        for proc in &program.all_procedures {
            println!("procedure '{}':", proc.name);
            dump(&proc.body, 1);
        }
    }
}

use std::{
    io::{stdout, LineWriter},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use ls8::{loader, CPU};

#[derive(Parser, Debug)]
#[command(version, about = "Runs an LS-8 program", long_about = None)]
struct Arguments {
    /// Program in .ls8 text format.
    program: PathBuf,
    /// Log the machine state before every instruction.
    #[arg(short, long)]
    trace: bool,
}

fn run(args: &Arguments) -> ls8::Result<()> {
    let program = loader::load_program_file(&args.program)?;
    let mut cpu = CPU::new(LineWriter::new(stdout()));
    cpu.load(0, &program)?;
    if args.trace {
        cpu.run_with_callback(|cpu| log::info!("{}", cpu.trace()))
    } else {
        cpu.run()
    }
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if args.trace && std::env::var_os("RUST_LOG").is_none() {
        logger.filter_module("ls8", log::LevelFilter::Info);
    }
    logger.init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {}", args.program.display(), err);
            ExitCode::FAILURE
        }
    }
}

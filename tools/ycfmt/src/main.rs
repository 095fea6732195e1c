use anyhow::{anyhow, Result};
use std::env::args_os;
use std::fs::read_to_string;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let file_name = args_os().nth(1).unwrap_or_else(|| "input.yc".into());
    let contents = read_to_string(&file_name)?;
    let program = ychir::parse_source(&contents)
        .map_err(|e| anyhow!(ychir::diagnostic(&contents, e.pos(), &e)))?;
    print!("{}", ychir::print_program(&program));
    Ok(())
}

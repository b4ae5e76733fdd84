//! docseek CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use docseek::cli::args::DocseekArgs;
use docseek::cli::commands::execute_command;

fn main() {
    let args = DocseekArgs::parse();

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error, // Quiet mode
        1 => LevelFilter::Warn,  // Default
        2 => LevelFilter::Info,  // Verbose
        _ => LevelFilter::Debug, // Very verbose (3+)
    };

    Builder::new()
        .filter_level(log_level)
        .parse_env("DOCSEEK_LOG")
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        if e.requires_rebuild() || e.is_fatal() {
            eprintln!("Run `docseek rebuild --discard <LOCATOR>...` to rebuild the index.");
        }
        process::exit(1);
    }
}

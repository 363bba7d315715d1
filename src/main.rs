use alphatester::cli::{run, Cli};
use alphatester::logging::init_logging;
use clap::Parser;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log);
    run(cli)
}

use std::process::ExitCode;

fn main() -> ExitCode {
    arbor_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    solbill_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    orderbot_cli::run()
}

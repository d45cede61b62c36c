use std::process::ExitCode;

fn main() -> ExitCode {
    greenlight_cli::run()
}

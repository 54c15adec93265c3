use std::process::ExitCode;

fn main() -> ExitCode {
    offerhub_cli::run()
}

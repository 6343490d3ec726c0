use std::process::ExitCode;

fn main() -> ExitCode {
    certigest_lib::run()
}

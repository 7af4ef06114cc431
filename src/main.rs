use std::process::ExitCode;

fn main() -> ExitCode {
    magiccsv_lib::run()
}

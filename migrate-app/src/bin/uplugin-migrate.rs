use std::process::ExitCode;

pub fn main() -> ExitCode {
    migrate_app::app::launch()
}

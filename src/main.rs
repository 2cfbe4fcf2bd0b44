use std::process::ExitCode;

mod app;
mod cli;
mod report;
mod shell;


fn main() -> ExitCode {
    app::main()
}

use clap::Parser;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use progress::colorize::render_page;
use progress::config::resolve_config;
use progress::inout::{replace_extension, Streams};

#[derive(Debug, Parser)]
#[command(
    name = "colorize",
    about = "Render Python source as colored HTML.",
    long_about = "Reads INPUT (or stdin when INPUT is missing or '-') and writes an HTML <pre> block to OUTPUT (or stdout).\n\nToken colors come from the `colors` table of the config file."
)]
struct Args {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Load colors from PATH instead of ~/.config/progress.yml."
    )]
    config: Option<PathBuf>,

    #[arg(
        short = 'd',
        long = "derive-output",
        conflicts_with = "output",
        help = "Write next to INPUT, with its extension replaced by .html."
    )]
    derive_output: bool,

    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), String> {
    let config = resolve_config(args.config.as_deref())?;
    let mut streams = Streams::select(args.input.as_deref(), args.output.as_deref());
    for warning in &streams.warnings {
        eprintln!("Warning: {}", warning);
    }

    let source = streams
        .read_to_string()
        .map_err(|err| format!("Failed to read input: {}", err))?;
    let page = render_page(&source, &config.color_table());

    match &streams.input_path {
        Some(path) => eprintln!("Taking input from {}", path.display()),
        None => eprintln!("Taking input from stdin"),
    }

    if args.derive_output && streams.infile_only {
        let file = streams
            .open_derived_output("html")
            .map_err(|err| format!("Failed to create output: {}", err))?;
        if let Some(input) = &streams.input_path {
            eprintln!(
                "Saving output to {}",
                replace_extension(input, "html").display()
            );
        }
        let mut out = BufWriter::new(file);
        out.write_all(page.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|err| format!("Failed to write output: {}", err))?;
        return Ok(());
    }

    match &streams.output_path {
        Some(path) => eprintln!("Saving output to {}", path.display()),
        None => eprintln!("Saving output to stdout"),
    }
    streams
        .output
        .write_all(page.as_bytes())
        .and_then(|_| streams.output.flush())
        .map_err(|err| format!("Failed to write output: {}", err))
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(err.exit_code() as u8);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::from(1)
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Command-line interface for mdfence.
//!
//! This binary provides the `mdfence` command for rewriting `Code snippet`
//! markers in exported chat markdown, either one file at a time or for a
//! whole directory tree.

use lexopt::prelude::*;
use mdfence::files::{self, BatchReport, FileOutcome};
use mdfence::transform::{OptionalTransform, TransformOptions};
use snafu::{OptionExt, ensure, prelude::*};
use std::path::{Path, PathBuf};

/// Where single-file mode writes its result.
enum OutputTarget {
    /// Write to the given file.
    File(PathBuf),
    /// Write to stdout.
    Stdout,
}

enum Mode {
    /// One input file, written in place unless an output is given.
    Single {
        input: PathBuf,
        output: Option<OutputTarget>,
    },
    /// Every markdown file under `indir`, mirrored into `outdir`.
    Batch { indir: PathBuf, outdir: PathBuf },
}

struct Cli {
    mode: Mode,
    options: TransformOptions,
    json: bool,
    quiet: bool,
    dry_run: bool,
}

/// Arguments as given on the command line, before mode validation.
#[derive(Default)]
struct RawArgs {
    inputs: Vec<PathBuf>,
    output: Option<OutputTarget>,
    indir: Option<PathBuf>,
    outdir: Option<PathBuf>,
    language: Option<String>,
    enable: Vec<String>,
    json: bool,
    quiet: bool,
    dry_run: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("unknown transform {name:?} (see --list-transforms)"))]
    UnknownTransform { name: String },

    #[snafu(display("cannot combine an input file with --indir"))]
    ConflictingInputs,

    #[snafu(display("--outdir is required when --indir is used"))]
    MissingOutdir,

    #[snafu(display("--indir is required when --outdir is used"))]
    MissingIndir,

    #[snafu(display("--output cannot be combined with --indir (use --outdir)"))]
    OutputWithIndir,

    #[snafu(display("an input file or --indir with --outdir is required"))]
    NoInput,

    #[snafu(display("only one input file is allowed (use --indir for directories)"))]
    TooManyInputs,

    #[snafu(display("processing failed: {source}"))]
    Transform { source: files::FileError },

    #[snafu(display("{failed} of {total} files failed"))]
    BatchFailed { failed: usize, total: usize },

    #[snafu(display("failed to serialize report: {source}"))]
    SerializeReport { source: serde_json::Error },
}

fn print_help() {
    println!(
        "\
{name} {version}
Rewrite `Code snippet` markers in exported chats as fenced code blocks

Usage: {name} [OPTIONS] <INPUT>
       {name} [OPTIONS] --indir <DIR> --outdir <DIR>

Arguments:
  <INPUT>  Markdown file to transform (overwritten unless -o is given)

Options:
  -o, --output <OUTPUT>     Write to OUTPUT instead of the input file (- for stdout)
      --indir <DIR>         Transform every .md/.markdown file under DIR
      --outdir <DIR>        Mirror transformed files into DIR (required with --indir)
      --lang <NAME>         Fence language for markers (default: mermaid)
      --enable <LIST>       Comma-separated optional transforms to run
      --list-transforms     List optional transforms and exit
      --json                Print a JSON report of a batch run to stdout

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be written without writing
  -h, --help                Print help
  -V, --version             Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn print_transforms() {
    println!("Optional transforms (enable with --enable):");
    for transform in OptionalTransform::ALL {
        println!("  {:<20} {}", transform.name(), transform.description());
    }
}

fn parse_args() -> Result<RawArgs, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args_os().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut args = RawArgs::default();

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val = PathBuf::from(parser.value()?);
                args.output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::File(val)
                });
            }
            Long("indir") => args.indir = Some(parser.value()?.into()),
            Long("outdir") => args.outdir = Some(parser.value()?.into()),
            Long("lang") => {
                let lang = parser.value()?.string()?;
                if lang.is_empty() || lang.contains(['`', '\n', '\r']) {
                    return Err("--lang must be a non-empty name without backticks".into());
                }
                args.language = Some(lang);
            }
            Long("enable") => {
                let list = parser.value()?.string()?;
                args.enable.extend(
                    list.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_owned),
                );
            }
            Long("list-transforms") => {
                print_transforms();
                std::process::exit(0);
            }
            Long("json") => args.json = true,
            Short('q') | Long("quiet") => args.quiet = true,
            Short('n') | Long("dry-run") => args.dry_run = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => args.inputs.push(val.into()),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(args)
}

/// Checks flag combinations and builds the transform options.
fn resolve(args: RawArgs) -> Result<Cli, Error> {
    let mut options = TransformOptions::default();
    if let Some(language) = args.language {
        options.language = language;
    }
    for name in &args.enable {
        let transform =
            OptionalTransform::from_name(name).context(UnknownTransformSnafu { name })?;
        options.enable(transform);
    }

    let mode = match (args.indir, args.outdir) {
        (Some(indir), Some(outdir)) => {
            ensure!(args.inputs.is_empty(), ConflictingInputsSnafu);
            ensure!(args.output.is_none(), OutputWithIndirSnafu);
            Mode::Batch { indir, outdir }
        }
        (Some(_), None) => return MissingOutdirSnafu.fail(),
        (None, Some(_)) => return MissingIndirSnafu.fail(),
        (None, None) => {
            ensure!(args.inputs.len() <= 1, TooManyInputsSnafu);
            let input = args.inputs.into_iter().next().context(NoInputSnafu)?;
            Mode::Single {
                input,
                output: args.output,
            }
        }
    };

    Ok(Cli {
        mode,
        options,
        json: args.json,
        quiet: args.quiet,
        dry_run: args.dry_run,
    })
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let args = parse_args().context(ParseArgsSnafu)?;
    let cli = resolve(args)?;

    match &cli.mode {
        Mode::Single { input, output } => process_single(input, output.as_ref(), &cli),
        Mode::Batch { indir, outdir } => process_batch(indir, outdir, &cli),
    }
}

/// Transforms one file, writing in place, to another file, or to stdout.
fn process_single(input: &Path, output: Option<&OutputTarget>, cli: &Cli) -> Result<(), Error> {
    let output = match output {
        Some(OutputTarget::Stdout) => {
            if cli.dry_run {
                eprintln!("Would write {} to stdout", input.display());
                return Ok(());
            }
            let text = files::transform_to_string(input, &cli.options).context(TransformSnafu)?;
            print!("{text}");
            return Ok(());
        }
        Some(OutputTarget::File(path)) => Some(path.as_path()),
        None => None,
    };

    if cli.dry_run {
        eprintln!("Would write {}", output.unwrap_or(input).display());
        return Ok(());
    }

    let written = files::transform_file(input, output, &cli.options).context(TransformSnafu)?;

    if !cli.quiet {
        eprintln!("Wrote {}", written.display());
    }
    Ok(())
}

/// Transforms a directory tree, continuing past files that fail.
fn process_batch(indir: &Path, outdir: &Path, cli: &Cli) -> Result<(), Error> {
    let entries = files::plan_batch(indir, outdir).context(TransformSnafu)?;

    // Handle dry-run mode
    if cli.dry_run {
        for entry in &entries {
            eprintln!("Would write {}", entry.output.display());
        }
        return Ok(());
    }

    let report = files::run_batch(&entries, &cli.options);
    print_report(&report, cli.quiet);

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context(SerializeReportSnafu)?;
        println!("{json}");
    }

    ensure!(
        report.is_success(),
        BatchFailedSnafu {
            failed: report.failed(),
            total: report.outcomes.len(),
        }
    );
    Ok(())
}

/// Prints per-file progress and a summary. Failures are always shown.
fn print_report(report: &BatchReport, quiet: bool) {
    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Written { output, .. } => {
                if !quiet {
                    eprintln!("Wrote {}", output.display());
                }
            }
            FileOutcome::Failed { error, .. } => {
                eprintln!("Failed {}: {error}", outcome.input().display());
            }
        }
    }

    if !quiet || !report.is_success() {
        eprintln!(
            "{} written, {} failed",
            report.written(),
            report.failed()
        );
    }
}

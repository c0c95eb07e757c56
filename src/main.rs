mod debug_report;

use phonelink::{Clock, Document, IdleSupport, Linker, Options, SystemClock, TelUri};
use std::io::{self, IsTerminal, Read};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PHONELINK_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    init_tracing(config.verbose);

    if let Some(uri) = &config.resolve {
        match TelUri::parse(uri) {
            Ok(tel) => println!("{}", tel.canonical()),
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        }
        return;
    }

    let started = Instant::now();
    let clock = Rc::new(SystemClock::new());
    let mut linker = match Linker::with_clock(config.options, clock.clone(), config.idle) {
        Ok(linker) => linker,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    linker.enable_trace();

    let mut doc = document_from(&config.input);
    linker.scan_document(&mut doc);
    run_to_completion(&mut linker, &mut doc, clock.as_ref());

    let trace = linker.take_trace();
    debug_report::print_run(&config.input, &doc, &trace, linker.stats(), started.elapsed(), config.color);
}

/// One paragraph per non-blank input line.
fn document_from(input: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    for line in input.lines().filter(|l| !l.trim().is_empty()) {
        let p = doc.create_element("p");
        let t = doc.create_text(line);
        if let Err(err) = doc.append_child(root, p).and_then(|()| doc.append_child(p, t)) {
            tracing::error!(%err, "could not build input document");
        }
    }
    doc
}

/// Act as the host event loop: the CLI is idle whenever the engine wants it
/// to be, and sleeps until the next timer otherwise.
fn run_to_completion(linker: &mut Linker, doc: &mut Document, clock: &SystemClock) {
    loop {
        while linker.run_idle(doc) {}
        let Some(deadline) = linker.next_deadline() else {
            break;
        };
        let now = clock.now();
        if deadline > now {
            std::thread::sleep(Duration::from_millis(deadline - now));
        }
        linker.tick(doc);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "phonelink=debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

struct CliConfig {
    input: String,
    options: Options,
    idle: IdleSupport,
    resolve: Option<String>,
    color: bool,
    verbose: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut options = Options::default();
    let mut idle = IdleSupport::Available;
    let mut resolve = None;
    let mut color = io::stdout().is_terminal();
    let mut verbose = false;
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("phonelink {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "-v" | "--verbose" => verbose = true,
            "--no-idle" => idle = IdleSupport::Unavailable,
            "--batch-size" => {
                let value = args.next().ok_or_else(|| "error: --batch-size expects a value".to_string())?;
                options.batch_size = parse_count("--batch-size", &value)?;
            }
            "--max-units" => {
                let value = args.next().ok_or_else(|| "error: --max-units expects a value".to_string())?;
                options.max_text_units = parse_count("--max-units", &value)?;
            }
            "--resolve" => {
                let value = args.next().ok_or_else(|| "error: --resolve expects a value".to_string())?;
                resolve = Some(value);
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                set_input(&mut input, value)?;
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    set_input(&mut input, rest)?;
                }
                break;
            }
            _ if arg.starts_with("--batch-size=") => {
                options.batch_size = parse_count("--batch-size", arg.trim_start_matches("--batch-size="))?;
            }
            _ if arg.starts_with("--max-units=") => {
                options.max_text_units = parse_count("--max-units", arg.trim_start_matches("--max-units="))?;
            }
            _ if arg.starts_with("--resolve=") => {
                resolve = Some(arg.trim_start_matches("--resolve=").to_string());
            }
            _ if arg.starts_with("--input=") => {
                set_input(&mut input, arg.trim_start_matches("--input=").to_string())?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                set_input(&mut input, rest)?;
                break;
            }
        }
    }

    if resolve.is_some() {
        return Ok(CliConfig { input: input.unwrap_or_default(), options, idle, resolve, color, verbose });
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input, options, idle, resolve, color, verbose })
}

fn set_input(input: &mut Option<String>, value: String) -> Result<(), String> {
    if input.is_some() {
        return Err("error: input provided multiple times".to_string());
    }
    *input = Some(value);
    Ok(())
}

fn parse_count<T: std::str::FromStr + PartialEq + From<u8>>(flag: &str, value: &str) -> Result<T, String> {
    match value.trim().parse::<T>() {
        Ok(n) if n != T::from(0) => Ok(n),
        _ => Err(format!("error: invalid {flag} '{value}' (expected a positive integer)")),
    }
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    let defaults = Options::default();
    format!(
        "phonelink {version}

Finds phone numbers in text and turns them into tel: links.

Usage:
  phonelink [OPTIONS] [--] <input...>
  phonelink [OPTIONS] --input <text>
  phonelink --resolve <uri>

Each non-blank input line becomes one paragraph of the scanned document.

Options:
  -i, --input <text>         Input text to scan. If omitted, reads remaining args
                             or stdin when no args are provided.
  --batch-size <n>           Text units per slice. Default: {batch}
  --max-units <n>            Processed-unit ceiling. Default: {max}
  --no-idle                  Behave like a host without idle callbacks
                             (slices run on a fixed-delay timer).
  --resolve <uri>            Print the dialable number in a tel: or callto: URI.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -v, --verbose              Log engine activity to stderr ({env} overrides).
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  Success.
  2  Invalid arguments, input or URI.
",
        version = env!("CARGO_PKG_VERSION"),
        batch = defaults.batch_size,
        max = defaults.max_text_units,
        env = LOG_ENV,
    )
}

//! Command-line front end.
//!
//! Thin glue over the codec layer: parse the options, open the two streams,
//! dispatch, and turn any error into exit code 1 with a message on stderr.
//! Decompression never needs an algorithm flag; the stream's magic number
//! says which codec wrote it.
#![warn(rust_2018_idioms)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::process::exit;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use squeeze::codec::{self, Method};

#[derive(Parser, Debug)]
#[command(
    name = "squeeze",
    version,
    about = "Compress and decompress files with classic algorithms (huf, lz77, lz78, lzw)"
)]
struct Args {
    /// Compress from this file; use '-' for stdin
    #[arg(short = 'c', value_name = "FILE", conflicts_with = "extract")]
    compress: Option<String>,

    /// Decompress from this file; use '-' for stdin
    #[arg(short = 'x', value_name = "FILE")]
    extract: Option<String>,

    /// Write the result here; use '-' for stdout
    #[arg(short = 'o', value_name = "FILE", default_value = "-")]
    output: String,

    /// Algorithm to compress with; decompression detects it from the stream
    #[arg(short = 'a', value_enum)]
    algorithm: Option<Method>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Log to stderr: stdout may be carrying the output stream.
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut output = open_output(&args.output)?;

    match (args.compress, args.extract) {
        (Some(path), _) => {
            let method = args.algorithm.unwrap_or(Method::Lzw);
            if path == "-" {
                if method == Method::Huf {
                    bail!("huffman cannot compress from a stream; choose a file");
                }
                info!("compressing stdin with {:?}", method);
                codec::compress_stream(method, &mut io::stdin().lock(), &mut output)?;
            } else {
                info!("compressing {} with {:?}", path, method);
                let file =
                    File::open(&path).with_context(|| format!("could not open {}", path))?;
                codec::compress(method, &mut BufReader::new(file), &mut output)?;
            }
        }
        (None, extract) => {
            if args.algorithm.is_some() {
                warn!("the decompression algorithm is selected from the input stream");
            }
            let path = extract.unwrap_or_else(|| "-".to_string());
            if path == "-" {
                info!("decompressing stdin");
                codec::decompress(&mut io::stdin().lock(), &mut output)?;
            } else {
                info!("decompressing {}", path);
                let file =
                    File::open(&path).with_context(|| format!("could not open {}", path))?;
                codec::decompress(&mut BufReader::new(file), &mut output)?;
            }
        }
    }

    output.flush()?;
    info!("done in {:.2?}", start.elapsed());
    Ok(())
}

fn open_output(path: &str) -> anyhow::Result<Box<dyn Write>> {
    Ok(if path == "-" {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        let file =
            File::create(path).with_context(|| format!("could not create {}", path))?;
        Box::new(BufWriter::new(file))
    })
}

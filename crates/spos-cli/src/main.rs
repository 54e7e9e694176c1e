//! `spos` binary.
//!
//! Encodes JSON payloads into compact bit-aligned messages and back,
//! driven by JSON payload specification files. Stdin supplies the
//! payload (encode) or the message (decode); stdout receives the result.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use spos_core::{decode, decode_from_specs, encode, Message, MessageFormat, PayloadSpec};
use spos_random::random_payload;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Serialize objects into compact bit-aligned messages.
#[derive(Parser, Debug)]
#[command(name = "spos", version, about)]
struct Args {
    /// Decode a message instead of encoding a payload
    #[arg(short = 'd', long)]
    decode: bool,

    /// JSON payload specification files
    #[arg(
        short = 'p',
        long = "payload-specs",
        value_name = "PAYLOAD_SPEC",
        required = true,
        num_args = 1..
    )]
    payload_specs: Vec<PathBuf>,

    /// Message format
    #[arg(short = 'f', long, value_name = "FORMAT", default_value = "bytes")]
    format: String,

    /// Emit a random message for the spec
    #[arg(short = 'r', long, conflicts_with = "random_input")]
    random: bool,

    /// Emit a random payload data input for the spec
    #[arg(short = 'I', long)]
    random_input: bool,

    /// Include metadata in decode output
    #[arg(short = 'm', long)]
    meta: bool,

    /// Print payload spec statistics
    #[arg(short = 's', long)]
    stats: bool,

    /// Input file (defaults to stdin)
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new(&args.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let format: MessageFormat = args
        .format
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid format `{}`: use bin, hex or bytes", args.format))?;

    let specs = args
        .payload_specs
        .iter()
        .map(|path| load_spec(path))
        .collect::<Result<Vec<_>>>()?;
    debug!(specs = specs.len(), "payload specs loaded");

    if args.stats {
        let stats: Vec<Value> = specs.iter().map(PayloadSpec::stats).collect();
        return write_text(
            args.output.as_deref(),
            &format!("{}\n", serde_json::to_string_pretty(&stats)?),
        );
    }

    if args.random || args.random_input {
        let spec = &specs[0];
        let (message, payload_data) =
            random_payload(spec, format).context("random payload generation failed")?;
        if args.random_input {
            return write_text(
                args.output.as_deref(),
                &format!("{}\n", serde_json::to_string_pretty(&payload_data)?),
            );
        }
        return write_message(args.output.as_deref(), &message);
    }

    if args.decode {
        run_decode(&args, &specs, format)
    } else {
        run_encode(&args, &specs, format)
    }
}

fn run_encode(args: &Args, specs: &[PayloadSpec], format: MessageFormat) -> Result<()> {
    if specs.len() > 1 {
        bail!("specify only one payload spec (-p, --payload-specs) for encoding");
    }
    let raw = read_input(args.input.as_deref())?;
    let payload_data: Value = serde_json::from_slice(&raw).context("payload data is not JSON")?;
    let message = encode(&payload_data, &specs[0], format)?;
    write_message(args.output.as_deref(), &message)
}

fn run_decode(args: &Args, specs: &[PayloadSpec], format: MessageFormat) -> Result<()> {
    let raw = read_input(args.input.as_deref())?;
    let message = match format {
        MessageFormat::Bytes => Message::Bytes(raw),
        MessageFormat::Bin | MessageFormat::Hex => {
            let text = String::from_utf8(raw).context("message is not valid text")?;
            Message::parse_text(&text)?
        }
    };
    let decoded = if specs.len() == 1 {
        decode(&message, &specs[0])?
    } else {
        decode_from_specs(&message, specs)?
    };
    let output = if args.meta {
        serde_json::json!({"body": decoded.body, "meta": decoded.meta})
    } else {
        decoded.body
    };
    write_text(
        args.output.as_deref(),
        &format!("{}\n", serde_json::to_string_pretty(&output)?),
    )
}

fn load_spec(path: &Path) -> Result<PayloadSpec> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read payload spec {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("payload spec {} is not JSON", path.display()))?;
    let spec = PayloadSpec::compile(&value)
        .with_context(|| format!("payload spec {} is invalid", path.display()))?;
    Ok(spec)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            fs::read(path).with_context(|| format!("cannot read input {}", path.display()))
        }
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("cannot read stdin")?;
            Ok(buffer)
        }
    }
}

fn write_message(path: Option<&Path>, message: &Message) -> Result<()> {
    match message {
        Message::Bin(s) => write_text(path, &format!("{s}\n")),
        Message::Hex(s) => write_text(path, &format!("{s}\n")),
        Message::Bytes(bytes) => write_bytes(path, bytes),
    }
}

fn write_text(path: Option<&Path>, text: &str) -> Result<()> {
    write_bytes(path, text.as_bytes())
}

fn write_bytes(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(path, bytes)
            .with_context(|| format!("cannot write output {}", path.display())),
        None => {
            io::stdout().write_all(bytes).context("cannot write stdout")?;
            Ok(())
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hwire-dump: decode, encode and inspect hwire messages.
//!
//! ```text
//! hwire-dump schema shop.yaml
//! hwire-dump decode --schema shop.yaml --type ::Shop::Order msg.bin
//! hwire-dump decode --schema shop.yaml --type ::Shop::Order --hex "0a 00 00 00 01 01 ..."
//! hwire-dump exception --schema shop.yaml reply.bin
//! hwire-dump encode --schema shop.yaml --type ::Shop::Line --value '{"sku":"a","qty":2}'
//! hwire-dump inspect msg.bin
//! ```

mod encode;
mod input;
mod render;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use hwire::marshal::{decode_exception_with, decode_with, encode_exception_with, encode_with};
use hwire::schema::{Schema, SchemaLoader};
use hwire::stream::InputStream;
use hwire::{CodecConfig, FormatType};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hwire-dump")]
#[command(about = "Decode, encode and inspect hwire messages against a schema document")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the types of a schema document
    Schema {
        /// Schema document (YAML, or JSON with a .json extension)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Decode one encapsulated value
    Decode {
        #[command(flatten)]
        message: MessageArgs,

        /// Type of the encoded value
        #[arg(short, long = "type", value_name = "NAME")]
        type_name: String,

        /// Fail on unknown class types instead of slicing them
        #[arg(long)]
        no_slicing: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Decode one encapsulated user exception
    Exception {
        #[command(flatten)]
        message: MessageArgs,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Encode a JSON value and print the message as hex
    Encode {
        /// Schema document
        #[arg(short, long, value_name = "FILE")]
        schema: PathBuf,

        /// Type of the value (omit with --exception)
        #[arg(short, long = "type", value_name = "NAME")]
        type_name: Option<String>,

        /// JSON value, or @FILE to read it from a file
        #[arg(long, value_name = "JSON")]
        value: String,

        /// Treat the value as a user exception carrying an "@type"
        #[arg(long)]
        exception: bool,

        /// Class format, overriding the schema's codec section
        #[arg(long, value_name = "compact|sliced")]
        class_format: Option<FormatType>,

        /// Also write the raw message to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show the encapsulation header and a hex dump
    Inspect {
        /// Message file ('-' for stdin)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Message as a hex string instead of a file
        #[arg(long, value_name = "HEX")]
        hex: Option<String>,
    },
}

#[derive(clap::Args)]
struct MessageArgs {
    /// Schema document
    #[arg(short, long, value_name = "FILE")]
    schema: PathBuf,

    /// Message file ('-' for stdin)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Message as a hex string instead of a file
    #[arg(long, value_name = "HEX")]
    hex: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Indented JSON
    Pretty,
    /// One line of JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Schema { file } => cmd_schema(&file),
        Commands::Decode {
            message,
            type_name,
            no_slicing,
            format,
        } => cmd_decode(&message, &type_name, no_slicing, format),
        Commands::Exception { message, format } => cmd_exception(&message, format),
        Commands::Encode {
            schema,
            type_name,
            value,
            exception,
            class_format,
            output,
        } => cmd_encode(
            &schema,
            type_name.as_deref(),
            &value,
            exception,
            class_format,
            output.as_deref(),
        ),
        Commands::Inspect { input, hex } => cmd_inspect(input.as_deref(), hex.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}

fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    SchemaLoader::load_from_file(path).with_context(|| format!("loading schema {}", path.display()))
}

fn message_bytes(input: Option<&Path>, hex: Option<&str>) -> anyhow::Result<Vec<u8>> {
    match (input, hex) {
        (Some(_), Some(_)) => bail!("give either a message file or --hex, not both"),
        (_, Some(hex)) => input::parse_hex(hex),
        (Some(path), None) => input::read_file(path),
        (None, None) => input::read_file(Path::new("-")),
    }
}

fn print_json(json: &serde_json::Value, format: OutputFormat) -> anyhow::Result<()> {
    let text = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(json)?,
        OutputFormat::Json => serde_json::to_string(json)?,
    };
    println!("{}", text);
    Ok(())
}

fn cmd_schema(file: &Path) -> anyhow::Result<()> {
    let schema = load_schema(file)?;
    println!(
        "{} {} (encoding {}, {:?} format)",
        "Schema".bold(),
        file.display(),
        schema.config.encoding,
        schema.config.format
    );
    for (_, name, desc) in schema.registry.types() {
        let kind = desc.map_or("declared", |d| d.kind_name());
        println!("  {:<12} {}", kind.cyan(), name);
    }
    Ok(())
}

fn cmd_decode(
    args: &MessageArgs,
    type_name: &str,
    no_slicing: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let schema = load_schema(&args.schema)?;
    let ty = schema.type_named(type_name)?;
    let bytes = message_bytes(args.input.as_deref(), args.hex.as_deref())?;
    log::info!("[dump] decoding {} bytes as {}", bytes.len(), type_name);

    let config = schema.config.clone().with_slice_values(!no_slicing);
    let (value, graph) = decode_with(&schema.registry, config, &bytes, ty)?;
    let json = render::Renderer::new(&schema.registry, &graph).value(Some(ty), &value);
    print_json(&json, format)
}

fn cmd_exception(args: &MessageArgs, format: OutputFormat) -> anyhow::Result<()> {
    let schema = load_schema(&args.schema)?;
    let bytes = message_bytes(args.input.as_deref(), args.hex.as_deref())?;
    log::info!("[dump] decoding {} bytes as a user exception", bytes.len());

    let (exception, graph) =
        decode_exception_with(&schema.registry, schema.config.clone(), &bytes)?;
    let json = render::Renderer::new(&schema.registry, &graph).exception(&exception);
    print_json(&json, format)
}

fn cmd_encode(
    schema_path: &Path,
    type_name: Option<&str>,
    value: &str,
    exception: bool,
    class_format: Option<FormatType>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let schema = load_schema(schema_path)?;
    let text = match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path))?,
        None => value.to_string(),
    };
    let json: serde_json::Value = serde_json::from_str(&text).context("value is not valid JSON")?;

    let mut config: CodecConfig = schema.config.clone();
    if let Some(format) = class_format {
        config = config.with_format(format);
    }

    let mut builder = encode::ValueBuilder::new(&schema.registry);
    let bytes = if exception {
        let exception = builder.exception(&json)?;
        let graph = builder.finish();
        encode_exception_with(&schema.registry, &graph, config, &exception)?
    } else {
        let Some(type_name) = type_name else {
            bail!("--type is required unless --exception is given");
        };
        let ty = schema.type_named(type_name)?;
        let value = builder.build(ty, &json)?;
        let graph = builder.finish();
        encode_with(&schema.registry, &graph, config, ty, &value)?
    };

    if let Some(path) = output {
        std::fs::write(path, &bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("[dump] wrote {} bytes to {}", bytes.len(), path.display());
    }
    println!("{}", input::to_hex(&bytes));
    Ok(())
}

fn cmd_inspect(path: Option<&Path>, hex: Option<&str>) -> anyhow::Result<()> {
    let bytes = message_bytes(path, hex)?;
    let mut stream = InputStream::new(&bytes);
    let size = stream.read_i32().context("no encapsulation header")?;
    let major = stream.read_u8()?;
    let minor = stream.read_u8()?;

    println!("{} {} bytes", "Message".bold(), bytes.len());
    println!("  encapsulation size  {}", size);
    println!("  encoding            {}.{}", major, minor);
    let declared = usize::try_from(size).unwrap_or(0);
    if declared != bytes.len() {
        println!(
            "  {}",
            format!("size mismatch: header says {}, message has {}", size, bytes.len()).yellow()
        );
    }
    println!();
    print!("{}", input::hex_dump(&bytes));
    Ok(())
}

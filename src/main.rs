//! Command-line interface for xmlxsd

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::Read;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlxsd::{SchemaParser, Settings};

/// Exit code for a document that failed to parse or validate
#[cfg(feature = "cli")]
const EXIT_DOCUMENT: i32 = 1;

/// Exit code for schemas that failed to load
#[cfg(feature = "cli")]
const EXIT_SCHEMA: i32 = 2;

#[cfg(feature = "cli")]
type Failure = (i32, Box<dyn std::error::Error>);

#[cfg(feature = "cli")]
fn fail<E: Into<Box<dyn std::error::Error>>>(code: i32) -> impl FnOnce(E) -> Failure {
    move |e| (code, e.into())
}

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlxsd")]
#[command(author, version, about = "Convert XML documents to typed JSON using their XML Schemas", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Schema sources shared by the commands that compile schemas
#[cfg(feature = "cli")]
#[derive(clap::Args, Debug)]
struct SchemaArgs {
    /// Preload a schema, as NAMESPACE=PATH (repeatable)
    #[arg(short, long = "schema", value_name = "NS=PATH")]
    schemas: Vec<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert an XML document to JSON
    Convert {
        /// XML file to convert (stdin when omitted or `-`)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        #[command(flatten)]
        schemas: SchemaArgs,

        /// Fetch schemas named by schemaLocation hints
        #[arg(short, long)]
        download: bool,

        /// Keep namespace qualification on output keys
        #[arg(short, long)]
        namespaced: bool,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show what the compiled schemas declare
    Inspect {
        #[command(flatten)]
        schemas: SchemaArgs,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the schemaLocation hints of a document
    Schemas {
        /// XML file to scan (stdin when omitted or `-`)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Convert {
            file,
            schemas,
            download,
            namespaced,
            pretty,
            output,
        } => cmd_convert(file, schemas, download, namespaced, pretty, output),
        Commands::Inspect { schemas, json } => cmd_inspect(schemas, json),
        Commands::Schemas { file, json } => cmd_schemas(file, json),
    };

    if let Err((code, e)) = result {
        eprintln!("Error: {}", e);
        std::process::exit(code);
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn read_input(file: Option<PathBuf>) -> std::io::Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

#[cfg(feature = "cli")]
fn load_settings(args: SchemaArgs) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    for entry in args.schemas {
        let (namespace, path) = entry
            .split_once('=')
            .ok_or_else(|| format!("invalid schema '{}': expected NAMESPACE=PATH", entry))?;
        settings
            .schemas
            .insert(namespace.to_string(), PathBuf::from(path));
    }
    Ok(settings)
}

#[cfg(feature = "cli")]
fn cmd_convert(
    file: Option<PathBuf>,
    schemas: SchemaArgs,
    download: bool,
    namespaced: bool,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), Failure> {
    let mut settings = load_settings(schemas).map_err(fail(EXIT_SCHEMA))?;
    if download {
        settings.options.download_schemas = true;
    }
    if namespaced {
        settings.options.output_with_namespace = true;
    }
    let parser = SchemaParser::from_settings(&settings).map_err(fail(EXIT_SCHEMA))?;

    let xml = read_input(file).map_err(fail(EXIT_DOCUMENT))?;
    let parsed = parser
        .parse_document(&xml, &settings.options)
        .map_err(fail(EXIT_DOCUMENT))?;
    let json = parsed.to_json(&settings.options);

    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(fail(EXIT_DOCUMENT))?;

    match output {
        Some(path) => fs::write(path, &text).map_err(fail(EXIT_DOCUMENT))?,
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_inspect(schemas: SchemaArgs, json_output: bool) -> Result<(), Failure> {
    use serde_json::json;
    use xmlxsd::XSD_NAMESPACE;

    let settings = load_settings(schemas).map_err(fail(EXIT_SCHEMA))?;
    let parser = SchemaParser::from_settings(&settings).map_err(fail(EXIT_SCHEMA))?;
    let registry = parser.registry().map_err(fail(EXIT_SCHEMA))?;

    let types: Vec<_> = registry
        .types()
        .iter()
        .filter(|(name, _)| !name.is_in(XSD_NAMESPACE))
        .collect();

    if json_output {
        let schemas: serde_json::Map<String, serde_json::Value> = registry
            .known_schemas()
            .iter()
            .map(|(namespace, texts)| (namespace.clone(), json!(texts.len())))
            .collect();
        let type_list: Vec<serde_json::Value> = types
            .iter()
            .map(|(name, def)| json!({"name": name.to_string(), "kind": def.kind()}))
            .collect();
        let elements: Vec<String> = registry.elements().keys().map(ToString::to_string).collect();
        let attributes: Vec<String> =
            registry.attributes().keys().map(ToString::to_string).collect();
        let output = json!({
            "schemas": schemas,
            "types": type_list,
            "elements": elements,
            "attributes": attributes,
        });
        let text = serde_json::to_string_pretty(&output).map_err(fail(EXIT_SCHEMA))?;
        println!("{}", text);
        return Ok(());
    }

    println!("xmlxsd v{}", xmlxsd::VERSION);
    println!();
    println!("Statistics:");
    println!("  Schema Documents: {}", registry.schema_count());
    println!("  Types: {} ({} built-in)", types.len(), registry.type_count() - types.len());
    println!("  Global Elements: {}", registry.element_count());
    println!("  Global Attributes: {}", registry.attribute_count());

    println!("\n=== Types ===");
    for (name, def) in &types {
        println!("  {} ({})", name, def.kind());
    }
    println!("\n=== Global Elements ===");
    for name in registry.elements().keys() {
        println!("  {}", name);
    }
    println!("\n=== Global Attributes ===");
    for name in registry.attributes().keys() {
        println!("  {}", name);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_schemas(file: Option<PathBuf>, json_output: bool) -> Result<(), Failure> {
    let xml = read_input(file).map_err(fail(EXIT_DOCUMENT))?;
    let found = SchemaParser::new()
        .find_schemas(&xml)
        .map_err(fail(EXIT_DOCUMENT))?;

    if json_output {
        let text = serde_json::to_string_pretty(&found).map_err(fail(EXIT_DOCUMENT))?;
        println!("{}", text);
    } else {
        for (namespace, location) in found.iter() {
            println!("{} {}", namespace, location);
        }
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}

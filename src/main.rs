//! Command-line interface for xpath-schema

#[cfg(feature = "cli")]
use clap::{ArgAction, Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xpath_schema::{Document, NamespaceMap, ParsedXPath, SchemaDefinition, StepResolver};
#[cfg(feature = "cli")]
use xpath_schema::xpath::PathResolver;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xpath-schema")]
#[command(author, version, about = "Validate XML documents against XPath schemas", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an XML document and print the record or the errors as JSON
    Validate {
        /// Path to the JSON schema definition
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Evaluate a path expression and print the text of every match
    Select {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Path expression, evaluated from the root element
        #[arg(short = 'x', long)]
        path: String,

        /// Namespace prefix binding, as prefix=uri
        #[arg(short, long = "ns", value_name = "PREFIX=URI")]
        namespaces: Vec<String>,
    },
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            schema,
            file,
            pretty,
        } => cmd_validate(schema, file, pretty),
        Commands::Select {
            file,
            path,
            namespaces,
        } => cmd_select(file, path, namespaces),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
fn to_json(value: &serde_json::Value, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

#[cfg(feature = "cli")]
fn cmd_validate(
    schema_path: PathBuf,
    file: PathBuf,
    pretty: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let definition = SchemaDefinition::from_file(&schema_path)?;
    let schema = definition.build()?;

    let xml = fs::read_to_string(&file)?;
    let doc = Document::parse_with_limits(&xml, &definition.limits())?;

    match schema.apply_document(&doc) {
        Ok(json) => {
            println!("{}", to_json(&json, pretty)?);
            Ok(true)
        }
        Err(detail) => {
            tracing::info!(errors = detail.leaf_count(), "document failed validation");
            println!("{}", to_json(&detail.to_json(), pretty)?);
            Ok(false)
        }
    }
}

#[cfg(feature = "cli")]
fn parse_namespaces(bindings: &[String]) -> Result<NamespaceMap, String> {
    let mut namespaces = NamespaceMap::new();
    for binding in bindings {
        let (prefix, uri) = binding
            .split_once('=')
            .ok_or_else(|| format!("Invalid namespace binding '{}', expected prefix=uri", binding))?;
        namespaces.add_prefix(prefix, uri);
    }
    Ok(namespaces)
}

#[cfg(feature = "cli")]
fn cmd_select(
    file: PathBuf,
    path: String,
    bindings: Vec<String>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let namespaces = parse_namespaces(&bindings)?;
    let path = ParsedXPath::parse(path)?;

    let xml = fs::read_to_string(&file)?;
    let doc = Document::parse(&xml)?;

    let found = StepResolver.resolve(doc.root_element(), &path, &namespaces)?;
    for node in &found {
        println!("{}", node.text().unwrap_or_default());
    }
    Ok(!found.is_empty())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}

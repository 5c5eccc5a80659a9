use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use postlook_core::{
    CapturedExpansion, Dispatcher, DispatcherConfig, FileConstraints, LookupError, Registry, Text,
    split_args,
};
use postlook_driver_dsearch::DsearchDriver;
use postlook_driver_lsearch::LsearchDriver;

/// Run one lookup through the dispatcher, the way the routing engine
/// would: parse the decorated type, split the argument, open the
/// resource, search, and print what came back.
#[derive(Parser, Debug)]
#[command(name = "postlook", version, about = "Query mail routing lookup tables")]
struct Args {
    /// Decorated lookup type, e.g. "lsearch", "partial2-lsearch*@" or
    /// "dsearch,filter=file"
    lookup_type: String,

    /// Search argument: the file or directory for single-key types
    argument: String,

    /// Key to search for (single-key types)
    key: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat the key as tainted, as if it arrived in a message
    #[arg(long)]
    tainted: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(Some(data)) => {
            println!("{data}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("no data found");
            ExitCode::from(1)
        }
        Err(e) if e.is_defer() => {
            eprintln!("deferred: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("failed: {e}");
            ExitCode::from(3)
        }
    }
}

fn run(args: &Args) -> Result<Option<String>, LookupError> {
    let config = match &args.config {
        Some(path) => DispatcherConfig::load(path)?,
        None => DispatcherConfig::default(),
    };

    let mut registry = Registry::new();
    registry.register(Arc::new(LsearchDriver::new()));
    registry.register(Arc::new(DsearchDriver::new()));
    let mut dispatcher = Dispatcher::new(registry, config);

    let spec = dispatcher.parse_type(&args.lookup_type)?;
    let metadata = dispatcher.registry().metadata(spec.driver);
    let split = split_args(metadata, &args.argument, spec.opts.as_deref());

    let filename = split.filename.as_deref().map(Text::clean);
    let handle = dispatcher.open(spec.driver, filename.as_ref(), &FileConstraints::default())?;

    let key = match (&split.query, &args.key) {
        (Some(query), _) => query.clone(),
        (None, Some(key)) => key.clone(),
        (None, None) => {
            return Err(LookupError::bad_type(format!(
                "lookup type \"{}\" needs a key argument",
                args.lookup_type
            )));
        }
    };
    let key = if args.tainted {
        Text::tainted(key)
    } else {
        Text::clean(key)
    };

    let mut sink = CapturedExpansion::default();
    let result = dispatcher.find(
        handle,
        split.filename.as_deref(),
        &key,
        spec.partial.as_ref(),
        spec.star,
        &mut sink,
        spec.opts.as_deref(),
    );

    for (i, value) in sink.values.iter().enumerate() {
        log::info!("[EXPAND] ${} = \"{value}\"", i + 1);
    }

    dispatcher.tidy();
    result
}

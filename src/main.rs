//! OpenSK manifest tool.
//!
//! Validates manifests, lists the drivers and layers they declare and checks
//! that their entry points bind.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use opensk::manifest::{DriverProperties, LayerProperties};
use opensk::{json, EnumerateFlags, ErrorCode, Manifest, ManifestOptions, SkResult, SkStatus};

#[derive(Parser)]
#[command(name = "skman")]
#[command(about = "OpenSK manifest validator", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (otherwise SK_LOG, default warn)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a JSON file and report its top-level property count
    CheckJson { path: PathBuf },

    /// Load a manifest and report defined and valid record counts
    Validate {
        path: PathBuf,
        /// Skip invalid records instead of rejecting the manifest
        #[arg(long)]
        lenient: bool,
    },

    /// List driver and layer properties
    List {
        path: PathBuf,
        /// Apply enable/disable environment gating
        #[arg(long)]
        implicit: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bind a driver or layer and report its entry points
    Resolve {
        path: PathBuf,
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Driver name
    #[arg(long)]
    driver: Option<String>,
    /// Layer name
    #[arg(long)]
    layer: Option<String>,
}

#[derive(Serialize)]
struct Listing {
    drivers: Vec<DriverProperties>,
    layers: Vec<LayerProperties>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run the two-call protocol to completion.
fn collect<T: Clone + Default>(enumerate: impl Fn(Option<&mut [T]>) -> (usize, SkStatus)) -> Vec<T> {
    let (count, _) = enumerate(None);
    let mut out = vec![T::default(); count];
    let (written, _) = enumerate(Some(out.as_mut_slice()));
    out.truncate(written);
    out
}

fn check_json(path: PathBuf) -> SkResult<()> {
    let doc = json::parse_file(&path)?;
    println!("ok: {} properties", doc.len());
    Ok(())
}

fn validate(path: PathBuf, lenient: bool) -> SkResult<()> {
    let options = if lenient {
        ManifestOptions::lenient()
    } else {
        ManifestOptions::default()
    };
    let manifest = Manifest::load_with(&path, options, &opensk::DefaultAllocator)?;
    println!(
        "drivers: {}/{}",
        manifest.valid_driver_count(),
        manifest.defined_driver_count()
    );
    println!(
        "layers: {}/{}",
        manifest.valid_layer_count(),
        manifest.defined_layer_count()
    );
    Ok(())
}

fn list(path: PathBuf, implicit: bool, as_json: bool) -> SkResult<()> {
    let manifest = Manifest::load(&path)?;
    let flags = if implicit {
        EnumerateFlags::IMPLICIT
    } else {
        EnumerateFlags::empty()
    };
    let listing = Listing {
        drivers: collect(|out| manifest.enumerate_driver_properties(flags, out)),
        layers: collect(|out| manifest.enumerate_layer_properties(flags, out)),
    };

    let mut stdout = io::stdout().lock();
    let written = if as_json {
        serde_json::to_writer_pretty(&mut stdout, &listing)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(stdout))
    } else {
        write_listing(&mut stdout, &listing)
    };
    written.map_err(|e| ErrorCode::Io(e.to_string()))
}

fn write_listing(out: &mut impl Write, listing: &Listing) -> io::Result<()> {
    for d in &listing.drivers {
        writeln!(
            out,
            "driver {} ({}) {} api {} impl {}: {}",
            d.driver_name, d.driver_id, d.uuid, d.api_version, d.impl_version, d.display_name
        )?;
    }
    for l in &listing.layers {
        writeln!(
            out,
            "layer {} {} api {} impl {}: {}",
            l.layer_name, l.uuid, l.api_version, l.impl_version, l.display_name
        )?;
    }
    Ok(())
}

fn status(present: bool) -> &'static str {
    if present {
        "resolved"
    } else {
        "missing"
    }
}

fn resolve(path: PathBuf, target: Target) -> SkResult<()> {
    let manifest = Manifest::load(&path)?;
    if let Some(name) = target.driver {
        let info = manifest.driver_create_info(&name)?;
        println!("driver {}", info.properties.driver_name);
        println!("  skGetDriverProcAddr: {}", status(true));
    } else if let Some(name) = target.layer {
        let info = manifest.layer_create_info(&name)?;
        println!("layer {}", info.properties.layer_name);
        println!(
            "  skGetInstanceProcAddr: {}",
            status(info.pfn_get_instance_proc_addr.is_some())
        );
        println!(
            "  skGetDriverProcAddr: {}",
            status(info.pfn_get_driver_proc_addr.is_some())
        );
        println!(
            "  skGetPcmStreamProcAddr: {}",
            status(info.pfn_get_pcm_stream_proc_addr.is_some())
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::CheckJson { path } => check_json(path),
        Commands::Validate { path, lenient } => validate(path, lenient),
        Commands::List {
            path,
            implicit,
            json,
        } => list(path, implicit, json),
        Commands::Resolve { path, target } => resolve(path, target),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", e.name(), e);
            ExitCode::FAILURE
        }
    }
}

//! VyOS ISO Builder CLI
//!
//! Resolves the layered build configuration for an architecture/target pair
//! and prepares the live-build tree.
//!
//! # Usage
//!
//! ```bash
//! # List architectures and their targets
//! vyos-build targets
//!
//! # Print the resolved configuration without touching build/
//! vyos-build show --architecture amd64 --target generic_iso
//!
//! # Resolve, write build/build-config.json and prepare build/config
//! vyos-build configure --architecture amd64 --target aws --build-by me@example.com
//!
//! # Then build the image
//! cd build && sudo lb build
//! ```
//!
//! # Configuration layers (lowest to highest priority)
//!
//! | Layer | Source |
//! |-------|--------|
//! | Legacy defaults | `data/defaults.json` (deprecated) |
//! | Defaults | `data/architectures/*.toml`, lexical order |
//! | Target overlay | `data/architectures/<arch>/<target>.toml` |
//! | Command line | `--build-type`, `--custom-package`, ... |

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use vyos_build::build_config::{write_snapshot, BuildConfig};
use vyos_build::config::legacy;
use vyos_build::defaults::BuildPaths;
use vyos_build::hook::{self, HookContext};
use vyos_build::pipeline::{self, BuildRequest, ResolvedBuild};
use vyos_build::prepare;

#[derive(Parser)]
#[command(name = "vyos-build")]
#[command(author, version, about = "VyOS ISO builder", long_about = None)]
struct Cli {
    /// Root of the vyos-build checkout
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log configuration discovery and merge details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available architectures and targets
    Targets,

    /// Print the resolved configuration as JSON
    Show(BuildArgs),

    /// Resolve the configuration and prepare the live-build tree
    Configure(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Architecture, e.g. amd64
    #[arg(short, long)]
    architecture: String,

    /// Target within the architecture, e.g. generic_iso
    #[arg(short, long)]
    target: String,

    /// Builder identity, defaults to user@host
    #[arg(long)]
    build_by: Option<String>,

    #[arg(long, value_parser = ["release", "development"])]
    build_type: Option<String>,

    /// Version string, required for release builds
    #[arg(long)]
    version: Option<String>,

    #[arg(long)]
    build_comment: Option<String>,

    #[arg(long)]
    debian_mirror: Option<String>,

    #[arg(long)]
    debian_security_mirror: Option<String>,

    #[arg(long)]
    vyos_mirror: Option<String>,

    /// Additional package to install (repeatable)
    #[arg(long = "custom-package")]
    custom_packages: Vec<String>,

    /// Additional APT signing key file (repeatable)
    #[arg(long = "custom-apt-key")]
    custom_apt_keys: Vec<String>,

    /// Additional APT repository line (repeatable)
    #[arg(long = "custom-apt-entry")]
    custom_apt_entries: Vec<String>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

impl BuildArgs {
    fn request(&self) -> BuildRequest {
        let list = |items: &Vec<String>| (!items.is_empty()).then(|| items.clone());

        BuildRequest::new(&self.architecture, &self.target)
            .option("build_by", self.build_by.clone())
            .option("build_type", self.build_type.clone())
            .option("version", self.version.clone())
            .option("build_comment", self.build_comment.clone())
            .option("debian_mirror", self.debian_mirror.clone())
            .option("debian_security_mirror", self.debian_security_mirror.clone())
            .option("vyos_mirror", self.vyos_mirror.clone())
            .option("custom_packages", list(&self.custom_packages))
            .option("custom_apt_key", list(&self.custom_apt_keys))
            .option("additional_repositories", list(&self.custom_apt_entries))
            .option("debug", self.debug.then_some(true))
    }
}

fn main() {
    let cli = Cli::parse();
    vyos_build::logging::init(cli.verbose);

    let result = build_paths(&cli.root).and_then(|paths| match cli.command {
        Commands::Targets => cmd_targets(&paths),
        Commands::Show(args) => cmd_show(&paths, &args),
        Commands::Configure(args) => cmd_configure(&paths, &args),
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn build_paths(root: &Path) -> Result<BuildPaths> {
    let root = root
        .canonicalize()
        .with_context(|| format!("checkout root {} not found", root.display()))?;
    Ok(BuildPaths::new(&root))
}

fn cmd_targets(paths: &BuildPaths) -> Result<()> {
    let registry = pipeline::discover(paths)?;
    let tree = registry.target_tree();

    println!("Available targets");
    println!("=================");
    for (architecture, targets) in &tree {
        let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
        if targets.is_empty() {
            println!("  {:<10} (no targets)", architecture);
        } else {
            println!("  {:<10} {}", architecture, targets.join(", "));
        }
    }
    Ok(())
}

fn resolve(paths: &BuildPaths, args: &BuildArgs) -> Result<ResolvedBuild> {
    let registry = pipeline::discover(paths)?;
    let resolved = pipeline::resolve(&registry, paths, &args.request())?;
    if resolved.legacy_active() {
        legacy::print_deprecation_warning(&paths.legacy_defaults);
    }
    Ok(resolved)
}

fn cmd_show(paths: &BuildPaths, args: &BuildArgs) -> Result<()> {
    let resolved = resolve(paths, args)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&resolved.store.to_mapping())?
    );
    Ok(())
}

fn cmd_configure(paths: &BuildPaths, args: &BuildArgs) -> Result<()> {
    println!(
        "=== Configuring VyOS build: {}/{} ===\n",
        args.architecture, args.target
    );

    let resolved = resolve(paths, args)?;
    let values = resolved.store.to_mapping();

    // Validate before anything is written so no partial config reaches build/.
    BuildConfig::from_values(&values)?;
    write_snapshot(&paths.build_config, &values)?;
    let config = BuildConfig::load(&paths.build_config)?;

    println!("Configuration:");
    println!("  Architecture: {}", config.build_architecture);
    println!("  Kernel:       {} ({})", config.kernel_version, config.kernel_flavor);
    println!("  Bootloaders:  {}", config.bootloaders);
    println!("  Build type:   {}", config.build_type);
    println!("  Built by:     {}", config.build_by);
    println!("  Snapshot:     {}", paths.build_config.display());
    println!();

    prepare::prepare(&config, paths)?;
    hook::run(&HookContext::new(&paths.base_dir, values), &resolved.overlay)?;

    println!("\n=== Configuration Complete ===");
    println!("\nNext: cd {} && sudo lb build", config.build_dir.display());

    Ok(())
}

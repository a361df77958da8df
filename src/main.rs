use anyhow::{Context, Result, bail};
use binsa::index::stats::{IndexInfo, format_size, print_info};
use binsa::index::suffix_array::{SearchHits, SuffixArrayReader, match_context, scan, sidecar_path};
use binsa::index::{
    ForensicIndexService, IndexOrigin, NoProgress, ProgressSink, distinct_substrings,
    longest_repeat, top_repeats,
};
use binsa::output;
use binsa::query::{PatternMode, parse_pattern};
use binsa::source::{ByteSource, FileSource};
use binsa::utils::{AppConfig, TerminalProgress, get_config_path};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "binsa")]
#[command(about = "Suffix array indexing and exact byte-pattern search for binary files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Options overriding the loaded index configuration
#[derive(Args)]
struct IndexOptions {
    /// Do not read or write the `.idx` sidecar
    #[arg(long)]
    no_sidecar: bool,

    /// Reject sources larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_size: Option<u64>,

    /// Worker threads for construction (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index for a file (or load its sidecar)
    Index {
        path: PathBuf,

        /// Discard any existing sidecar and rebuild
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        options: IndexOptions,
    },
    /// Find every occurrence of a byte pattern
    Search {
        path: PathBuf,

        /// Pattern; supports \xNN, \n, \t, \r, \0 and \\ escapes
        pattern: String,

        /// Treat the pattern as hex digits ("4d5a9000", "0x4d 5a")
        #[arg(short = 'x', long, conflicts_with = "literal")]
        hex: bool,

        /// Treat the pattern as literal text (no escapes)
        #[arg(short = 'F', long)]
        literal: bool,

        /// Maximum number of matches to print
        #[arg(short = 'm', long)]
        limit: Option<usize>,

        /// Show a hex dump with this many bytes either side of each match
        /// (defaults to `context_bytes` from the config)
        #[arg(short = 'C', long, value_name = "BYTES", num_args = 0..=1)]
        context: Option<Option<usize>>,

        /// Only print the number of matches
        #[arg(short, long)]
        count: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Linear scan without building an index
        #[arg(long)]
        scan: bool,

        #[command(flatten)]
        options: IndexOptions,
    },
    /// List the longest repeated byte sequences
    Repeats {
        path: PathBuf,

        /// Number of repeats to list
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// Ignore repeats shorter than this many bytes
        #[arg(long, default_value = "4")]
        min_len: u32,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        #[command(flatten)]
        options: IndexOptions,
    },
    /// Show the sidecar state for a file
    Info {
        path: PathBuf,

        /// Load the index and report repeat statistics
        #[arg(short, long)]
        analyze: bool,
    },
    /// Remove the sidecar for a file
    Remove { path: PathBuf },
    /// Show the effective configuration
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let progress: Box<dyn ProgressSink> = if cli.quiet {
        Box::new(NoProgress)
    } else {
        Box::new(TerminalProgress::new())
    };

    match cli.command {
        Commands::Index {
            path,
            force,
            options,
        } => {
            options.apply(&mut config);
            run_index(&config, &path, force, progress.as_ref())?;
        }
        Commands::Search {
            path,
            pattern,
            hex,
            literal,
            limit,
            context,
            count,
            no_color,
            scan,
            options,
        } => {
            options.apply(&mut config);
            let mode = if hex {
                PatternMode::Hex
            } else if literal {
                PatternMode::Literal
            } else {
                PatternMode::Escaped
            };
            let pattern = parse_pattern(&pattern, mode).context("Invalid pattern")?;
            let request = SearchRequest {
                pattern,
                limit: limit.unwrap_or(config.search_limit),
                context: context.map(|radius| radius.unwrap_or(config.context_bytes)),
                count,
                color: !no_color,
                scan,
            };
            run_search(&config, &path, &request, progress.as_ref())?;
        }
        Commands::Repeats {
            path,
            top,
            min_len,
            no_color,
            options,
        } => {
            options.apply(&mut config);
            let source = open_source(&path)?;
            let service = ForensicIndexService::new(config.index.clone())?;
            let index = service
                .get_or_build(&source, progress.as_ref())
                .with_context(|| format!("Failed to index {}", path.display()))?;

            let repeats = top_repeats(&index, top, min_len);
            let mut stdout = output::stdout(!no_color);
            output::print_repeats(&mut stdout, &source, &repeats)?;
        }
        Commands::Info { path, analyze } => {
            run_info(&config, &path, analyze, progress.as_ref())?;
        }
        Commands::Remove { path } => {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            let sidecar = sidecar_path(&canonical, &config.index.sidecar_extension);
            if SuffixArrayReader::remove(&sidecar)? {
                println!("Removed index: {}", sidecar.display());
            } else {
                println!("No index found for: {}", path.display());
            }
        }
        Commands::Config { init } => {
            run_config(&config, cli.config.as_deref(), init)?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `BINSA_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_env("BINSA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl IndexOptions {
    fn apply(&self, config: &mut AppConfig) {
        if self.no_sidecar {
            config.index.persist_sidecar = false;
        }
        if let Some(max_size) = self.max_size {
            config.index.max_source_bytes = max_size;
        }
        if let Some(threads) = self.threads {
            config.index.build_threads = threads;
        }
    }
}

fn open_source(path: &Path) -> Result<FileSource> {
    FileSource::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn run_index(config: &AppConfig, path: &Path, force: bool, progress: &dyn ProgressSink) -> Result<()> {
    let source = open_source(path)?;
    let service = ForensicIndexService::new(config.index.clone())?;

    let start = Instant::now();
    let index = if force {
        service.rebuild(&source, progress)
    } else {
        service.get_or_build(&source, progress)
    }
    .with_context(|| format!("Failed to index {}", path.display()))?;
    let elapsed = start.elapsed();

    let how = match index.origin() {
        IndexOrigin::Built => "built",
        IndexOrigin::Sidecar => "loaded",
    };
    println!(
        "Index {} for {} ({}) in {:.2?}",
        how,
        path.display(),
        format_size(source.len()),
        elapsed
    );
    if let Some(stats) = index.build_stats() {
        println!(
            "  suffix array: {:.2?} ({} rounds), LCP: {:.2?}",
            stats.sa_time, stats.rounds, stats.lcp_time
        );
    }
    if let Some(sidecar) = service.sidecar_for(&source) {
        if sidecar.exists() {
            println!("  sidecar: {}", sidecar.display());
        }
    }
    Ok(())
}

struct SearchRequest {
    pattern: Vec<u8>,
    limit: usize,
    context: Option<usize>,
    count: bool,
    color: bool,
    scan: bool,
}

fn run_search(
    config: &AppConfig,
    path: &Path,
    request: &SearchRequest,
    progress: &dyn ProgressSink,
) -> Result<()> {
    let source = open_source(path)?;

    let hits = if request.scan {
        let mut offsets = scan(&source, &request.pattern);
        let total = offsets.len() as u64;
        offsets.truncate(request.limit);
        SearchHits { total, offsets }
    } else {
        let service = ForensicIndexService::new(config.index.clone())?;
        let index = service
            .get_or_build(&source, progress)
            .with_context(|| format!("Failed to index {}", path.display()))?;
        service.search_limited(&source, &index, &request.pattern, request.limit)
    };

    let mut stdout = output::stdout(request.color);
    if request.count {
        writeln!(stdout, "{}", hits.total)?;
        return Ok(());
    }

    match request.context {
        Some(radius) => {
            let contexts: Vec<_> = hits
                .offsets
                .iter()
                .map(|&offset| match_context(&source, offset, request.pattern.len(), radius))
                .collect();
            output::print_contexts(&mut stdout, &contexts, &hits)?;
        }
        None => output::print_offsets(&mut stdout, &hits)?,
    }
    Ok(())
}

fn run_info(config: &AppConfig, path: &Path, analyze: bool, progress: &dyn ProgressSink) -> Result<()> {
    if !path.is_file() {
        bail!("{} is not a file", path.display());
    }

    let info = IndexInfo::gather(path, &config.index)?;
    let mut stdout = std::io::stdout().lock();
    print_info(&mut stdout, &info)?;
    writeln!(stdout, "Build threads:    {}", config.effective_build_threads())?;

    if analyze {
        let source = open_source(path)?;
        let service = ForensicIndexService::new(config.index.clone())?;
        let index = service.get_or_build(&source, progress)?;

        writeln!(stdout)?;
        writeln!(stdout, "Distinct substrings: {}", distinct_substrings(&index))?;
        match longest_repeat(&index) {
            Some(repeat) => writeln!(
                stdout,
                "Longest repeat:      {} bytes x{} at 0x{:08x}",
                repeat.len, repeat.occurrences, repeat.offset
            )?,
            None => writeln!(stdout, "Longest repeat:      none")?,
        }
        writeln!(stdout, "Index memory:        {}", format_size(index.memory_bytes() as u64))?;
    }

    Ok(())
}

fn run_config(config: &AppConfig, explicit: Option<&Path>, init: bool) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    if init {
        match explicit {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        println!("Wrote config: {}", path.display());
        return Ok(());
    }

    println!("Config file: {}", path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}

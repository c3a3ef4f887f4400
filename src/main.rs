use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use dabar::config::AppConfig;
use dabar::dictionary::{
    DictionaryLoader, FsCache, FsFetcher, FsStatusStore, HttpFetcher, ShardBuilder, ShardFetcher,
    WarmupOptions, WarmupPhase, WarmupService,
};

#[derive(Parser)]
#[command(name = "dabar", version, about = "Biblical-term dictionary distribution and lookup engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a flat dictionary JSON file into per-chapter shards plus an index
    Build {
        /// Flat dictionary file (key -> entry JSON object)
        #[arg(long, default_value = "dicionario_completo.json")]
        input: PathBuf,
        /// Output directory for the artifact tree
        #[arg(long, default_value = "public/data/dictionary")]
        out: PathBuf,
        /// Path prefix recorded in the index for each shard
        #[arg(long, default_value = "/data/dictionary")]
        public_prefix: String,
    },
    /// Download every chapter shard into the local cache for offline use
    Warmup {
        /// Artifact origin; overrides the configured base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Read artifacts from a local directory instead of HTTP
        #[arg(long, conflicts_with = "base_url")]
        from_dir: Option<PathBuf>,
        /// Cache directory; overrides the configured location
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Parallel downloads (clamped to 1-8)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Re-download even if a previous warmup completed
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Command::Build {
            input,
            out,
            public_prefix,
        } => run_build(&input, &out, public_prefix),
        Command::Warmup {
            base_url,
            from_dir,
            cache_dir,
            concurrency,
            force,
        } => run_warmup(base_url, from_dir, cache_dir, concurrency, force).await,
    };
    std::process::exit(exit_code);
}

fn run_build(input: &Path, out: &Path, public_prefix: String) -> i32 {
    match ShardBuilder::new(public_prefix).build(input, out) {
        Ok(report) => {
            println!(
                "Built {} chapters across {} books ({} entries), version {}",
                report.total_chapters, report.total_books, report.total_entries, report.version
            );
            if report.skipped_keys > 0 || report.dropped_entries > 0 {
                println!(
                    "Skipped {} malformed keys, dropped {} invalid entries",
                    report.skipped_keys, report.dropped_entries
                );
            }
            if report.invalid_strong > 0 || report.reference_violations > 0 {
                println!(
                    "Audit: {} bad Strong codes, {} entries with out-of-range reference counts",
                    report.invalid_strong, report.reference_violations
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Build failed: {e}");
            1
        }
    }
}

async fn run_warmup(
    base_url: Option<String>,
    from_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    concurrency: Option<usize>,
    force: bool,
) -> i32 {
    let config = AppConfig::load();
    let cache_dir = cache_dir.unwrap_or_else(|| config.cache_dir());
    let status_path = cache_dir.join("warmup-status.json");

    let options = WarmupOptions {
        force,
        concurrency: concurrency.unwrap_or(config.warmup.concurrency),
    };

    let status = match from_dir {
        Some(dir) => {
            warm(FsFetcher::new(dir), &cache_dir, &status_path, options).await
        }
        None => {
            let base_url = base_url.unwrap_or(config.source.base_url);
            warm(HttpFetcher::new(base_url), &cache_dir, &status_path, options).await
        }
    };

    match status.phase {
        WarmupPhase::Done => {
            println!(
                "Warmed up {} chapters into {}",
                status.total,
                cache_dir.display()
            );
            0
        }
        _ => {
            eprintln!(
                "Warmup failed: {}",
                status.error.as_deref().unwrap_or("unknown error")
            );
            1
        }
    }
}

async fn warm<F: ShardFetcher + 'static>(
    fetcher: F,
    cache_dir: &Path,
    status_path: &Path,
    options: WarmupOptions,
) -> dabar::dictionary::WarmupStatus {
    let loader = Arc::new(DictionaryLoader::new(Arc::new(fetcher)));
    let service = WarmupService::new(
        loader,
        Arc::new(FsCache::new(cache_dir)),
        Arc::new(FsStatusStore::new(status_path)),
    );
    service.warmup(options).await
}

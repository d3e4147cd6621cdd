use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use precache::{AgentConfig, CacheAgent, CacheStore, DiskStore, FetchSource, PathConfig, SeedManifest};

fn print_usage() {
    eprintln!("Usage: precache [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  install             Populate the current cache generation from the seed list");
    eprintln!("  activate            Delete all cache generations except the current one");
    eprintln!("  sync                install followed by activate");
    eprintln!("  fetch <URL>         Cache-first lookup; writes the response body to stdout");
    eprintln!("  status              List cache generations and their entry counts");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --manifest <PATH>   Seed manifest TOML (default: <config dir>/precache/manifest.toml)");
    eprintln!("  --store <PATH>      Cache store root (default: <data dir>/precache/store)");
    eprintln!("  -h, --help          Show this help");
}

struct CliArgs {
    command: String,
    url: Option<String>,
    manifest: Option<PathBuf>,
    store: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let mut command = None;
    let mut url = None;
    let mut manifest = None;
    let mut store = None;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--manifest" => {
                i += 1;
                if i < args.len() {
                    manifest = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: --manifest requires a value");
                    std::process::exit(1);
                }
            }
            "--store" => {
                i += 1;
                if i < args.len() {
                    store = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: --store requires a value");
                    std::process::exit(1);
                }
            }
            arg if command.is_none() => command = Some(arg.to_string()),
            arg if command.as_deref() == Some("fetch") && url.is_none() => {
                url = Some(arg.to_string());
            }
            arg => {
                eprintln!("Error: unexpected argument '{arg}'");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(command) = command else {
        print_usage();
        std::process::exit(1);
    };

    CliArgs {
        command,
        url,
        manifest,
        store,
    }
}

/// Loads the agent configuration: an explicit manifest must parse, the
/// default manifest is used when present, otherwise built-in defaults apply.
async fn load_config(explicit: Option<PathBuf>, default_path: &Path) -> precache::Result<AgentConfig> {
    if let Some(path) = explicit {
        let manifest = SeedManifest::load(&path).await?;
        return Ok(manifest.into_config());
    }
    if tokio::fs::metadata(default_path).await.is_ok() {
        let manifest = SeedManifest::load(default_path).await?;
        return Ok(manifest.into_config());
    }
    log::warn!(
        "no seed manifest at {}, using built-in defaults",
        default_path.display()
    );
    Ok(AgentConfig::default())
}

#[tokio::main]
async fn main() -> precache::Result<()> {
    env_logger::init();

    let args = parse_args();
    let paths = PathConfig::default();

    let config = load_config(args.manifest, &paths.manifest_path).await?;
    let store = DiskStore::new(args.store.unwrap_or(paths.store_dir));
    let agent = CacheAgent::new(store, config);

    match args.command.as_str() {
        "install" => {
            let report = agent.install().await?;
            println!(
                "installed {} entries ({} bytes) into {} in {:.1}s",
                report.entries,
                report.total_bytes,
                agent.config().version,
                report.elapsed.as_secs_f64()
            );
        }
        "activate" => {
            let deleted = agent.activate().await?;
            if deleted.is_empty() {
                println!("no stale generations; {} is current", agent.config().version);
            } else {
                println!("removed stale generations: {}", deleted.join(", "));
            }
        }
        "sync" => {
            let report = agent.install().await?;
            let deleted = agent.activate().await?;
            println!(
                "installed {} entries into {}; removed {} stale generation(s)",
                report.entries,
                agent.config().version,
                deleted.len()
            );
        }
        "fetch" => {
            let Some(url) = args.url else {
                eprintln!("Error: fetch requires a URL");
                std::process::exit(1);
            };
            let outcome = agent.handle_fetch(&url).await?;
            let source = match outcome.source {
                FetchSource::Cache => "cache",
                FetchSource::Network => "network",
            };
            eprintln!(
                "{source} {} ({} bytes)",
                outcome.response.status,
                outcome.response.body_len()
            );
            std::io::stdout().write_all(&outcome.response.body)?;
        }
        "status" => {
            let generations = agent.store().generations().await?;
            if generations.is_empty() {
                println!("store is empty");
            }
            for name in generations {
                let entries = agent.store().entry_count(&name).await?;
                let marker = if name == agent.config().version { "*" } else { " " };
                println!("{marker} {name}: {entries} entries");
            }
        }
        other => {
            eprintln!("Error: unknown command '{other}'");
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

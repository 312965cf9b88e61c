//! kectl: read, write, watch, record, and replay Kubernetes API objects
//! directly in the backing etcd store, bypassing the API server.

mod archive;
mod printer;

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use kectl_client::{Client, EtcdClient, OpOptions};
use kectl_core::{GroupResource, GroupVersionResource, KeyValue};
use kectl_encoding::{convert, detect, media_type_for_gvr};
use kectl_snapshot::handle::{attach_keyboard, Handle};
use kectl_snapshot::stream::{Decoder, Encoder};
use kectl_snapshot::{Loader, Saver};
use printer::{OutputFormat, Printer};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "kectl", version, about = "Operate on Kubernetes state directly in etcd")]
struct Cli {
    /// etcd endpoints, comma separated
    #[arg(
        long = "endpoints",
        global = true,
        value_delimiter = ',',
        default_value = "127.0.0.1:2379"
    )]
    endpoints: Vec<String>,

    /// Key prefix the API server writes under
    #[arg(long = "prefix", global = true, default_value = "/registry")]
    prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get resources straight from the store
    Get(GetArgs),
    /// Write a value under a resource key, bypassing server-managed fields
    Put(PutArgs),
    /// Delete a resource key
    Del(DelArgs),
    /// Snapshot the cluster state and record changes as a timeline
    Record(PathArgs),
    /// Load a snapshot and replay its timeline into the store
    Replay(PathArgs),
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Resource, optionally group qualified (e.g. `deployments.apps`)
    resource: Option<String>,
    /// Object name
    name: Option<String>,
    /// Namespace of the resource
    #[arg(short = 'n', long = "namespace")]
    namespace: Option<String>,
    /// All namespaces
    #[arg(short = 'A', long = "all-namespaces", action = ArgAction::SetTrue)]
    all_namespaces: bool,
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Key)]
    output: OutputFormat,
    /// After listing, watch for changes
    #[arg(short = 'w', long = "watch", action = ArgAction::SetTrue)]
    watch: bool,
    /// Watch for changes without listing first
    #[arg(long = "watch-only", action = ArgAction::SetTrue)]
    watch_only: bool,
    /// Page size for list scans
    #[arg(long = "chunk-size", default_value_t = 500)]
    chunk_size: i64,
}

#[derive(Args, Debug)]
struct PutArgs {
    /// Resource, optionally group qualified
    resource: String,
    /// Object name
    name: String,
    /// Namespace of the resource
    #[arg(short = 'n', long = "namespace")]
    namespace: Option<String>,
    /// Read the value from this file instead of stdin
    #[arg(short = 'f', long = "filename")]
    filename: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DelArgs {
    /// Resource, optionally group qualified
    resource: String,
    /// Object name
    name: String,
    /// Namespace of the resource
    #[arg(short = 'n', long = "namespace")]
    namespace: Option<String>,
}

#[derive(Args, Debug)]
struct PathArgs {
    /// Path of the timeline file (`.gz` and `.zst` select compression)
    #[arg(long = "path")]
    path: PathBuf,
    /// Snapshot only; skip the timeline phase
    #[arg(long = "snapshot", action = ArgAction::SetTrue)]
    snapshot: bool,
}

fn init_tracing() {
    let env = std::env::var("KECTL_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KECTL_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid KECTL_METRICS_ADDR; expected host:port");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let ctx = CancellationToken::new();
    tokio::spawn({
        let ctx = ctx.clone();
        async move {
            let _ = signal::ctrl_c().await;
            info!("interrupt received; shutting down");
            ctx.cancel();
        }
    });

    let client = EtcdClient::connect(&cli.endpoints).await?;
    match cli.command {
        Commands::Get(args) => get_command(&ctx, &client, &cli.prefix, args).await,
        Commands::Put(args) => put_command(&ctx, &client, &cli.prefix, args).await,
        Commands::Del(args) => del_command(&ctx, &client, &cli.prefix, args).await,
        Commands::Record(args) => record_command(&ctx, client, &cli.prefix, args).await,
        Commands::Replay(args) => replay_command(&ctx, client, &cli.prefix, args).await,
    }
}

/// Resolve a user-typed resource token through the catalog: canonical
/// plural, group, and the namespace defaulting rules.
fn resolve_target(
    resource: Option<&str>,
    name: &str,
    namespace: Option<String>,
    all_namespaces: bool,
) -> Result<OpOptions> {
    let Some(token) = resource else { return Ok(OpOptions::default()) };
    let gr = GroupResource::parse(token);
    if gr.resource.is_empty() {
        bail!("invalid resource {token:?}");
    }
    let mut target = gr.clone();
    let mut ns = namespace.unwrap_or_default();
    if let Some((corrected, namespaced)) = kectl_wellknown::correct_group_resource(&gr) {
        target = corrected;
        if !namespaced || all_namespaces {
            ns.clear();
        } else if ns.is_empty() {
            ns = "default".to_string();
        }
    }
    Ok(OpOptions::default().with_group_resource(target).with_name(name, ns))
}

async fn get_command(ctx: &CancellationToken, client: &EtcdClient, prefix: &str, args: GetArgs) -> Result<()> {
    let mut opts = resolve_target(
        args.resource.as_deref(),
        args.name.as_deref().unwrap_or(""),
        args.namespace,
        args.all_namespaces,
    )?
    .with_page_limit(args.chunk_size);
    if args.output == OutputFormat::Key {
        opts = opts.with_keys_only();
    }

    let mut printer = Printer::new(std::io::stdout(), args.output);
    let mut count = 0usize;
    let mut on_kv = |kv: &KeyValue| {
        count += 1;
        printer.print(kv)
    };

    if args.watch {
        let mut revision = 0;
        if !args.watch_only {
            revision = client.get(ctx, prefix, opts.clone(), &mut on_kv).await?;
        }
        client.watch(ctx, prefix, opts.with_revision(revision), &mut on_kv).await?;
    } else {
        client.get(ctx, prefix, opts, &mut on_kv).await?;
        if args.output == OutputFormat::Key {
            eprintln!("get {count} keys");
        }
    }
    Ok(())
}

async fn put_command(ctx: &CancellationToken, client: &EtcdClient, prefix: &str, args: PutArgs) -> Result<()> {
    let value = match &args.filename {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("reading value from stdin")?;
            buf
        }
    };
    if value.is_empty() {
        bail!("empty value");
    }

    let opts = resolve_target(Some(&args.resource), &args.name, args.namespace, false)?;
    let gr = opts.group_resource.clone().unwrap_or_default();
    let gvr = GroupVersionResource::new(gr.group.clone(), "", gr.resource.clone());

    let from = detect(&value)?;
    let to = media_type_for_gvr(&gvr);
    let stored = convert(from, to, &value)?;

    client.put(ctx, prefix, stored, opts).await?;
    info!(resource = %gr, name = %args.name, "put");
    Ok(())
}

async fn del_command(ctx: &CancellationToken, client: &EtcdClient, prefix: &str, args: DelArgs) -> Result<()> {
    let opts = resolve_target(Some(&args.resource), &args.name, args.namespace, false)?;
    client.delete(ctx, prefix, opts).await?;
    info!(resource = %args.resource, name = %args.name, "deleted");
    Ok(())
}

async fn record_command(ctx: &CancellationToken, client: EtcdClient, prefix: &str, args: PathArgs) -> Result<()> {
    let writer = archive::create(&args.path)?;
    let mut encoder = Encoder::new(writer);
    let mut saver = Saver::new(client, prefix);

    if args.snapshot {
        info!("saving snapshot");
    } else {
        info!("saving snapshot and recording");
    }
    saver.save(ctx, &mut encoder).await?;
    if args.snapshot {
        encoder.flush()?;
        info!("saved snapshot");
        return Ok(());
    }

    info!("recording; press ctrl-c to stop");
    saver.record(ctx, &mut encoder).await?;
    encoder.flush()?;
    Ok(())
}

async fn replay_command(ctx: &CancellationToken, client: EtcdClient, prefix: &str, args: PathArgs) -> Result<()> {
    let reader = archive::open(&args.path)?;
    let mut decoder = Decoder::new(reader);
    let mut loader = Loader::new(client, prefix);

    info!("loading snapshot");
    loader.load(ctx, &mut decoder).await?;
    if args.snapshot {
        return Ok(());
    }

    if std::io::stdout().is_terminal() {
        let handle = Arc::new(Handle::new());
        attach_keyboard(handle.clone(), ctx.clone());
        loader.attach_handle(handle);
    }
    info!("replaying timeline");
    loader.replay(ctx, &mut decoder).await?;
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use latentcf::{
    init_tracing, render_table, Config, CollaborativeFiltering, FitParams, Query, Rating,
    SnapshotFile, SortKey, SortOrder, TargetDataset,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit latent factors to a JSON array of {user, item, rating} and write a snapshot
    Train(TrainArgs),
    /// Predict a JSON array of {user, item} queries from a snapshot
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[arg(long)]
    ratings: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(long)]
    dimension: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    lambda: Option<f64>,

    #[arg(long)]
    alpha: Option<f64>,

    /// Write the index-keyed layout with identifier tables
    #[arg(long)]
    indexed: bool,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    model: PathBuf,

    #[arg(long)]
    queries: PathBuf,

    /// Latent dimension the snapshot was trained with; read from the snapshot if omitted
    #[arg(long)]
    dimension: Option<usize>,

    /// Decimal digits for predictions
    #[arg(long)]
    fixed: Option<usize>,

    #[arg(long)]
    sort: Option<SortKey>,

    #[arg(long)]
    order: Option<SortOrder>,

    /// Print rows as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    std::env::set_var("RUST_LOG", &cli.log_level);
    init_tracing();

    let config = if Path::new(&cli.config).exists() {
        Config::from_file(&cli.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    match cli.command {
        Command::Train(args) => train(config, args),
        Command::Predict(args) => predict(config, args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn train(mut config: Config, args: TrainArgs) -> Result<()> {
    if let Some(dimension) = args.dimension {
        config.dataset.dimension = dimension;
    }
    if args.seed.is_some() {
        config.dataset.seed = args.seed;
    }
    let mut params = FitParams::from(&config.training);
    if let Some(iterations) = args.iterations {
        params.iterations = iterations;
    }
    if let Some(lambda) = args.lambda {
        params.lambda = lambda;
    }
    if let Some(alpha) = args.alpha {
        params.alpha = alpha;
    }

    let ratings: Vec<Rating> = read_json(&args.ratings)?;
    let mut dataset = config.dataset.build();
    for rating in &ratings {
        dataset.add_rating(rating)?;
    }
    info!(
        ratings = ratings.len(),
        users = dataset.user_count(),
        items = dataset.item_count(),
        "loaded ratings"
    );

    let report = CollaborativeFiltering::new().fit(&mut dataset, &params)?;
    info!(
        training_mse = report.training_mse,
        epochs = report.epochs,
        "training finished"
    );

    let snapshot: SnapshotFile = if args.indexed {
        dataset.export_indexed()?.into()
    } else {
        dataset.export()?.into()
    };
    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("snapshot written to {}", args.output.display());
    Ok(())
}

fn predict(mut config: Config, args: PredictArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.model)
        .with_context(|| format!("failed to read {}", args.model.display()))?;
    let snapshot = SnapshotFile::from_json(&raw)?;
    if let Some(dimension) = args.dimension.or_else(|| snapshot.dimension()) {
        config.dataset.dimension = dimension;
    }

    let mut dataset = config.dataset.build();
    dataset.import_file(snapshot)?;

    let queries: Vec<Query> = read_json(&args.queries)?;
    let mut target = TargetDataset::new();
    for query in &queries {
        target.add_query(query);
    }

    CollaborativeFiltering::new().transform(&dataset, &mut target)?;

    let fixed = args.fixed.or(config.output.fixed);
    let sort_key = args.sort.or(config.output.sort_key);
    let order = args.order.unwrap_or(config.output.sort_order);
    let rows = target.get_table(fixed, sort_key, order);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render_table(&rows));
    }
    Ok(())
}

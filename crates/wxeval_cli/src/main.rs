//! wxeval CLI: verify probabilistic forecasts of binary weather events.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ndarray::Array1;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wxeval_core::{labels_from_integers, ForecastSet, Seed};
use wxeval_verify::{
    bootstrap_performance_diagram, bootstrap_reliability_curve, bootstrap_roc_curve,
    get_brier_score, get_cross_entropy, get_points_in_performance_diagram,
    get_points_in_reliability_curve, get_points_in_roc_curve, verification_report,
    ContingencyTable, DeterministicScores, EvaluationConfig, ThresholdArg,
};

#[derive(Parser)]
#[command(name = "wxeval")]
#[command(author, version)]
#[command(about = "Verification of probabilistic forecasts: ROC, reliability, bootstrap envelopes")]
#[command(long_about = "wxeval: skill scores and bootstrapped confidence envelopes for probabilistic
forecasts of binary events (tornado, damaging wind, ...).

Forecasts are read from a .npy file of probabilities (with --labels pointing
to a .npy file of 0/1 labels) or from a .json file holding
{\"probabilities\": [...], \"labels\": [...]}.

EXAMPLES:
  # AUC and ROC points, one threshold per unique forecast
  wxeval roc --forecasts probs.npy --labels labels.npy

  # Performance diagram with 101 thresholds and a 95% bootstrap envelope
  wxeval performance --forecasts set.json --thresholds 101 --bootstrap

  # Reliability curve with 20 bins, as JSON
  wxeval reliability --forecasts set.json --bins 20 --json

  # Everything at once
  wxeval report --forecasts set.json --config eval.json")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ROC curve and area under it
    Roc(EvalArgs),
    /// Performance diagram and maximum CSI
    Performance(EvalArgs),
    /// Reliability curve and Brier skill score
    Reliability(EvalArgs),
    /// Brier score, cross-entropy and contingency-table scores at one threshold
    Scores(EvalArgs),
    /// Full verification report
    Report(EvalArgs),
}

#[derive(Args)]
struct EvalArgs {
    /// Forecast probabilities (.npy or .json)
    #[arg(long, value_name = "FILE")]
    forecasts: PathBuf,

    /// Observed labels (.npy), required with .npy forecasts
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Evaluation settings (JSON); flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Binarization thresholds: "unique" or a number of equally spaced thresholds
    #[arg(long, value_name = "unique|K", value_parser = parse_thresholds)]
    thresholds: Option<ThresholdArg>,

    /// Rounding precision for unique-forecast thresholds
    #[arg(long, value_name = "P")]
    precision: Option<f64>,

    /// Number of reliability-curve bins
    #[arg(long, value_name = "N")]
    bins: Option<usize>,

    /// Decision threshold for contingency-table scores
    #[arg(long, value_name = "T")]
    threshold: Option<f64>,

    /// Compute bootstrap confidence envelopes (implied by --iters > 1)
    #[arg(long)]
    bootstrap: bool,

    /// Number of bootstrap iterations
    #[arg(long, value_name = "N")]
    iters: Option<usize>,

    /// Confidence level of the envelopes
    #[arg(long, value_name = "LEVEL")]
    confidence: Option<f64>,

    /// Random seed for resampling
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl EvalArgs {
    /// Bootstrap when asked to, or when more than one iteration is requested.
    fn wants_bootstrap(&self) -> bool {
        self.bootstrap || self.iters.is_some_and(|n| n > 1)
    }

    /// Fail on resampling flags for commands that have no envelope.
    fn reject_bootstrap(&self, command: &str) -> Result<()> {
        let resampling = self.bootstrap
            || self.iters.is_some()
            || self.confidence.is_some()
            || self.seed.is_some();
        if resampling {
            bail!(
                "`{command}` has no bootstrap envelopes; use roc, performance or reliability with \
                 --bootstrap/--iters/--confidence/--seed"
            );
        }
        Ok(())
    }
}

fn parse_thresholds(s: &str) -> std::result::Result<ThresholdArg, String> {
    if s.eq_ignore_ascii_case("unique") {
        return Ok(ThresholdArg::unique());
    }
    s.parse::<usize>()
        .map(ThresholdArg::Count)
        .map_err(|_| format!("expected \"unique\" or a number of thresholds, got {s:?}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Roc(args) => handle_roc(&args),
        Commands::Performance(args) => handle_performance(&args),
        Commands::Reliability(args) => handle_reliability(&args),
        Commands::Scores(args) => handle_scores(&args),
        Commands::Report(args) => handle_report(&args),
    }
}

/// Merge the config file (if any) with command-line overrides.
fn build_config(args: &EvalArgs) -> Result<EvaluationConfig> {
    let mut config: EvaluationConfig = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => EvaluationConfig::default(),
    };

    if let Some(thresholds) = &args.thresholds {
        config.thresholds = thresholds.clone();
    }
    if let Some(precision) = args.precision {
        match &mut config.thresholds {
            ThresholdArg::UniqueForecasts { precision: p } => *p = precision,
            _ => bail!("--precision only applies to unique-forecast thresholds"),
        }
    }
    if let Some(bins) = args.bins {
        config.num_bins = bins;
    }
    if let Some(threshold) = args.threshold {
        config.decision_threshold = threshold;
    }
    if let Some(iters) = args.iters {
        config.bootstrap.num_iters = iters;
    }
    if let Some(confidence) = args.confidence {
        config.bootstrap.confidence_level = confidence;
    }
    if let Some(seed) = args.seed {
        config.bootstrap.seed = Seed::new(seed);
    }

    tracing::debug!(?config, "evaluation config");
    Ok(config)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn read_npy_probabilities(path: &Path) -> Result<Vec<f64>> {
    use ndarray_npy::ReadNpyExt;

    let open = || -> Result<std::io::BufReader<std::fs::File>> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(std::io::BufReader::new(file))
    };

    // Try f64 first, then f32
    match Array1::<f64>::read_npy(open()?) {
        Ok(arr) => Ok(arr.to_vec()),
        Err(e) => {
            let arr = Array1::<f32>::read_npy(open()?).with_context(|| {
                format!("Failed to read probabilities from {}: {e}", path.display())
            })?;
            Ok(arr.iter().map(|&p| f64::from(p)).collect())
        }
    }
}

fn read_npy_labels(path: &Path) -> Result<Vec<u8>> {
    use ndarray_npy::ReadNpyExt;

    let open = || -> Result<std::io::BufReader<std::fs::File>> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(std::io::BufReader::new(file))
    };

    let values: Vec<i64> = match Array1::<i64>::read_npy(open()?) {
        Ok(arr) => arr.to_vec(),
        Err(e) => {
            let arr = Array1::<i32>::read_npy(open()?)
                .with_context(|| format!("Failed to read labels from {}: {e}", path.display()))?;
            arr.iter().map(|&v| i64::from(v)).collect()
        }
    };
    Ok(labels_from_integers(&values)?)
}

fn load_forecasts(args: &EvalArgs) -> Result<ForecastSet> {
    let path = &args.forecasts;
    let set: ForecastSet = if has_extension(path, "json") {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid forecast set in {}", path.display()))?
    } else if has_extension(path, "npy") {
        let Some(labels_path) = &args.labels else {
            bail!("--labels is required with .npy forecasts");
        };
        let probabilities = read_npy_probabilities(path)?;
        let labels = read_npy_labels(labels_path)?;
        ForecastSet::new(probabilities, labels).context("Invalid forecasts or labels")?
    } else {
        bail!("Unsupported forecast file {} (expected .npy or .json)", path.display());
    };

    tracing::info!(
        num_examples = set.len(),
        num_events = set.num_events(),
        "loaded forecasts from {}",
        path.display()
    );
    Ok(set)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print aligned columns, one row per index.
fn print_columns(headers: &[&str], columns: &[&[f64]]) {
    let header: Vec<String> = headers.iter().map(|h| format!("{h:>14}")).collect();
    println!("{}", header.join(""));
    println!("{}", "-".repeat(14 * headers.len()));
    let num_rows = columns.first().map_or(0, |c| c.len());
    for i in 0..num_rows {
        let row: Vec<String> = columns.iter().map(|c| format!("{:>14.4}", c[i])).collect();
        println!("{}", row.join(""));
    }
}

fn handle_roc(args: &EvalArgs) -> Result<()> {
    let set = load_forecasts(args)?;
    let config = build_config(args)?;

    if args.wants_bootstrap() {
        let result = bootstrap_roc_curve(&set, &config.thresholds, &config.bootstrap)?;
        if args.json {
            return print_json(&result);
        }
        let env = &result.envelope;
        println!("=== ROC Curve ({} bootstrap iterations) ===\n", config.bootstrap.num_iters);
        println!(
            "AUC: {:.4}  [{:.4}, {:.4}]\n",
            env.mean.auc, env.bottom.auc, env.top.auc
        );
        print_columns(
            &["threshold", "POFD", "POD", "POD low", "POD high"],
            &[&result.thresholds, &env.mean.pofd, &env.mean.pod, &env.bottom.pod, &env.top.pod],
        );
        return Ok(());
    }

    let roc = get_points_in_roc_curve(&set, &config.thresholds)?;
    if args.json {
        #[derive(Serialize)]
        struct Output<'a> {
            auc: f64,
            #[serde(flatten)]
            curve: &'a wxeval_verify::RocCurve,
        }
        return print_json(&Output {
            auc: roc.area_under_curve(),
            curve: &roc,
        });
    }
    println!("=== ROC Curve ===\n");
    println!("AUC: {:.4}\n", roc.area_under_curve());
    print_columns(
        &["threshold", "POFD", "POD"],
        &[&roc.thresholds, &roc.pofd_by_threshold, &roc.pod_by_threshold],
    );
    Ok(())
}

fn handle_performance(args: &EvalArgs) -> Result<()> {
    let set = load_forecasts(args)?;
    let config = build_config(args)?;

    if args.wants_bootstrap() {
        let result = bootstrap_performance_diagram(&set, &config.thresholds, &config.bootstrap)?;
        if args.json {
            return print_json(&result);
        }
        let env = &result.envelope;
        println!(
            "=== Performance Diagram ({} bootstrap iterations) ===\n",
            config.bootstrap.num_iters
        );
        println!(
            "Max CSI: {:.4}  [{:.4}, {:.4}]\n",
            env.mean.max_csi, env.bottom.max_csi, env.top.max_csi
        );
        print_columns(
            &["threshold", "SR", "POD", "POD low", "POD high"],
            &[
                &result.thresholds,
                &env.mean.success_ratio,
                &env.mean.pod,
                &env.bottom.pod,
                &env.top.pod,
            ],
        );
        return Ok(());
    }

    let diagram = get_points_in_performance_diagram(&set, &config.thresholds)?;
    if args.json {
        #[derive(Serialize)]
        struct Output<'a> {
            max_csi: f64,
            #[serde(flatten)]
            diagram: &'a wxeval_verify::PerformanceDiagram,
        }
        return print_json(&Output {
            max_csi: diagram.max_csi(),
            diagram: &diagram,
        });
    }
    println!("=== Performance Diagram ===\n");
    println!("Max CSI: {:.4}\n", diagram.max_csi());
    let csi = diagram.csi_by_threshold();
    print_columns(
        &["threshold", "SR", "POD", "CSI"],
        &[
            &diagram.thresholds,
            &diagram.success_ratio_by_threshold,
            &diagram.pod_by_threshold,
            &csi,
        ],
    );
    Ok(())
}

fn handle_reliability(args: &EvalArgs) -> Result<()> {
    let set = load_forecasts(args)?;
    let config = build_config(args)?;

    if args.wants_bootstrap() {
        let result = bootstrap_reliability_curve(&set, config.num_bins, &config.bootstrap)?;
        if args.json {
            return print_json(&result);
        }
        let env = &result.envelope;
        println!(
            "=== Reliability Curve ({} bootstrap iterations) ===\n",
            config.bootstrap.num_iters
        );
        println!(
            "BSS: {:.4}  [{:.4}, {:.4}]",
            env.mean.brier_skill_score, env.bottom.brier_skill_score, env.top.brier_skill_score
        );
        println!(
            "Brier score: {:.4}  [{:.4}, {:.4}]\n",
            env.mean.brier_score, env.bottom.brier_score, env.top.brier_score
        );
        let counts: Vec<f64> = result.num_examples_by_bin.iter().map(|&n| n as f64).collect();
        print_columns(
            &["mean fcst", "obs freq", "obs low", "obs high", "count"],
            &[
                &env.mean.mean_forecast_prob,
                &env.mean.mean_observed_label,
                &env.bottom.mean_observed_label,
                &env.top.mean_observed_label,
                &counts,
            ],
        );
        return Ok(());
    }

    let curve = get_points_in_reliability_curve(&set, config.num_bins)?;
    let bss = curve.brier_decomposition(set.climatology())?;
    if args.json {
        #[derive(Serialize)]
        struct Output<'a> {
            curve: &'a wxeval_verify::ReliabilityCurve,
            brier_decomposition: &'a wxeval_verify::BrierDecomposition,
        }
        return print_json(&Output {
            curve: &curve,
            brier_decomposition: &bss,
        });
    }
    print!("{}", curve.summary());
    println!("\nBSS: {:.4}", bss.brier_skill_score);
    println!(
        "Brier score: {:.4} (reliability {:.4}, resolution {:.4}, uncertainty {:.4})",
        bss.brier_score, bss.reliability, bss.resolution, bss.uncertainty
    );
    Ok(())
}

fn handle_scores(args: &EvalArgs) -> Result<()> {
    args.reject_bootstrap("scores")?;
    let set = load_forecasts(args)?;
    let config = build_config(args)?;

    let table = ContingencyTable::from_probabilities(
        set.probabilities(),
        set.labels(),
        config.decision_threshold,
    )?;

    #[derive(Serialize)]
    struct Output {
        brier_score: f64,
        cross_entropy: f64,
        decision_threshold: f64,
        contingency_table: ContingencyTable,
        scores: DeterministicScores,
    }
    let output = Output {
        brier_score: get_brier_score(&set),
        cross_entropy: get_cross_entropy(&set),
        decision_threshold: config.decision_threshold,
        contingency_table: table,
        scores: DeterministicScores::from(&table),
    };

    if args.json {
        return print_json(&output);
    }
    println!("Brier score:   {:.4}", output.brier_score);
    println!("Cross-entropy: {:.4} bits\n", output.cross_entropy);
    println!("At threshold {:.3}:", output.decision_threshold);
    print!("{}", table.to_string_table());
    println!();
    let s = &output.scores;
    println!("  POD {:.4}  POFD {:.4}  SR {:.4}  FAR {:.4}", s.pod, s.pofd, s.success_ratio, s.far);
    println!("  CSI {:.4}  bias {:.4}  accuracy {:.4}", s.csi, s.frequency_bias, s.accuracy);
    println!("  Peirce {:.4}  Heidke {:.4}", s.peirce_score, s.heidke_score);
    Ok(())
}

fn handle_report(args: &EvalArgs) -> Result<()> {
    args.reject_bootstrap("report")?;
    let set = load_forecasts(args)?;
    let config = build_config(args)?;
    let report = verification_report(&set, &config)?;

    if args.json {
        return print_json(&report);
    }
    print!("{}", report.summary());
    Ok(())
}

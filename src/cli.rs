use chrono::Datelike;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

type ParseResult<T> = std::result::Result<T, String>;

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="selftarget",
          version=&**FULL_VERSION,
          about="CRISPR/Cas9 repair outcome profiling and prediction",
          long_about = None,
          disable_help_subcommand = true,
          after_help = format!("Copyright (C) 2017-{}\nThis program comes with ABSOLUTELY NO WARRANTY.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Resolve ambiguous read mappings into indel profiles")]
    Reconcile(ReconcileArgs),
    #[clap(about = "Encode features of generated indels")]
    Features(FeaturesArgs),
    #[clap(about = "Tabulate observed reads of generated indels")]
    Reads(ReadsArgs),
    #[clap(about = "Train the indel prediction model")]
    Train(TrainArgs),
    #[clap(about = "Predict repair outcome profiles")]
    Predict(PredictArgs),
    #[clap(about = "Compare indel profiles of two summary files")]
    Compare(CompareArgs),
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct ReconcileArgs {
    #[clap(required = true)]
    #[clap(short = 'm')]
    #[clap(long = "mappings")]
    #[clap(help = "Candidate mapping files from the indel mapper")]
    #[clap(value_name = "MAPPINGS")]
    #[arg(num_args = 1..)]
    pub mapping_paths: Vec<PathBuf>,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 'b')]
    #[clap(long = "background")]
    #[clap(help = "Catalog of background templates per oligo")]
    #[clap(value_name = "BACKGROUND")]
    #[arg(value_parser = check_file_exists)]
    pub background_path: Option<PathBuf>,

    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(help = "Seed for resolving ambiguous reads")]
    #[clap(default_value = "0")]
    pub seed: u64,

    #[clap(long = "write-reads")]
    #[clap(help = "Also write the assignment of every read")]
    pub write_reads: bool,
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct FeaturesArgs {
    #[clap(required = true)]
    #[clap(short = 'g')]
    #[clap(long = "gen-indels")]
    #[clap(help = "Directory of generated indel files (<oligo>_genindels.txt)")]
    #[clap(value_name = "DIR")]
    #[arg(value_parser = check_file_exists)]
    pub gen_indel_dir: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'd')]
    #[clap(long = "oligos")]
    #[clap(help = "Oligo details table with ID, Target, PAM Location and PAM Direction columns")]
    #[clap(value_name = "OLIGOS")]
    #[arg(value_parser = check_file_exists)]
    pub oligo_details_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(help = "Directory for feature tables")]
    #[clap(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct ReadsArgs {
    #[clap(required = true)]
    #[clap(short = 'g')]
    #[clap(long = "gen-indels")]
    #[clap(help = "Directory of generated indel files (<oligo>_genindels.txt)")]
    #[clap(value_name = "DIR")]
    #[arg(value_parser = check_file_exists)]
    pub gen_indel_dir: PathBuf,

    #[clap(required = true)]
    #[clap(short = 's')]
    #[clap(long = "samples")]
    #[clap(help = "Sample directories holding per-oligo indel summary files")]
    #[clap(value_name = "SAMPLES")]
    #[arg(value_parser = check_file_exists, num_args = 1..)]
    pub sample_dirs: Vec<PathBuf>,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(help = "Directory for reads tables")]
    #[clap(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "no-exclude")]
    #[clap(help = "Keep every read regardless of background or cut-site span")]
    pub no_exclude: bool,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "remove-long-indels")]
    #[clap(help = "Drop indels longer than 30bp")]
    pub remove_long_indels: bool,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "wild-type")]
    #[clap(value_name = "WT_DIR")]
    #[clap(help = "Sample directory of an uncut control")]
    #[arg(value_parser = check_file_exists)]
    pub wild_type_dir: Option<PathBuf>,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "wt-thresh")]
    #[clap(value_name = "FOLD")]
    #[clap(help = "Enrichment over the control required to keep an indel seen in it")]
    #[clap(default_value = "3.0")]
    #[arg(value_parser = ensure_positive_float)]
    pub wt_thresh: f64,
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct TrainArgs {
    #[clap(required = true)]
    #[clap(short = 'f')]
    #[clap(long = "features-dir")]
    #[clap(help = "Directory of per-oligo feature tables")]
    #[clap(value_name = "DIR")]
    #[arg(value_parser = check_file_exists)]
    pub features_dir: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reads-dir")]
    #[clap(help = "Directory of per-oligo reads tables")]
    #[clap(value_name = "DIR")]
    #[arg(value_parser = check_file_exists)]
    pub reads_dir: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "oligos")]
    #[clap(help = "File listing one oligo id per line")]
    #[clap(value_name = "OLIGOS")]
    #[arg(value_parser = check_file_exists)]
    pub oligos_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 's')]
    #[clap(long = "samples")]
    #[clap(help = "Reads table columns to train on")]
    #[clap(value_name = "SAMPLES")]
    #[arg(num_args = 1..)]
    pub samples: Vec<String>,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Model file to write")]
    #[clap(value_name = "MODEL")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: String,

    #[clap(long = "reg")]
    #[clap(value_name = "LAMBDA")]
    #[clap(help = "Regularization of features other than insertion features")]
    #[clap(default_value = "0.000001")]
    #[arg(value_parser = ensure_positive_float)]
    pub reg: f64,

    #[clap(long = "i1-reg")]
    #[clap(value_name = "LAMBDA")]
    #[clap(help = "Regularization of features whose name contains 'I'")]
    #[clap(default_value = "0.001")]
    #[arg(value_parser = ensure_positive_float)]
    pub i1_reg: f64,

    #[clap(long = "folds")]
    #[clap(value_name = "FOLDS")]
    #[clap(help = "Number of cross-validation folds (1 trains on every oligo)")]
    #[clap(default_value = "2")]
    #[arg(value_parser = threads_in_range)]
    pub folds: usize,

    #[clap(long = "fold")]
    #[clap(value_name = "FOLD")]
    #[clap(help = "Cross-validation fold held out for testing")]
    #[clap(default_value = "0")]
    pub fold: usize,

    #[clap(short = 'w')]
    #[clap(long = "workers")]
    #[clap(help = "Number of objective worker threads")]
    #[clap(value_name = "WORKERS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_workers: usize,

    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(help = "Seed for the initial weights")]
    #[clap(default_value = "0")]
    pub seed: u64,

    #[clap(long = "resume")]
    #[clap(help = "Continue from the checkpoint of an interrupted run")]
    pub resume: bool,

    #[clap(long = "predicted-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help = "Write predicted profiles of train and test oligos here")]
    pub predicted_dir: Option<PathBuf>,

    #[clap(help_heading("Optimizer"))]
    #[clap(long = "tolerance")]
    #[clap(value_name = "TOL")]
    #[clap(help = "Convergence tolerance")]
    #[clap(default_value = "0.0001")]
    #[arg(value_parser = ensure_positive_float)]
    pub tolerance: f64,

    #[clap(help_heading("Optimizer"))]
    #[clap(long = "history")]
    #[clap(value_name = "PAIRS")]
    #[clap(help = "Number of correction pairs kept by L-BFGS")]
    #[clap(default_value = "10")]
    #[arg(value_parser = threads_in_range)]
    pub history: usize,

    #[clap(help_heading("Optimizer"))]
    #[clap(long = "max-iterations")]
    #[clap(value_name = "ITERATIONS")]
    #[clap(help = "Maximum number of L-BFGS iterations")]
    #[clap(default_value = "15000")]
    pub max_iterations: usize,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["target", "batch_path"])))]
#[command(arg_required_else_help(true))]
pub struct PredictArgs {
    #[clap(required = true)]
    #[clap(short = 'm')]
    #[clap(long = "model")]
    #[clap(help = "Trained model file")]
    #[clap(value_name = "MODEL")]
    #[arg(value_parser = check_file_exists)]
    pub model_path: PathBuf,

    #[clap(long = "target")]
    #[clap(value_name = "SEQ")]
    #[clap(help = "Target sequence")]
    pub target: Option<String>,

    #[clap(long = "pam-idx")]
    #[clap(value_name = "IDX")]
    #[clap(help = "Index of the PAM in the target sequence")]
    pub pam_idx: Option<usize>,

    #[clap(long = "catalog")]
    #[clap(value_name = "GENINDELS")]
    #[clap(help = "Generated indels of the target")]
    #[arg(value_parser = check_file_exists)]
    pub catalog_path: Option<PathBuf>,

    #[clap(long = "id")]
    #[clap(value_name = "ID")]
    #[clap(help = "Identifier of the single target")]
    #[clap(default_value = "Target")]
    pub id: String,

    #[clap(short = 'b')]
    #[clap(long = "batch")]
    #[clap(value_name = "TARGETS")]
    #[clap(help = "Table of targets with ID, Target, PAM Index and Catalog columns")]
    #[arg(value_parser = check_file_exists)]
    pub batch_path: Option<PathBuf>,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(long = "add-null")]
    #[clap(help = "Add an unedited outcome to each predicted profile")]
    pub add_null: bool,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct CompareArgs {
    #[clap(required = true)]
    #[clap(long = "first")]
    #[clap(help = "First indel summary file")]
    #[clap(value_name = "SUMMARY")]
    #[arg(value_parser = check_file_exists)]
    pub first_path: PathBuf,

    #[clap(required = true)]
    #[clap(long = "second")]
    #[clap(help = "Second indel summary file")]
    #[clap(value_name = "SUMMARY")]
    #[arg(value_parser = check_file_exists)]
    pub second_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Comparison table to write")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: String,

    #[clap(long = "keep-large-insertions")]
    #[clap(help = "Keep insertions longer than 1bp")]
    pub keep_large_insertions: bool,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> ParseResult<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> ParseResult<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Value must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> ParseResult<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn ensure_positive_float(s: &str) -> ParseResult<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !value.is_finite() || value < 0.0 {
        Err(format!("The value must be a non-negative number, got: {}", value))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn float_validator_rejects_negative_values() {
        assert_eq!(ensure_positive_float("0.5"), Ok(0.5));
        assert!(ensure_positive_float("-1").is_err());
        assert!(ensure_positive_float("abc").is_err());
    }

    #[test]
    fn predict_requires_a_target_or_batch() {
        let err = Cli::try_parse_from(["selftarget", "predict", "-m", "Cargo.toml", "-o", "out"]);
        assert!(err.is_err());
    }

    #[test]
    fn train_defaults() {
        let cli = Cli::try_parse_from([
            "selftarget", "train", "-f", "src", "-r", "src", "-i", "Cargo.toml", "-s", "S1", "-o",
            "model.txt",
        ])
        .unwrap();
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.folds, 2);
                assert_eq!(args.fold, 0);
                assert_eq!(args.history, 10);
                assert_eq!(args.max_iterations, 15000);
                assert!((args.tolerance - 1e-4).abs() < 1e-12);
            }
            _ => panic!("expected train"),
        }
    }
}

//! vocable-train — train a multilingual word classifier and score its
//! embeddings with the same-different task.
//!
//! ## Run layout
//!
//! Each run writes to `<models_dir>/<langs>.<tag>/<options-hash>/`:
//!
//! | File | Contents |
//! |------|----------|
//! | `options.json` | the fully-resolved [`options::TrainOptions`] |
//! | `classifier.ckpt.json` | intermediate checkpoint, every epoch |
//! | `classifier.best_val.ckpt.json` | best validation checkpoint |
//! | `record.json` | per-epoch training record |
//! | `val_ap.txt` | final SWDP AP, raw then standardized |

mod data;
mod options;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vocable_core::batching::{BatchingConfig, BucketIterator, SimpleIterator};
use vocable_core::dataset::WordDataset;
use vocable_core::model::{ClassifierHandle, StubClassifier, StubClassifierConfig};
use vocable_core::samediff::SameDifferentReport;
use vocable_core::train::{fixed_epochs, CheckpointPaths, TrainConfig};

use options::TrainOptions;

/// Loss decay of the stub backend; replaced when a real encoder lands.
const STUB_LOSS_DECAY: f32 = 0.05;

fn main() {
    if let Err(e) = run() {
        eprintln!("vocable-train failed: {e:#}");
        std::process::exit(1);
    }
}

#[derive(Debug)]
struct Args {
    options: TrainOptions,
    data_dir: PathBuf,
    models_dir: PathBuf,
}

fn print_usage() {
    println!(
        "Usage: vocable-train <train_lang> [--val_lang <code>] [--train_tag <gt|utd|rnd>] \\
  [--n_epochs <n>] [--batch_size <n>] [--n_buckets <n>] [--n_val_interval <n>] \\
  [--rnd_seed <n>] [--extrinsic_usefinal] [--data_dir <dir>] [--models_dir <dir>]

<train_lang> is a language code or a '+'-joined combination (e.g. BG+CH)."
    );
}

fn parse_args() -> Result<Args> {
    let mut options = TrainOptions::default();
    let mut data_dir = PathBuf::from("data");
    let mut models_dir = PathBuf::from("models");
    let mut train_lang: Option<String> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value_for = |flag: &str| -> Result<String> {
            it.next()
                .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
        };
        match arg.as_str() {
            "--val_lang" => options.val_lang = Some(value_for("--val_lang")?),
            "--train_tag" => options.train_tag = value_for("--train_tag")?,
            "--n_epochs" => {
                options.n_epochs = value_for("--n_epochs")?
                    .parse()
                    .context("invalid value for --n_epochs")?;
            }
            "--batch_size" => {
                options.batch_size = value_for("--batch_size")?
                    .parse()
                    .context("invalid value for --batch_size")?;
            }
            "--n_buckets" => {
                options.n_buckets = value_for("--n_buckets")?
                    .parse()
                    .context("invalid value for --n_buckets")?;
            }
            "--n_val_interval" => {
                options.n_val_interval = value_for("--n_val_interval")?
                    .parse()
                    .context("invalid value for --n_val_interval")?;
            }
            "--rnd_seed" => {
                options.rnd_seed = value_for("--rnd_seed")?
                    .parse()
                    .context("invalid value for --rnd_seed")?;
            }
            "--extrinsic_usefinal" => options.extrinsic_usefinal = true,
            "--data_dir" => data_dir = PathBuf::from(value_for("--data_dir")?),
            "--models_dir" => models_dir = PathBuf::from(value_for("--models_dir")?),
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown argument: {other}"),
            positional => {
                if train_lang.is_some() {
                    bail!("unexpected extra argument: {positional}");
                }
                train_lang = Some(positional.to_string());
            }
        }
    }

    let Some(train_lang) = train_lang else {
        print_usage();
        bail!("missing <train_lang>");
    };
    options.train_langs = train_lang.split('+').map(str::to_string).collect();

    Ok(Args {
        options,
        data_dir,
        models_dir,
    })
}

/// Concatenate the token tables of all training languages into one dataset,
/// tagging every token with its language code.
fn load_training_data(args: &Args) -> Result<WordDataset> {
    let split = format!("train.{}", args.options.train_tag);
    let mut sequences = Vec::new();
    let mut labels = Vec::new();
    let mut keys = Vec::new();
    let mut speakers = Vec::new();
    let mut languages = Vec::new();
    for lang in &args.options.train_langs {
        let tokens = data::load_language(&args.data_dir, lang, &split)?;
        languages.extend(std::iter::repeat(lang.clone()).take(tokens.sequences.len()));
        sequences.extend(tokens.sequences);
        labels.extend(tokens.labels);
        keys.extend(tokens.keys);
        speakers.extend(tokens.speakers);
    }
    info!(n_tokens = sequences.len(), "training data assembled");
    let mut dataset = WordDataset::new(sequences, labels, keys, speakers, languages)?;
    dataset.truncate_and_limit_dim(args.options.max_length, args.options.frame_dim);
    Ok(dataset)
}

fn load_validation_data(args: &Args, val_lang: &str) -> Result<WordDataset> {
    let tokens = data::load_language(&args.data_dir, val_lang, "val")?;
    let n = tokens.sequences.len();
    let mut dataset = WordDataset::new(
        tokens.sequences,
        tokens.labels,
        tokens.keys,
        tokens.speakers,
        vec![val_lang.to_string(); n],
    )?;
    dataset.truncate_and_limit_dim(args.options.max_length, args.options.frame_dim);
    Ok(dataset)
}

/// Embed the whole dataset in fixed order and score the embeddings.
fn samediff_report(
    model: &ClassifierHandle,
    dataset: &WordDataset,
    standardize: bool,
) -> vocable_core::error::Result<SameDifferentReport> {
    let iterator = SimpleIterator::whole_set(dataset.sequences(), None, None)?;
    let batch = iterator.single_full_batch()?;
    let embeddings = model.0.lock().encode(&batch)?;
    let labels: Vec<&String> = batch
        .indices
        .iter()
        .map(|&i| &dataset.labels()[i])
        .collect();
    let speakers: Vec<&String> = batch
        .indices
        .iter()
        .map(|&i| &dataset.speakers()[i])
        .collect();
    SameDifferentReport::evaluate(&embeddings, &labels, &speakers, standardize)
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    args.options.validate()?;

    let run_dir = args.options.experiment_dir(&args.models_dir)?;
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("create run directory {}", run_dir.display()))?;
    info!(run_dir = %run_dir.display(), "experiment directory");

    let options_path = run_dir.join("options.json");
    std::fs::write(
        &options_path,
        serde_json::to_string_pretty(&args.options).context("serialize options")?,
    )
    .with_context(|| format!("write {}", options_path.display()))?;

    // ── Data ────────────────────────────────────────────────────────────────
    let train_dataset = load_training_data(&args)?;
    let languages = train_dataset.intern_languages();
    let label_inventory = train_dataset.intern_labels(&languages);
    info!(
        n_tokens = train_dataset.len(),
        n_languages = languages.n_languages(),
        classes_per_language = ?label_inventory.n_classes(),
        "interned labels"
    );

    let val_dataset = match &args.options.val_lang {
        Some(val_lang) => Some(load_validation_data(&args, val_lang)?),
        None => None,
    };

    // ── Model ───────────────────────────────────────────────────────────────
    let model = ClassifierHandle::new(StubClassifier::new(StubClassifierConfig {
        embedding_dim: args.options.embedding_dim,
        classes_per_language: label_inventory.n_classes(),
        loss_decay: STUB_LOSS_DECAY,
    })?);
    model.0.lock().warm_up()?;

    // ── Train ───────────────────────────────────────────────────────────────
    let mut iterator = BucketIterator::new(
        train_dataset.sequences(),
        Some(label_inventory.class_ids()),
        Some(languages.ids()),
        BatchingConfig {
            batch_size: args.options.batch_size,
            n_buckets: args.options.n_buckets,
            shuffle_every_epoch: args.options.shuffle_every_epoch,
            seed: args.options.rnd_seed,
        },
    )?;

    let intermediate = run_dir.join("classifier.ckpt.json");
    let best = run_dir.join("classifier.best_val.ckpt.json");

    let val_model = model.clone();
    let mut validate = val_dataset.as_ref().map(|dataset| {
        move || -> vocable_core::error::Result<f64> {
            let report = samediff_report(&val_model, dataset, true)?;
            info!(
                swdp_ap = report.swdp.different_speaker_ap,
                swdp_prb = report.swdp.different_speaker_prb,
                "validation same-different"
            );
            // The loop minimises; flip so a better AP wins.
            Ok(-report.swdp.different_speaker_ap)
        }
    });

    let validate_dyn: Option<&mut dyn FnMut() -> vocable_core::error::Result<f64>> =
        validate.as_mut().map(|v| v as _);
    let records = fixed_epochs(
        &TrainConfig {
            n_epochs: args.options.n_epochs,
            n_val_interval: args.options.n_val_interval,
        },
        &model,
        &mut iterator,
        validate_dyn,
        CheckpointPaths {
            intermediate: &intermediate,
            best: val_dataset.as_ref().map(|_| best.as_path()),
        },
    )?;

    let record_path = run_dir.join("record.json");
    std::fs::write(
        &record_path,
        serde_json::to_string_pretty(&records).context("serialize record")?,
    )
    .with_context(|| format!("write {}", record_path.display()))?;

    // ── Final extrinsic evaluation ──────────────────────────────────────────
    if let Some(val_dataset) = &val_dataset {
        let chosen = if args.options.extrinsic_usefinal || !best.exists() {
            if !args.options.extrinsic_usefinal && !best.exists() {
                warn!("no best-validation checkpoint written — falling back to the final model");
            }
            &intermediate
        } else {
            &best
        };
        model.0.lock().restore(chosen)?;
        info!(checkpoint = %chosen.display(), "final validation");

        let raw = samediff_report(&model, val_dataset, false)?;
        let standardized = samediff_report(&model, val_dataset, true)?;
        info!(
            swdp_ap = raw.swdp.different_speaker_ap,
            swdp_ap_standardized = standardized.swdp.different_speaker_ap,
            "final same-different"
        );

        let ap_path = run_dir.join("val_ap.txt");
        std::fs::write(
            &ap_path,
            format!(
                "{}\n{}\n",
                raw.swdp.different_speaker_ap, standardized.swdp.different_speaker_ap
            ),
        )
        .with_context(|| format!("write {}", ap_path.display()))?;
    }

    info!(run_dir = %run_dir.display(), "run complete");
    Ok(())
}

//! `dlg-mnist`: reconstruct an MNIST training batch from its gradients.

use std::process;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;

use grad_leak::{leak_first_batch, DemoConfig, MnistData, Result};

const USAGE: &str = "\
dlg-mnist: reconstruct an MNIST training batch from its gradients

USAGE:
    dlg-mnist [OPTIONS]

OPTIONS:
    --use_gpu                request GPU execution (rejected on CPU-only builds)
    --batch_size <int>       batch size of the attacked training step [default: 2]
    --iterations <int>       attack iterations [default: 3000]
    --learning_rate <float>  attack step size [default: 0.1]
    --result_dir <path>      directory for image artifacts [default: ./att_results]
    --data_dir <path>        directory with the MNIST IDX files [default: ./data]
    --seed <int>             RNG seed for reproducible runs
    --snapshot_every <int>   save an intermediate reconstruction every N iterations [default: 100]
    -h, --help               print this help
";

fn parse_flag_value<T: FromStr>(args: &[String], i: &mut usize) -> std::result::Result<T, String> {
    let flag = args[*i].clone();
    *i += 1;
    let value = args
        .get(*i)
        .ok_or_else(|| format!("{flag} requires a value"))?;
    let parsed = value
        .parse()
        .map_err(|_| format!("invalid value {value:?} for {flag}"))?;
    *i += 1;
    Ok(parsed)
}

fn parse_args(args: &[String]) -> std::result::Result<DemoConfig, String> {
    let mut config = DemoConfig::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--use_gpu" => {
                config.use_gpu = true;
                i += 1;
            }
            "--batch_size" => config.batch_size = parse_flag_value(args, &mut i)?,
            "--iterations" => config.iterations = parse_flag_value(args, &mut i)?,
            "--learning_rate" => config.learning_rate = parse_flag_value(args, &mut i)?,
            "--result_dir" => config.result_dir = parse_flag_value(args, &mut i)?,
            "--data_dir" => config.data_dir = parse_flag_value(args, &mut i)?,
            "--seed" => config.seed = Some(parse_flag_value(args, &mut i)?),
            "--snapshot_every" => config.snapshot_every = Some(parse_flag_value(args, &mut i)?),
            other => return Err(format!("unknown flag {other}")),
        }
    }
    Ok(config)
}

fn run(config: &DemoConfig) -> Result<()> {
    config.validate()?;

    let dataset = MnistData::load_training(&config.data_dir)?;
    println!(
        "loaded {} training images from {}",
        dataset.len(),
        config.data_dir.display()
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let outcome = leak_first_batch(&dataset, config, &mut rng, |progress| {
        if progress.iteration % 50 == 0 {
            println!(
                "iter {:5}  grad-match loss {:.6e}",
                progress.iteration, progress.loss
            );
        }
    })?;

    println!();
    println!("real training loss: {:.6}", outcome.real_loss);
    println!("attack iterations:  {}", outcome.report.iterations_run);
    println!("best match loss:    {:.6e}", outcome.report.best_loss);
    println!("true labels:        {:?}", outcome.target.labels);
    println!("recovered labels:   {:?}", outcome.report.labels);
    for (i, mse) in outcome.per_image_mse().iter().enumerate() {
        println!("image {i}: reconstruction mse {mse:.6e}");
    }
    println!("artifacts saved under {}", config.result_dir.display());
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print!("{USAGE}");
        return;
    }

    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("error: {msg}");
            eprint!("{USAGE}");
            process::exit(2);
        }
    };

    if let Err(e) = run(&config) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_args_yield_defaults() {
        let config = parse_args(&[]).unwrap();
        assert!(!config.use_gpu);
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.iterations, 3000);
        assert_eq!(config.result_dir, PathBuf::from("./att_results"));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn all_flags_are_recognized() {
        let config = parse_args(&args(&[
            "--use_gpu",
            "--batch_size",
            "4",
            "--iterations",
            "500",
            "--learning_rate",
            "0.05",
            "--result_dir",
            "/tmp/out",
            "--data_dir",
            "/tmp/mnist",
            "--seed",
            "9",
            "--snapshot_every",
            "25",
        ]))
        .unwrap();

        assert!(config.use_gpu);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.iterations, 500);
        assert_eq!(config.learning_rate, 0.05);
        assert_eq!(config.result_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mnist"));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.snapshot_every, Some(25));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = parse_args(&args(&["--bogus"])).unwrap_err();
        assert!(err.contains("unknown flag"));
    }

    #[test]
    fn missing_value_is_rejected() {
        let err = parse_args(&args(&["--batch_size"])).unwrap_err();
        assert!(err.contains("requires a value"));
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = parse_args(&args(&["--iterations", "many"])).unwrap_err();
        assert!(err.contains("invalid value"));
    }
}

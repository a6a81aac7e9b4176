use grad_leak::{one_hot, DenseClassifier, DlgAttack, DlgConfig};
use ndarray::Array2;
use rand::{Rng, SeedableRng};

fn main() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let model = DenseClassifier::new(16, 10, &mut rng).expect("model");

    // A private "image" the attacker never sees directly.
    let secret = Array2::from_shape_fn((1, 16), |_| rng.gen::<f64>());
    let targets = one_hot(&[3], 10).expect("targets");
    let (_, grads) = model.loss_and_grads(&secret, &targets).expect("gradients");

    let config = DlgConfig {
        iterations: 2000,
        seed: Some(7),
        ..DlgConfig::default()
    };
    let attack = DlgAttack::new(config).expect("config");
    let report = attack
        .run_with_callback(&model, &grads, 1, |progress| {
            if progress.iteration % 200 == 0 {
                println!("iter {:4}  match loss {:.3e}", progress.iteration, progress.loss);
            }
            false
        })
        .expect("attack");

    let mse: f64 = secret
        .iter()
        .zip(report.images.iter())
        .map(|(s, r)| (s - r) * (s - r))
        .sum::<f64>()
        / 16.0;

    println!("recovered label: {:?}", report.labels);
    println!("best match loss: {:.3e}", report.best_loss);
    println!("reconstruction mse: {mse:.3e}");
}

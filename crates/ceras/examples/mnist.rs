//! MNIST Training Example
//!
//! Trains a two-layer perceptron on MNIST and reports test accuracy.
//!
//! Usage: cargo run --release --example mnist -- <dir-with-idx-files>
//! Set `RUST_LOG=info` (or `debug`) for per-epoch progress.

use ceras::dataset::mnist::{self, flatten_images};
use ceras::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = std::env::args().nth(1).unwrap_or_else(|| "./dataset/mnist".to_string());
    println!("=== Ceras - MNIST Training Example ===\n");

    // 1. Load data
    println!("1. Loading MNIST from {dir}...");
    let data = mnist::load_data(&dir)?;
    let x_train = flatten_images(&data.train_images)?;
    let x_test = flatten_images(&data.test_images)?;
    println!("   Training samples: {}", x_train.shape()[0]);
    println!("   Test samples: {}\n", x_test.shape()[0]);

    // 2. Build the model
    println!("2. Building 784-512-10 perceptron...");
    set_random_seed(42);
    let x = input();
    let net = Sequential::new()
        .add(Dense::new(28 * 28, 512)?)
        .add(ReLU)
        .add(Dropout::new(0.2)?)
        .add(Dense::new(512, 10)?);
    let model = Model::new(&x, &net.forward(&x)?)?;
    println!("   Parameters: {}\n", model.num_parameters());

    // 3. Train
    let batch_size = 128;
    println!("3. Training with Adam (batch_size={batch_size})...");
    let mut compiled = model.compile(cross_entropy_loss, |loss| Adam::new(loss, batch_size, 0.001 * batch_size as f32))?;
    let (training, validation) = compiled.fit(&x_train, &data.train_labels, batch_size, 2, true, 0.1)?;
    for (epoch, (t, v)) in training.iter().zip(validation.iter()).enumerate() {
        println!("   Epoch {}: training loss = {t:.4}, validation loss = {v:.4}", epoch + 1);
    }

    // 4. Test
    println!("\n4. Testing...");
    let logits = compiled.predict(&x_test)?;
    let predicted = logits.argmax_along(1)?;
    let expected = data.test_labels.argmax_along(1)?;
    let correct = predicted.iter().zip(expected.iter()).filter(|(p, e)| p == e).count();
    println!(
        "   Accuracy: {:.2}% ({correct}/{})",
        100.0 * correct as f32 / expected.len() as f32,
        expected.len()
    );

    Ok(())
}

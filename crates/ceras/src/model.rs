//! Models - Training Loops over Expression Graphs
//!
//! A [`Model`] pairs an input place holder with the output expression built
//! on top of it. Compiling a model attaches a loss against a fresh
//! ground-truth place holder and an optimizer bound to that loss, giving a
//! [`CompiledModel`] that can train, evaluate and predict on batched data.
//!
//! Sample tensors are row-major with the samples along the first axis; a
//! batch is a view of consecutive rows, so no data is copied.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::fmt;

use tracing::{debug, info};

use ceras_autograd::{Expression, PlaceHolder, Variable};
use ceras_core::config::LearningPhaseGuard;
use ceras_core::error::{Error, Result};
use ceras_nn::Layer;
use ceras_optim::Optimizer;
use ceras_tensor::Tensor;

// =============================================================================
// Model
// =============================================================================

/// An input place holder and the expression computed from it.
#[derive(Debug, Clone)]
pub struct Model {
    input: Expression,
    output: Expression,
}

impl Model {
    /// Creates a model. `input` must be a place holder expression, as
    /// returned by [`ceras_nn::input`].
    pub fn new(input: &Expression, output: &Expression) -> Result<Self> {
        if input.as_place_holder().is_none() {
            return Err(Error::invalid_operation(format!(
                "model input must be a place holder, got {}",
                input.name()
            )));
        }
        Ok(Self {
            input: input.clone(),
            output: output.clone(),
        })
    }

    /// The input place holder expression.
    pub fn input(&self) -> &Expression {
        &self.input
    }

    /// The output expression.
    pub fn output(&self) -> &Expression {
        &self.output
    }

    fn place_holder(&self) -> Result<&PlaceHolder> {
        self.input
            .as_place_holder()
            .ok_or_else(|| Error::internal("model input is not a place holder"))
    }

    /// Runs the model on `input` in the prediction phase.
    pub fn predict(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let _phase = LearningPhaseGuard::prediction();
        self.place_holder()?.bind(input.clone());
        self.output.forward()
    }

    /// Rebuilds the output with `ex` in place of the input place holder.
    ///
    /// The new expression shares this model's variables, so composing
    /// models shares their weights.
    pub fn call(&self, ex: &Expression) -> Result<Expression> {
        Ok(self.output.replace_place_holder(self.place_holder()?, ex))
    }

    /// Marks every variable of the model as trainable or frozen.
    pub fn trainable(&self, trainable: bool) {
        for variable in self.output.variables() {
            variable.set_trainable(trainable);
        }
    }

    /// Attaches a loss and an optimizer.
    ///
    /// `loss` receives `(prediction, ground_truth)`; `optimizer` receives the
    /// resulting loss expression and is expected to carry the batch size
    /// used for training.
    ///
    /// ```rust
    /// use ceras::prelude::*;
    ///
    /// let x = input();
    /// let y = Dense::new(3, 1).unwrap().forward(&x).unwrap();
    /// let model = Model::new(&x, &y).unwrap();
    /// let compiled = model.compile(mse, |loss| Sgd::new(loss, 8, 0.01)).unwrap();
    /// assert_eq!(compiled.optimizer().iterations(), 0);
    /// ```
    pub fn compile<L, F, O>(&self, loss: L, optimizer: F) -> Result<CompiledModel>
    where
        L: FnOnce(&Expression, &Expression) -> Expression,
        F: FnOnce(&Expression) -> Result<O>,
        O: Optimizer + 'static,
    {
        let ground_truth = PlaceHolder::new();
        let loss = loss(&self.output, &Expression::from(&ground_truth));
        let optimizer = optimizer(&loss)?;
        debug!(
            variables = loss.trainable_variables().len(),
            "model compiled"
        );
        Ok(CompiledModel {
            model: self.clone(),
            ground_truth,
            loss,
            optimizer: Box::new(optimizer),
        })
    }
}

impl Layer for Model {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        self.call(input)
    }

    fn variables(&self) -> Vec<Variable> {
        self.output.variables()
    }

    fn set_trainable(&self, trainable: bool) {
        self.trainable(trainable);
    }

    fn name(&self) -> &'static str {
        "Model"
    }
}

// =============================================================================
// Compiled Model
// =============================================================================

/// A model with a loss and an optimizer attached.
pub struct CompiledModel {
    model: Model,
    ground_truth: PlaceHolder,
    loss: Expression,
    optimizer: Box<dyn Optimizer>,
}

impl fmt::Debug for CompiledModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModel")
            .field("model", &self.model)
            .field("loss", &self.loss)
            .field("iterations", &self.optimizer.iterations())
            .finish_non_exhaustive()
    }
}

impl CompiledModel {
    /// The underlying model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The loss expression.
    pub fn loss(&self) -> &Expression {
        &self.loss
    }

    /// The optimizer.
    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    /// The optimizer, mutably, e.g. to adjust the learning rate between epochs.
    pub fn optimizer_mut(&mut self) -> &mut dyn Optimizer {
        self.optimizer.as_mut()
    }

    fn bind(&self, input: Tensor<f32>, ground_truth: Tensor<f32>) -> Result<()> {
        self.model.place_holder()?.bind(input);
        self.ground_truth.bind(ground_truth);
        Ok(())
    }

    fn run_loss(&self) -> Result<f32> {
        self.loss.forward()?.as_scalar()
    }

    /// One optimizer update on a single batch; returns the loss before the update.
    pub fn train_on_batch(&mut self, input: &Tensor<f32>, ground_truth: &Tensor<f32>) -> Result<f32> {
        let _phase = LearningPhaseGuard::training();
        self.bind(input.clone(), ground_truth.clone())?;
        let error = self.run_loss()?;
        self.optimizer.step()?;
        Ok(error)
    }

    /// Mean loss over the full batches of `(inputs, outputs)` in the
    /// prediction phase. Trailing samples that do not fill a batch are skipped.
    pub fn evaluate(&self, inputs: &Tensor<f32>, outputs: &Tensor<f32>, batch_size: usize) -> Result<f32> {
        let batches = Batches::new(inputs, outputs, batch_size)?;
        let _phase = LearningPhaseGuard::prediction();

        let mut total = 0.0;
        for l in 0..batches.len() {
            let (x, y) = batches.get(l)?;
            self.bind(x, y)?;
            total += self.run_loss()?;
        }
        Ok(total / batches.len() as f32)
    }

    /// Trains for `epochs` passes over the data.
    ///
    /// The data is cut into `samples / batch_size` batches; the last
    /// `validation_split` fraction of them is held out and only evaluated.
    /// Returns the mean training and validation loss of every epoch; with
    /// no validation batches the validation loss is reported as zero.
    pub fn fit(
        &mut self,
        inputs: &Tensor<f32>,
        outputs: &Tensor<f32>,
        batch_size: usize,
        epochs: usize,
        verbose: bool,
        validation_split: f32,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        if !(0.0..=1.0).contains(&validation_split) {
            return Err(Error::invalid_operation(format!(
                "validation split must lie in [0, 1], got {validation_split}"
            )));
        }
        let batches = Batches::new(inputs, outputs, batch_size)?;
        let training_loops = ((1.0 - validation_split) * batches.len() as f32) as usize;
        let validation_loops = batches.len() - training_loops;
        if training_loops == 0 {
            return Err(Error::invalid_operation(
                "validation split leaves no batch for training",
            ));
        }

        let mut training_errors = Vec::with_capacity(epochs);
        let mut validation_errors = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let mut training_error = 0.0;
            for l in 0..training_loops {
                let (x, y) = batches.get(l)?;
                training_error += self.train_on_batch(&x, &y)?;
            }

            let mut validation_error = 0.0;
            if validation_loops > 0 {
                let _phase = LearningPhaseGuard::prediction();
                for l in training_loops..batches.len() {
                    let (x, y) = batches.get(l)?;
                    self.bind(x, y)?;
                    validation_error += self.run_loss()?;
                }
                validation_error /= validation_loops as f32;
            }
            training_error /= training_loops as f32;

            if verbose {
                info!(
                    epoch = epoch + 1,
                    epochs,
                    training_error,
                    validation_error,
                    "epoch finished"
                );
            } else {
                debug!(epoch = epoch + 1, training_error, validation_error, "epoch finished");
            }
            training_errors.push(training_error);
            validation_errors.push(validation_error);
        }

        Ok((training_errors, validation_errors))
    }

    /// Runs the model on `input` in the prediction phase.
    pub fn predict(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        self.model.predict(input)
    }

    /// See [`Model::call`].
    pub fn call(&self, ex: &Expression) -> Result<Expression> {
        self.model.call(ex)
    }

    /// See [`Model::trainable`].
    pub fn trainable(&self, trainable: bool) {
        self.model.trainable(trainable);
    }
}

// =============================================================================
// Batching
// =============================================================================

/// Paired input and output tensors cut into full batches along the first axis.
struct Batches<'a> {
    inputs: &'a Tensor<f32>,
    outputs: &'a Tensor<f32>,
    batch_size: usize,
    count: usize,
}

impl<'a> Batches<'a> {
    fn new(inputs: &'a Tensor<f32>, outputs: &'a Tensor<f32>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::invalid_operation("batch size must be positive"));
        }
        let samples = *inputs.shape().first().ok_or(Error::EmptyTensor)?;
        let labels = *outputs.shape().first().ok_or(Error::EmptyTensor)?;
        if samples != labels {
            return Err(Error::invalid_operation(format!(
                "{samples} input samples but {labels} output samples"
            )));
        }
        let count = samples / batch_size;
        if count == 0 {
            return Err(Error::invalid_operation(format!(
                "{samples} samples do not fill a batch of {batch_size}"
            )));
        }
        Ok(Self {
            inputs,
            outputs,
            batch_size,
            count,
        })
    }

    fn len(&self) -> usize {
        self.count
    }

    fn get(&self, index: usize) -> Result<(Tensor<f32>, Tensor<f32>)> {
        let begin = index * self.batch_size;
        let end = begin + self.batch_size;
        Ok((self.inputs.slice(begin, end)?, self.outputs.slice(begin, end)?))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_autograd::functions::{mse, sigmoid};
    use ceras_nn::{input, Dense};
    use ceras_optim::{Adam, Sgd};

    fn tensor(data: Vec<f32>, shape: &[usize]) -> Tensor<f32> {
        Tensor::from_vec(data, shape).unwrap()
    }

    fn linear_model() -> (Model, Dense) {
        let x = input();
        let dense = Dense::from_weights(tensor(vec![1.0, 2.0], &[2, 1]), tensor(vec![0.5], &[1, 1])).unwrap();
        let y = dense.forward(&x).unwrap();
        (Model::new(&x, &y).unwrap(), dense)
    }

    #[test]
    fn test_model_requires_place_holder_input() {
        let x = Expression::constant(Tensor::ones(&[1, 2]));
        assert!(Model::new(&x, &x).is_err());
    }

    #[test]
    fn test_predict() {
        let (model, _) = linear_model();
        let out = model.predict(&tensor(vec![1.0, 1.0, 2.0, 0.0], &[2, 2])).unwrap();
        assert_eq!(out.to_vec(), vec![3.5, 2.5]);
    }

    #[test]
    fn test_call_shares_weights() {
        let (model, dense) = linear_model();
        let z = ceras_autograd::PlaceHolder::new();
        let composed = model.call(&sigmoid(&Expression::from(&z))).unwrap();
        z.bind(Tensor::zeros(&[1, 2]));
        // sigmoid(0) = 0.5 on both inputs
        assert_eq!(composed.forward().unwrap().to_vec(), vec![2.0]);

        let vars = composed.variables();
        assert!(vars.iter().any(|v| v.ptr_eq(&dense.weight)));
    }

    #[test]
    fn test_trainable_toggles_every_variable() {
        let (model, dense) = linear_model();
        model.trainable(false);
        assert!(!dense.weight.trainable());
        assert!(!dense.bias.trainable());
        model.trainable(true);
        assert!(dense.weight.trainable());
    }

    #[test]
    fn test_train_on_batch_reduces_loss() {
        let (model, _) = linear_model();
        let mut compiled = model.compile(mse, |loss| Sgd::new(loss, 2, 0.1)).unwrap();
        let x = tensor(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]);
        let y = tensor(vec![0.0, 0.0], &[2, 1]);

        let first = compiled.train_on_batch(&x, &y).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = compiled.train_on_batch(&x, &y).unwrap();
        }
        assert!(last < first * 0.1, "loss went from {first} to {last}");
        assert_eq!(compiled.optimizer().iterations(), 51);
    }

    #[test]
    fn test_evaluate_averages_full_batches() {
        let (model, _) = linear_model();
        let compiled = model.compile(mse, |loss| Sgd::new(loss, 1, 0.1)).unwrap();
        // predictions: 0.5, 1.5, 2.5 against zero targets; the third sample is dropped
        let x = tensor(vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0], &[3, 2]);
        let y = Tensor::zeros(&[3, 1]);
        let error = compiled.evaluate(&x, &y, 2).unwrap();
        assert!((error - (0.25 + 2.25) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_evaluate_rejects_bad_batches() {
        let (model, _) = linear_model();
        let compiled = model.compile(mse, |loss| Sgd::new(loss, 1, 0.1)).unwrap();
        let x = Tensor::zeros(&[3, 2]);
        assert!(compiled.evaluate(&x, &Tensor::zeros(&[3, 1]), 0).is_err());
        assert!(compiled.evaluate(&x, &Tensor::zeros(&[3, 1]), 4).is_err());
        assert!(compiled.evaluate(&x, &Tensor::zeros(&[2, 1]), 1).is_err());
    }

    #[test]
    fn test_fit_with_validation_split() {
        let (model, _) = linear_model();
        let mut compiled = model
            .compile(mse, |loss| Ok(Adam::new(loss, 2, 0.05)?.betas((0.9, 0.999))))
            .unwrap();
        let x = tensor((0..16).map(|i| (i % 4) as f32 * 0.25).collect(), &[8, 2]);
        let y = Tensor::zeros(&[8, 1]);

        let (training, validation) = compiled.fit(&x, &y, 2, 20, false, 0.25).unwrap();
        assert_eq!(training.len(), 20);
        assert_eq!(validation.len(), 20);
        assert!(training[19] < training[0]);
        assert!(validation.iter().all(|&v| v > 0.0));
        // three training batches per epoch
        assert_eq!(compiled.optimizer().iterations(), 60);
    }

    #[test]
    fn test_fit_without_validation_reports_zero() {
        let (model, _) = linear_model();
        let mut compiled = model.compile(mse, |loss| Sgd::new(loss, 2, 0.01)).unwrap();
        let x = Tensor::ones(&[4, 2]);
        let y = Tensor::zeros(&[4, 1]);
        let (_, validation) = compiled.fit(&x, &y, 2, 2, false, 0.0).unwrap();
        assert_eq!(validation, vec![0.0, 0.0]);
    }

    #[test]
    fn test_fit_rejects_bad_split() {
        let (model, _) = linear_model();
        let mut compiled = model.compile(mse, |loss| Sgd::new(loss, 2, 0.01)).unwrap();
        let x = Tensor::ones(&[4, 2]);
        let y = Tensor::zeros(&[4, 1]);
        assert!(compiled.fit(&x, &y, 2, 1, false, 1.5).is_err());
        assert!(compiled.fit(&x, &y, 2, 1, false, 1.0).is_err());
    }
}

//! Feed-forward binary classifier
//!
//! # Architecture
//!
//! Input (n features) → Dense(32, ReLU) → Dense(16, ReLU) → Dense(1, sigmoid)
//!
//! The output is the click probability.
//!
//! # Algorithm
//!
//! Training: mini-batch Adam minimizing binary cross-entropy
//! Inference: single forward pass, probability thresholded by the caller
//!
//! # References
//!
//! Glorot, X., & Bengio, Y. (2010). Understanding the difficulty of training
//! deep feedforward neural networks. AISTATS.
//!
//! Kingma, D. P., & Ba, J. (2015). Adam: A method for stochastic optimization.
//! ICLR.

use crate::predictor::{PredictorError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Probabilities are clipped to [EPSILON, 1 - EPSILON] inside the loss
const EPSILON: f64 = 1e-7;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => sigmoid(z),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fully connected layer with Adam moment estimates
#[derive(Debug, Clone)]
struct DenseLayer {
    /// weights[i][j]: input i → unit j
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    activation: Activation,
    m_weights: Vec<Vec<f64>>,
    v_weights: Vec<Vec<f64>>,
    m_bias: Vec<f64>,
    v_bias: Vec<f64>,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero bias
    fn new(input_dim: usize, units: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (input_dim + units) as f64).sqrt();
        let weights: Vec<Vec<f64>> = (0..input_dim)
            .map(|_| (0..units).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect();

        Self {
            weights,
            bias: vec![0.0; units],
            activation,
            m_weights: vec![vec![0.0; units]; input_dim],
            v_weights: vec![vec![0.0; units]; input_dim],
            m_bias: vec![0.0; units],
            v_bias: vec![0.0; units],
        }
    }

    fn units(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (j, o) in out.iter_mut().enumerate() {
            for (i, &x) in input.iter().enumerate() {
                *o += self.weights[i][j] * x;
            }
        }
        out.into_iter().map(|z| self.activation.apply(z)).collect()
    }

    /// One Adam step from accumulated (already averaged) gradients
    fn adam_step(&mut self, grad_w: &[Vec<f64>], grad_b: &[f64], lr: f64, step: i32) {
        let correction1 = 1.0 - ADAM_BETA1.powi(step);
        let correction2 = 1.0 - ADAM_BETA2.powi(step);

        for i in 0..self.weights.len() {
            for j in 0..self.units() {
                let g = grad_w[i][j];
                let m = &mut self.m_weights[i][j];
                let v = &mut self.v_weights[i][j];
                *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                self.weights[i][j] -= lr * m_hat / (v_hat.sqrt() + EPSILON);
            }
        }

        for j in 0..self.units() {
            let g = grad_b[j];
            self.m_bias[j] = ADAM_BETA1 * self.m_bias[j] + (1.0 - ADAM_BETA1) * g;
            self.v_bias[j] = ADAM_BETA2 * self.v_bias[j] + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = self.m_bias[j] / correction1;
            let v_hat = self.v_bias[j] / correction2;
            self.bias[j] -= lr * m_hat / (v_hat.sqrt() + EPSILON);
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Trailing fraction of the training rows used only for validation
    pub validation_fraction: f64,
    /// Seed for batch shuffling
    pub seed: u64,
}

/// Metrics recorded at the end of one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Mean binary cross-entropy over the epoch's training batches
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// Per-epoch training history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
    pub train_rows: usize,
    pub validation_rows: usize,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Multi-layer perceptron with ReLU hidden layers and a sigmoid output unit
#[derive(Debug, Clone)]
pub struct ClickClassifier {
    layers: Vec<DenseLayer>,
    input_dim: usize,
    step: i32,
}

impl ClickClassifier {
    /// Build a classifier with the given hidden layer widths
    pub fn new(input_dim: usize, hidden_units: &[usize], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(hidden_units.len() + 1);
        let mut fan_in = input_dim;

        for &units in hidden_units {
            layers.push(DenseLayer::new(fan_in, units, Activation::Relu, &mut rng));
            fan_in = units;
        }
        layers.push(DenseLayer::new(fan_in, 1, Activation::Sigmoid, &mut rng));

        Self {
            layers,
            input_dim,
            step: 0,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Units per layer, output layer included
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(DenseLayer::units).collect()
    }

    /// Activations of every layer, input first
    fn forward_cached(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1]);
            activations.push(next);
        }
        activations
    }

    /// Click probability for one feature row
    pub fn predict_proba(&self, input: &[f64]) -> f64 {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.forward(&current);
        }
        current[0]
    }

    /// Click probabilities for many rows
    pub fn predict_proba_batch(&self, inputs: &[Vec<f64>]) -> Vec<f64> {
        inputs.iter().map(|x| self.predict_proba(x)).collect()
    }

    /// Train on `features`/`labels`, holding out the trailing
    /// `validation_fraction` of rows for validation
    pub fn fit(
        &mut self,
        features: &[Vec<f64>],
        labels: &[u8],
        options: &TrainingOptions,
    ) -> Result<TrainingHistory> {
        if features.len() != labels.len() {
            return Err(PredictorError::DimensionMismatch {
                expected: features.len(),
                actual: labels.len(),
            });
        }
        if let Some(row) = features.iter().find(|row| row.len() != self.input_dim) {
            return Err(PredictorError::DimensionMismatch {
                expected: self.input_dim,
                actual: row.len(),
            });
        }
        if options.epochs == 0 || options.batch_size == 0 {
            return Err(PredictorError::InvalidOption(
                "epochs and batch_size must be >= 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&options.validation_fraction) {
            return Err(PredictorError::InvalidOption(format!(
                "validation_fraction must be in [0, 1), got {}",
                options.validation_fraction
            )));
        }

        // Validation rows are the tail of the training set, taken before shuffling
        let split_at =
            (features.len() as f64 * (1.0 - options.validation_fraction)).floor() as usize;
        if split_at == 0 {
            return Err(PredictorError::InsufficientData {
                required: 1,
                actual: split_at,
            });
        }
        let (train_x, val_x) = features.split_at(split_at);
        let (train_y, val_y) = labels.split_at(split_at);

        tracing::info!(
            "Training {:?} classifier on {} rows ({} validation) for {} epochs",
            self.layer_sizes(),
            train_x.len(),
            val_x.len(),
            options.epochs
        );

        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut order: Vec<usize> = (0..train_x.len()).collect();
        let mut history = TrainingHistory {
            epochs: Vec::with_capacity(options.epochs),
            train_rows: train_x.len(),
            validation_rows: val_x.len(),
        };

        for epoch in 1..=options.epochs {
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            let mut correct = 0usize;
            for batch in order.chunks(options.batch_size) {
                let (batch_loss, batch_correct) =
                    self.train_batch(train_x, train_y, batch, options.learning_rate);
                loss_sum += batch_loss;
                correct += batch_correct;
            }

            let (val_loss, val_accuracy) = if val_x.is_empty() {
                (None, None)
            } else {
                let (loss, accuracy) = self.evaluate(val_x, val_y);
                (Some(loss), Some(accuracy))
            };

            let metrics = EpochMetrics {
                epoch,
                loss: loss_sum / train_x.len() as f64,
                accuracy: correct as f64 / train_x.len() as f64,
                val_loss,
                val_accuracy,
            };
            tracing::info!(
                "Epoch {}/{}: loss={:.4} accuracy={:.4} val_loss={:?} val_accuracy={:?}",
                epoch,
                options.epochs,
                metrics.loss,
                metrics.accuracy,
                metrics.val_loss,
                metrics.val_accuracy
            );
            history.epochs.push(metrics);
        }

        Ok(history)
    }

    /// Forward/backward pass over one batch followed by an Adam update
    ///
    /// Returns the summed loss and number of correct predictions of the batch,
    /// both measured before the update.
    fn train_batch(
        &mut self,
        features: &[Vec<f64>],
        labels: &[u8],
        batch: &[usize],
        learning_rate: f64,
    ) -> (f64, usize) {
        let mut grad_w: Vec<Vec<Vec<f64>>> = self
            .layers
            .iter()
            .map(|l| vec![vec![0.0; l.units()]; l.weights.len()])
            .collect();
        let mut grad_b: Vec<Vec<f64>> = self.layers.iter().map(|l| vec![0.0; l.units()]).collect();

        let mut loss_sum = 0.0;
        let mut correct = 0usize;

        for &idx in batch {
            let activations = self.forward_cached(&features[idx]);
            let target = f64::from(labels[idx]);
            let prob = activations[activations.len() - 1][0];

            loss_sum += binary_cross_entropy(prob, target);
            if u8::from(prob > 0.5) == labels[idx] {
                correct += 1;
            }

            // Sigmoid + cross-entropy: dL/dz = p - y
            let mut delta = vec![prob - target];

            for l in (0..self.layers.len()).rev() {
                let input = &activations[l];
                for (i, &x) in input.iter().enumerate() {
                    for (j, &d) in delta.iter().enumerate() {
                        grad_w[l][i][j] += d * x;
                    }
                }
                for (j, &d) in delta.iter().enumerate() {
                    grad_b[l][j] += d;
                }

                if l == 0 {
                    break;
                }

                // Propagate to the previous (ReLU) layer
                let layer = &self.layers[l];
                let mut prev_delta = vec![0.0; input.len()];
                for (i, pd) in prev_delta.iter_mut().enumerate() {
                    if input[i] <= 0.0 {
                        continue;
                    }
                    for (j, &d) in delta.iter().enumerate() {
                        *pd += layer.weights[i][j] * d;
                    }
                }
                delta = prev_delta;
            }
        }

        let scale = 1.0 / batch.len() as f64;
        self.step += 1;
        for (l, layer) in self.layers.iter_mut().enumerate() {
            for row in grad_w[l].iter_mut() {
                for g in row.iter_mut() {
                    *g *= scale;
                }
            }
            for g in grad_b[l].iter_mut() {
                *g *= scale;
            }
            layer.adam_step(&grad_w[l], &grad_b[l], learning_rate, self.step);
        }

        (loss_sum, correct)
    }

    /// Mean loss and accuracy over a labelled set
    pub fn evaluate(&self, features: &[Vec<f64>], labels: &[u8]) -> (f64, f64) {
        if features.is_empty() {
            return (0.0, 0.0);
        }
        let mut loss = 0.0;
        let mut correct = 0usize;
        for (x, &y) in features.iter().zip(labels) {
            let prob = self.predict_proba(x);
            loss += binary_cross_entropy(prob, f64::from(y));
            if u8::from(prob > 0.5) == y {
                correct += 1;
            }
        }
        let n = features.len() as f64;
        (loss / n, correct as f64 / n)
    }
}

/// Binary cross-entropy of one prediction
pub fn binary_cross_entropy(prob: f64, target: f64) -> f64 {
    let p = prob.clamp(EPSILON, 1.0 - EPSILON);
    -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(epochs: usize) -> TrainingOptions {
        TrainingOptions {
            epochs,
            batch_size: 32,
            learning_rate: 0.01,
            validation_fraction: 0.2,
            seed: 42,
        }
    }

    /// Label is 1 exactly when the first feature is 1
    fn separable(n: usize) -> (Vec<Vec<f64>>, Vec<u8>) {
        let features: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![(i % 2) as f64, ((i / 2) % 3) as f64, ((i / 6) % 2) as f64])
            .collect();
        let labels = features.iter().map(|x| x[0] as u8).collect();
        (features, labels)
    }

    #[test]
    fn test_layer_sizes() {
        let clf = ClickClassifier::new(3, &[32, 16], 42);
        assert_eq!(clf.layer_sizes(), vec![32, 16, 1]);
        assert_eq!(clf.input_dim(), 3);
    }

    #[test]
    fn test_initialization_reproducible() {
        let a = ClickClassifier::new(3, &[32, 16], 42);
        let b = ClickClassifier::new(3, &[32, 16], 42);
        let x = [1.0, 2.0, 0.0];
        assert_eq!(a.predict_proba(&x), b.predict_proba(&x));
    }

    #[test]
    fn test_probability_in_unit_interval() {
        let clf = ClickClassifier::new(3, &[32, 16], 7);
        for x in [[0.0, 0.0, 0.0], [5.0, 3.0, 1.0], [-100.0, 50.0, 2.0]] {
            let p = clf.predict_proba(&x);
            assert!((0.0..=1.0).contains(&p), "p={}", p);
        }
    }

    #[test]
    fn test_sigmoid_stable_for_large_inputs() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_binary_cross_entropy() {
        assert!((binary_cross_entropy(0.5, 1.0) - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(binary_cross_entropy(1.0, 1.0) < 1e-6);
        // Clipping keeps the loss finite
        assert!(binary_cross_entropy(0.0, 1.0).is_finite());
    }

    #[test]
    fn test_training_reduces_loss() {
        let (features, labels) = separable(400);
        let mut clf = ClickClassifier::new(3, &[32, 16], 42);

        let history = clf.fit(&features, &labels, &options(30)).unwrap();

        let first = history.epochs[0].loss;
        let last = history.last().unwrap().loss;
        assert!(last < first, "Training should reduce loss: {} -> {}", first, last);
        assert!(history.last().unwrap().accuracy > 0.9);
    }

    #[test]
    fn test_history_shape() {
        let (features, labels) = separable(100);
        let mut clf = ClickClassifier::new(3, &[8], 1);
        let history = clf.fit(&features, &labels, &options(4)).unwrap();

        assert_eq!(history.epochs.len(), 4);
        assert_eq!(history.train_rows, 80);
        assert_eq!(history.validation_rows, 20);
        assert!(history.epochs.iter().all(|e| e.val_loss.is_some()));
        assert_eq!(history.epochs[3].epoch, 4);
    }

    #[test]
    fn test_no_validation_split() {
        let (features, labels) = separable(50);
        let mut clf = ClickClassifier::new(3, &[4], 1);
        let mut opts = options(2);
        opts.validation_fraction = 0.0;

        let history = clf.fit(&features, &labels, &opts).unwrap();
        assert_eq!(history.validation_rows, 0);
        assert!(history.epochs.iter().all(|e| e.val_accuracy.is_none()));
    }

    #[test]
    fn test_fit_reproducible() {
        let (features, labels) = separable(120);
        let mut a = ClickClassifier::new(3, &[32, 16], 42);
        let mut b = ClickClassifier::new(3, &[32, 16], 42);

        let ha = a.fit(&features, &labels, &options(3)).unwrap();
        let hb = b.fit(&features, &labels, &options(3)).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut clf = ClickClassifier::new(3, &[4], 1);
        let err = clf
            .fit(&[vec![1.0, 2.0]], &[1], &options(1))
            .unwrap_err();
        assert!(matches!(
            err,
            PredictorError::DimensionMismatch { expected: 3, actual: 2 }
        ));

        assert!(clf.fit(&[vec![1.0, 2.0, 3.0]], &[], &options(1)).is_err());
    }

    #[test]
    fn test_validation_consumes_everything() {
        let mut clf = ClickClassifier::new(3, &[4], 1);
        let mut opts = options(1);
        opts.validation_fraction = 0.9;
        assert!(matches!(
            clf.fit(&[vec![0.0, 0.0, 0.0]], &[0], &opts),
            Err(PredictorError::InsufficientData { .. })
        ));
    }
}

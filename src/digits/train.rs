use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use super::DigitsError;
use super::data::{DigitImage, IMAGE_SIDE, LabelledImages, batch_pixels};
use super::model::{ActivationKind, DigitClassifier, DigitClassifierConfig, NUM_CLASSES};
use crate::config::DigitsSettings;
use crate::ml::metrics::{ConfusionMatrix, accuracy};

#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Upper bound on epochs; early stopping usually ends sooner.
    pub num_epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub activation: ActivationKind,
    /// Seeds shuffling and crop offsets.
    pub seed: u64,
    /// Non-improving epochs tolerated before stopping.
    pub patience: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            num_epochs: 40,
            batch_size: 64,
            learning_rate: 1e-4,
            weight_decay: 0.01,
            activation: ActivationKind::Relu,
            seed: 503,
            patience: 0,
        }
    }
}

impl TrainOptions {
    pub fn from_settings(settings: &DigitsSettings) -> Self {
        Self {
            num_epochs: settings.num_epochs,
            batch_size: settings.batch_size,
            learning_rate: settings.learning_rate,
            weight_decay: settings.weight_decay,
            activation: ActivationKind::from_name(&settings.activation),
            seed: settings.seed,
            ..Self::default()
        }
    }
}

/// Lower-is-better stopping rule on the validation loss.
///
/// With `patience == 0` training stops at the first epoch whose loss is not
/// strictly below the best seen so far.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best_value: Option<f64>,
    best_epoch: usize,
    current_epoch: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_value: None,
            best_epoch: 0,
            current_epoch: 0,
        }
    }

    /// Record one epoch's loss; returns `true` when training should stop.
    pub fn should_stop(&mut self, value: f64) -> bool {
        let epoch = self.current_epoch;
        self.current_epoch += 1;
        if self.best_value.is_none_or(|best| value < best) {
            self.best_value = Some(value);
            self.best_epoch = epoch;
        }
        epoch - self.best_epoch > self.patience
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    pub epochs: Vec<EpochMetrics>,
    pub stopped_early: bool,
    pub best_val_loss: Option<f64>,
    /// Validation confusion matrix of the last epoch run.
    pub val_confusion: Option<ConfusionMatrix>,
}

#[derive(Debug)]
struct Running {
    batches: usize,
    loss: f64,
    confusion: ConfusionMatrix,
}

impl Running {
    fn new() -> Self {
        Self {
            batches: 0,
            loss: 0.0,
            confusion: ConfusionMatrix::new(NUM_CLASSES),
        }
    }

    fn add(&mut self, loss: f64, predicted: &[u8], labels: &[u8]) {
        self.batches += 1;
        self.loss += loss;
        for (&truth, &guess) in labels.iter().zip(predicted) {
            self.confusion.add(usize::from(truth), usize::from(guess));
        }
    }

    fn mean_loss(&self) -> f64 {
        self.loss / self.batches.max(1) as f64
    }

    fn accuracy(&self) -> f64 {
        f64::from(accuracy(&self.confusion))
    }
}

/// Train a fresh classifier and return it with per-epoch metrics.
pub fn train<B: AutodiffBackend>(
    device: &B::Device,
    train_set: &LabelledImages,
    val_set: &LabelledImages,
    options: &TrainOptions,
) -> Result<(DigitClassifier<B>, TrainReport), DigitsError> {
    if options.batch_size == 0 {
        return Err(DigitsError::Settings("batch_size must be positive".to_string()));
    }
    if train_set.is_empty() || val_set.is_empty() {
        return Err(DigitsError::Settings(format!(
            "need training and validation images, got {} and {}",
            train_set.len(),
            val_set.len()
        )));
    }

    let mut model: DigitClassifier<B> = DigitClassifierConfig::new(options.activation).init(device);
    let mut optim = AdamWConfig::new()
        .with_weight_decay(options.weight_decay as f32)
        .init::<B, DigitClassifier<B>>();
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut stopper = EarlyStopping::new(options.patience);
    let mut report = TrainReport::default();
    let mut order: Vec<usize> = (0..train_set.len()).collect();

    for epoch in 0..options.num_epochs {
        order.shuffle(&mut rng);
        let mut running = Running::new();
        for chunk in order.chunks(options.batch_size) {
            let pixels = batch_pixels(chunk.iter().map(|&idx| &train_set.images[idx]), Some(&mut rng));
            let labels: Vec<u8> = chunk.iter().map(|&idx| train_set.labels[idx]).collect();
            let logits = model.forward(images_tensor::<B>(pixels, chunk.len(), device));
            let predicted = argmax(logits.clone());
            let loss = loss_fn.forward(logits, labels_tensor::<B>(&labels, device));
            running.add(loss.clone().into_scalar().elem::<f64>(), &predicted, &labels);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(options.learning_rate, model, grads);
        }

        let val = evaluate(&model.valid(), val_set, options.batch_size, device);
        let (val_loss, val_accuracy) = (val.mean_loss(), val.accuracy());
        let metrics = EpochMetrics {
            epoch,
            train_loss: running.mean_loss(),
            train_accuracy: running.accuracy(),
            val_loss,
            val_accuracy,
        };
        info!(
            "[TRAIN] Epoch {epoch} loss {:.4} acc {:.4}",
            metrics.train_loss, metrics.train_accuracy
        );
        info!("[VAL] Epoch {epoch} loss {val_loss:.4} acc {val_accuracy:.4}");
        report.epochs.push(metrics);
        report.val_confusion = Some(val.confusion);

        if stopper.should_stop(val_loss) {
            info!("Validation loss did not decrease. Early stopping.");
            report.stopped_early = true;
            break;
        }
    }
    report.best_val_loss = stopper.best_value();
    Ok((model, report))
}

/// Batch losses and confusion counts without gradient tracking.
fn evaluate<B: Backend>(
    model: &DigitClassifier<B>,
    data: &LabelledImages,
    batch_size: usize,
    device: &B::Device,
) -> Running {
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut running = Running::new();
    for (images, labels) in data
        .images
        .chunks(batch_size)
        .zip(data.labels.chunks(batch_size))
    {
        let logits = model.forward(images_tensor::<B>(batch_pixels(images, None), images.len(), device));
        let predicted = argmax(logits.clone());
        let loss = loss_fn.forward(logits, labels_tensor::<B>(labels, device));
        running.add(loss.into_scalar().elem::<f64>(), &predicted, labels);
    }
    running
}

/// Most likely digit for every image.
pub fn predict<B: Backend>(
    model: &DigitClassifier<B>,
    images: &[DigitImage],
    batch_size: usize,
    device: &B::Device,
) -> Vec<u8> {
    let mut labels = Vec::with_capacity(images.len());
    for chunk in images.chunks(batch_size.max(1)) {
        let logits = model.forward(images_tensor::<B>(batch_pixels(chunk, None), chunk.len(), device));
        labels.extend(argmax(logits));
    }
    labels
}

fn images_tensor<B: Backend>(pixels: Vec<f32>, batch: usize, device: &B::Device) -> Tensor<B, 4> {
    Tensor::from_data(TensorData::new(pixels, [batch, 1, IMAGE_SIDE, IMAGE_SIDE]), device)
}

fn labels_tensor<B: Backend>(labels: &[u8], device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<i64> = labels.iter().map(|&label| i64::from(label)).collect();
    Tensor::from_data(TensorData::new(values, [labels.len()]), device)
}

fn argmax<B: Backend>(logits: Tensor<B, 2>) -> Vec<u8> {
    logits
        .argmax(1)
        .into_data()
        .iter::<i64>()
        .map(|class| class as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn keeps_going_while_loss_improves() {
        let mut stopper = EarlyStopping::new(0);
        for loss in [1.0, 0.8, 0.5, 0.49] {
            assert!(!stopper.should_stop(loss));
        }
        assert_eq!(stopper.best_epoch(), 3);
        assert_eq!(stopper.best_value(), Some(0.49));
    }

    #[test]
    fn stops_on_first_non_improving_epoch() {
        let mut stopper = EarlyStopping::new(0);
        assert!(!stopper.should_stop(0.7));
        assert!(stopper.should_stop(0.7));

        let mut stopper = EarlyStopping::new(0);
        assert!(!stopper.should_stop(0.7));
        assert!(!stopper.should_stop(0.6));
        assert!(stopper.should_stop(0.65));
        assert_eq!(stopper.best_value(), Some(0.6));
    }

    #[test]
    fn patience_tolerates_flat_epochs() {
        let mut stopper = EarlyStopping::new(2);
        assert!(!stopper.should_stop(0.5));
        assert!(!stopper.should_stop(0.6));
        assert!(!stopper.should_stop(0.6));
        assert!(stopper.should_stop(0.6));
    }

    fn toy_images(n: usize) -> LabelledImages {
        let mut data = LabelledImages::default();
        for idx in 0..n {
            let label = (idx % 2) as u8;
            let mut image = [[0.0f32; IMAGE_SIDE]; IMAGE_SIDE];
            // Vertical bar for ones, horizontal bar for zeros.
            for k in 4..24 {
                if label == 1 {
                    image[k][14] = 1.0;
                } else {
                    image[14][k] = 1.0;
                }
            }
            data.images.push(image);
            data.labels.push(label);
        }
        data
    }

    #[test]
    fn trains_and_predicts_on_cpu() {
        type B = Autodiff<NdArray>;
        let device = Default::default();
        let options = TrainOptions {
            num_epochs: 2,
            batch_size: 4,
            learning_rate: 1e-3,
            ..TrainOptions::default()
        };
        let (model, report) = train::<B>(&device, &toy_images(8), &toy_images(4), &options).unwrap();
        assert!(!report.epochs.is_empty() && report.epochs.len() <= 2);
        let confusion = report.val_confusion.as_ref().unwrap();
        let (right, wrong) = confusion.right_wrong();
        assert_eq!(right + wrong, 4);
        for metrics in &report.epochs {
            assert!(metrics.train_loss.is_finite());
            assert!(metrics.val_loss.is_finite());
            assert!((0.0..=1.0).contains(&metrics.val_accuracy));
        }

        let labels = predict(&model.valid(), &toy_images(5).images, 2, &device);
        assert_eq!(labels.len(), 5);
        assert!(labels.iter().all(|&label| label < 10));
    }

    #[test]
    fn rejects_empty_validation_set() {
        type B = Autodiff<NdArray>;
        let device = Default::default();
        let result = train::<B>(&device, &toy_images(4), &LabelledImages::default(), &TrainOptions::default());
        assert!(matches!(result, Err(DigitsError::Settings(_))));
    }
}

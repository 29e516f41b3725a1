pub mod initializer;
pub mod optimizer;

use crate::dataset::{TargetDataset, TrainingDataset};
use crate::error::{CfError, Result};
use crate::models::{Rating, TrainableRecord};
use crate::utils::metrics::RatingMetrics;
use nalgebra::DVector;
use optimizer::{Optimizer, Sgd};
use tracing::{debug, info, warn};

pub const DEFAULT_ITERATIONS: usize = 500;
pub const DEFAULT_LAMBDA: f64 = 0.0;
pub const DEFAULT_ALPHA: f64 = 0.01;

/// Hyperparameters of a fit run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    /// Number of epochs.
    pub iterations: usize,
    /// L2 regularization strength.
    pub lambda: f64,
    /// Learning rate.
    pub alpha: f64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            lambda: DEFAULT_LAMBDA,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl FitParams {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub epochs: usize,
    pub observations: usize,
    /// Mean squared error over every training observation after the last epoch.
    pub training_mse: f64,
}

/// Latent-factor model trained by alternating gradient steps.
///
/// Holds no state: every operation is a function of the datasets passed in,
/// so one instance can be shared freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollaborativeFiltering;

impl CollaborativeFiltering {
    pub fn new() -> Self {
        Self
    }

    pub fn inner_product(&self, a: &DVector<f64>, b: &DVector<f64>) -> Result<f64> {
        check_dimension(a.len(), b.len())?;
        Ok(a.dot(b))
    }

    /// Gradient of the squared error over `ratings`, plus the L2 penalty,
    /// with respect to `theta` while the counterparts `x` are held fixed.
    pub fn gradient_descent(
        &self,
        ratings: &[f64],
        theta: &DVector<f64>,
        x: &[&DVector<f64>],
        lambda: f64,
    ) -> Result<DVector<f64>> {
        check_dimension(ratings.len(), x.len())?;

        let mut gradient = DVector::zeros(theta.len());
        for (&rating, &x_n) in ratings.iter().zip(x) {
            let error = self.inner_product(theta, x_n)? - rating;
            gradient.axpy(error, x_n, 1.0);
        }
        gradient.axpy(lambda, theta, 1.0);
        Ok(gradient)
    }

    /// `dest[k] -= alpha * src[k]`.
    pub fn update(&self, dest: &mut DVector<f64>, src: &DVector<f64>, alpha: f64) -> Result<()> {
        check_dimension(dest.len(), src.len())?;
        Sgd::new(alpha).update(dest, src);
        Ok(())
    }

    /// Runs `params.iterations` epochs, then discards the observations.
    /// A run that leaves any latent vector non-finite fails with
    /// [`CfError::NonFinite`] and keeps the observations.
    ///
    /// Each epoch first steps every user against the current item vectors,
    /// then steps every item against the user vectors just updated.
    pub fn fit(&self, dataset: &mut TrainingDataset, params: &FitParams) -> Result<FitReport> {
        let report = {
            let (users, items) = dataset.trainable_mut()?;
            if users.is_empty() {
                return Err(CfError::InvalidState(
                    "cannot fit a dataset without observations".into(),
                ));
            }

            info!(
                users = users.len(),
                items = items.len(),
                iterations = params.iterations,
                lambda = params.lambda,
                alpha = params.alpha,
                "fitting latent factors"
            );

            let mut sgd = Sgd::new(params.alpha);
            for epoch in 0..params.iterations {
                self.step(users, items, params.lambda, &mut sgd)?;
                self.step(items, users, params.lambda, &mut sgd)?;

                if epoch % 100 == 0 {
                    debug!(epoch, mse = self.training_metrics(users, items)?.mse, "epoch");
                }
            }

            let metrics = self.training_metrics(users, items)?;
            FitReport {
                epochs: params.iterations,
                observations: metrics.count,
                training_mse: metrics.mse,
            }
        };

        if let Err(err) = dataset.ensure_finite() {
            warn!(
                training_mse = report.training_mse,
                alpha = params.alpha,
                "fit diverged: {}",
                err
            );
            return Err(err);
        }

        info!(
            epochs = report.epochs,
            training_mse = report.training_mse,
            "fit complete"
        );
        dataset.cleanup();
        Ok(report)
    }

    /// One gradient step for every record on one side against the other side.
    fn step(
        &self,
        records: &mut [TrainableRecord],
        counterparts: &[TrainableRecord],
        lambda: f64,
        sgd: &mut Sgd,
    ) -> Result<()> {
        for record in records.iter_mut() {
            let others: Vec<&DVector<f64>> = record
                .observations
                .counterparts()
                .iter()
                .map(|&idx| &counterparts[idx].latent)
                .collect();
            let gradient = self.gradient_descent(
                record.observations.ratings(),
                &record.latent,
                &others,
                lambda,
            )?;
            sgd.update(&mut record.latent, &gradient);
        }
        Ok(())
    }

    fn training_metrics(
        &self,
        users: &[TrainableRecord],
        items: &[TrainableRecord],
    ) -> Result<RatingMetrics> {
        let mut pairs = Vec::new();
        for user in users {
            let observations = &user.observations;
            for (&item, &rating) in observations.counterparts().iter().zip(observations.ratings()) {
                pairs.push((self.inner_product(&user.latent, &items[item].latent)?, rating));
            }
        }
        Ok(RatingMetrics::from_pairs(&pairs))
    }

    /// Appends one prediction per query of `target`, in query order.
    /// Nothing is appended if any query names an unknown user or item.
    pub fn transform(&self, dataset: &TrainingDataset, target: &mut TargetDataset) -> Result<()> {
        let predictions = target
            .queries()
            .map(|(user, item)| self.predict(dataset, user, item))
            .collect::<Result<Vec<_>>>()?;
        debug!(queries = predictions.len(), "transformed target dataset");
        target.append_predictions(predictions);
        Ok(())
    }

    pub fn predict(&self, dataset: &TrainingDataset, user: &str, item: &str) -> Result<f64> {
        self.inner_product(dataset.user_vector(user)?, dataset.item_vector(item)?)
    }

    /// Scores held-out ratings against the current latent vectors.
    pub fn evaluate(&self, dataset: &TrainingDataset, ratings: &[Rating]) -> Result<RatingMetrics> {
        let pairs = ratings
            .iter()
            .map(|r| self.predict(dataset, &r.user, &r.item).map(|p| (p, r.rating)))
            .collect::<Result<Vec<_>>>()?;
        Ok(RatingMetrics::from_pairs(&pairs))
    }
}

fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CfError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

use nalgebra::DVector;

pub trait Optimizer {
    fn update(&mut self, params: &mut DVector<f64>, gradients: &DVector<f64>);
}

/// Plain gradient step: `params[k] -= learning_rate * gradients[k]`.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, params: &mut DVector<f64>, gradients: &DVector<f64>) {
        *params -= gradients * self.learning_rate;
    }
}

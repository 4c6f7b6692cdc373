/// Rectified linear unit, `leak` is the slope used for negative inputs (0 for a plain ReLU).
#[derive(Clone, Copy, Debug, Default)]
pub struct Relu {
    leak: f32,
}

impl Relu {
    pub fn new(leak: f32) -> Self {
        Self { leak }
    }

    pub fn f(&self, z: f32) -> f32 {
        if z > 0. { z } else { self.leak * z }
    }

    pub fn df(&self, z: f32) -> f32 {
        if z > 0. { 1. } else { self.leak }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaky_slope_applies_to_negatives_only() {
        let relu = Relu::new(0.2);
        assert_eq!(relu.f(3.), 3.);
        assert!((relu.f(-1.) + 0.2).abs() < 1e-6);
        assert_eq!(relu.df(3.), 1.);
        assert_eq!(relu.df(-3.), 0.2);
    }
}

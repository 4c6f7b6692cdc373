use ndarray::{Array2, ArrayView2};

/// A tensor together with whether gradients may flow back into the network that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    value: Array2<f32>,
    requires_grad: bool,
}

impl Tracked {
    /// Wraps the output of a network, gradients flow back by default.
    pub fn new(value: Array2<f32>) -> Self {
        Self {
            value,
            requires_grad: true,
        }
    }

    /// Stops the gradient: the value is kept, the link to its producer is dropped.
    pub fn detach(self) -> Self {
        Self {
            requires_grad: false,
            ..self
        }
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.value.view()
    }

    pub fn nrows(&self) -> usize {
        self.value.nrows()
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn detach_keeps_value_and_stops_gradient() {
        let x = Tracked::new(array![[1., -1.], [0.5, 0.]]);
        assert!(x.requires_grad());

        let detached = x.clone().detach();
        assert!(!detached.requires_grad());
        assert_eq!(detached.view(), x.view());
        assert_eq!(detached.into_inner(), x.into_inner());
    }
}

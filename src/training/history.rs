/// Mean losses of both networks, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    generator: Vec<f32>,
    discriminator: Vec<f32>,
}

impl LossHistory {
    /// Records the mean losses of an epoch.
    pub fn push(&mut self, generator: f32, discriminator: f32) {
        self.generator.push(generator);
        self.discriminator.push(discriminator);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.generator.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.generator.is_empty()
    }

    pub fn generator(&self) -> &[f32] {
        &self.generator
    }

    pub fn discriminator(&self) -> &[f32] {
        &self.discriminator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_grow_together() {
        let mut history = LossHistory::default();
        assert!(history.is_empty());

        history.push(1., 2.);
        history.push(0.5, 1.5);

        assert_eq!(history.len(), 2);
        assert_eq!(history.generator(), &[1., 0.5]);
        assert_eq!(history.discriminator(), &[2., 1.5]);
    }
}

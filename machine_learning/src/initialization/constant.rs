use super::ParamGen;

/// Fills every parameter with the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstParamGen(pub f32);

impl ParamGen for ConstParamGen {
    fn fill(&mut self, block: &mut [f32]) {
        block.fill(self.0);
    }
}

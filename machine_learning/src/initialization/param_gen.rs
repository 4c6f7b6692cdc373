/// Produces the initial values of a block of parameters.
pub trait ParamGen {
    /// Overwrites every value of `block`.
    fn fill(&mut self, block: &mut [f32]);
}

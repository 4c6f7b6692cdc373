mod constant;
mod param_gen;
mod random;

pub use constant::ConstParamGen;
pub use param_gen::ParamGen;
pub use random::RandParamGen;

use std::{cell::RefCell, rc::Rc};

use rand::Rng;

use crate::{
    Result,
    arch::{BlockKind, ParamLayout},
};

/// Builds a flat parameter vector for `layout`, filling weight blocks with `weights` and bias
/// blocks with `biases`.
pub fn init_params(
    layout: &ParamLayout,
    weights: &mut dyn ParamGen,
    biases: &mut dyn ParamGen,
) -> Vec<f32> {
    let mut params = vec![0.; layout.len()];

    for block in layout.blocks() {
        let param_gen: &mut dyn ParamGen = match block.kind {
            BlockKind::Weight => &mut *weights,
            BlockKind::Bias => &mut *biases,
        };
        param_gen.fill(&mut params[block.range.clone()]);
    }

    params
}

/// Builds the initial parameters of a model: weights are drawn from `N(mean, std_dev)` and biases
/// start at zero.
///
/// # Arguments
/// * `layout` - The model's parameter layout.
/// * `rng` - A random number generator.
/// * `mean`, `std_dev` - The parameters of the weights' normal distribution.
///
/// # Returns
/// A flat parameter vector of `layout.len()` values or an error if the distribution is invalid.
pub fn normal_weights_zero_biases<R: Rng>(
    layout: &ParamLayout,
    rng: Rc<RefCell<R>>,
    mean: f32,
    std_dev: f32,
) -> Result<Vec<f32>> {
    let mut weights = RandParamGen::normal(rng, mean, std_dev)?;
    Ok(init_params(layout, &mut weights, &mut ConstParamGen(0.)))
}

//! Lazy strategy construction over a parameter space.

use std::marker::PhantomData;

use crate::domain::error::QuantframeError;
use crate::domain::parameter::{ParameterKey, ParameterValues};
use crate::domain::parameter_space::ParameterSpace;

/// Wraps a recipe turning one [`ParameterValues`] into a strategy. Nothing is
/// built until the stream is iterated.
pub struct Producer<K: ParameterKey, S, F> {
    recipe: F,
    _marker: PhantomData<fn(&ParameterValues<K>) -> S>,
}

impl<K, S, F> Producer<K, S, F>
where
    K: ParameterKey,
    F: Fn(&ParameterValues<K>) -> Result<S, QuantframeError>,
{
    pub fn from_recipe(recipe: F) -> Self {
        Producer {
            recipe,
            _marker: PhantomData,
        }
    }

    /// Build a single strategy. Recipe failures other than parameter lookups
    /// are reported as [`QuantframeError::StrategyConstructionFailed`].
    pub fn build(&self, values: &ParameterValues<K>) -> Result<S, QuantframeError> {
        (self.recipe)(values).map_err(|e| match e {
            QuantframeError::MissingOrMistypedParameter { .. }
            | QuantframeError::StrategyConstructionFailed { .. } => e,
            other => QuantframeError::StrategyConstructionFailed {
                reason: format!("{} ({})", other, values),
            },
        })
    }

    /// One entry per combination, in combination order.
    pub fn stream<'a>(
        &'a self,
        space: &'a ParameterSpace<K>,
    ) -> impl Iterator<Item = (ParameterValues<K>, Result<S, QuantframeError>)> + 'a {
        space.combinations().map(move |values| {
            let built = self.build(&values);
            (values, built)
        })
    }
}

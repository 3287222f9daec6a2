//! Per-datum log-probabilities and the synthetic-gradient translation seam
//! used by `forward_backward_custom`.
//!
//! The server's synthetic-gradient wire schema is undocumented, so the
//! translation step is left to the caller: the coordinator's sequencing,
//! chunking, and
//! aggregation is fully implemented and tested against an injected
//! [`GradientTranslator`] rather than guessing at server-private wire
//! details.

use tinker_core::estimate::Datum;

/// Per-datum log-probabilities returned by a forward pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogProbs {
    pub values: Vec<f64>,
}

/// Translates a caller's computed gradients into the synthetic loss-weight
/// datums the server's `forward_backward` step expects.
///
/// The translation must be deterministic and reversible with respect to
/// the server's gradient contract; this trait only names the seam, not
/// the contract itself.
pub trait GradientTranslator: Send + Sync {
    fn translate(&self, data: &[Datum], logprobs: &[LogProbs]) -> Vec<Datum>;
}

impl<F> GradientTranslator for F
where
    F: Fn(&[Datum], &[LogProbs]) -> Vec<Datum> + Send + Sync,
{
    fn translate(&self, data: &[Datum], logprobs: &[LogProbs]) -> Vec<Datum> {
        self(data, logprobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinker_core::estimate::ModelInput;

    #[test]
    fn closures_implement_gradient_translator() {
        let translator = |data: &[Datum], _logprobs: &[LogProbs]| data.to_vec();
        let data = vec![Datum::new(ModelInput::default())];
        let translated = translator.translate(&data, &[]);
        assert_eq!(translated, data);
    }
}

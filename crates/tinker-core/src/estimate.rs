//! Byte estimation for chunks, model inputs, and datums.
//!
//! The core treats `Datum`/`ModelInput`/`Chunk` as opaque-but-size-estimable
//! in the abstract; since this crate has no sibling tokenizer/training-loop
//! crate to import concrete types from, minimal structural types are defined
//! here so the estimator (and `tinker-chunker`) have something real to
//! operate on.
//!
//! All estimates are deterministic integers derived from the fixed wire-
//! overhead heuristic `10 × element_count`, which must stay identical across
//! the training and sampling paths for consistent chunking/admission
//! behavior.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The wire-overhead multiplier applied to token and tensor-element counts.
pub const WIRE_OVERHEAD_MULTIPLIER: u64 = 10;

/// One piece of a [`ModelInput`].
///
/// `Serialize`/`Deserialize` are derived so a coordinator can place these
/// directly into a request body; the exact wire shape is a server contract
/// this engine doesn't document, so this is its own minimal encoding rather
/// than a documented format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chunk {
    /// A run of token IDs.
    EncodedText { token_ids: Vec<u32> },
    /// Raw image bytes plus their encoding format (e.g. `"png"`).
    Image { data: Vec<u8>, format: String },
    /// A pointer to an externally stored image (location string + format).
    ImageAssetPointer { location: String, format: String },
}

impl Chunk {
    /// Deterministic byte estimate per the fixed rules:
    /// encoded text is `10 × token_count`; image chunks use the raw byte
    /// size; asset pointers use the byte size of the location string.
    pub fn estimated_bytes(&self) -> u64 {
        match self {
            Chunk::EncodedText { token_ids } => {
                token_ids.len() as u64 * WIRE_OVERHEAD_MULTIPLIER
            }
            Chunk::Image { data, .. } => data.len() as u64,
            Chunk::ImageAssetPointer { location, .. } => location.len() as u64,
        }
    }
}

/// An ordered sequence of [`Chunk`]s forming one model input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    pub chunks: Vec<Chunk>,
}

impl ModelInput {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn estimated_bytes(&self) -> u64 {
        self.chunks.iter().map(Chunk::estimated_bytes).sum()
    }
}

/// A named loss-function input: either a tensor-like value (sized by element
/// count) or an array-backed entry (sized by raw byte length).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LossInput {
    Tensor { element_count: u64 },
    Array { data: Vec<u8> },
}

impl LossInput {
    pub fn estimated_bytes(&self) -> u64 {
        match self {
            LossInput::Tensor { element_count } => element_count * WIRE_OVERHEAD_MULTIPLIER,
            LossInput::Array { data } => data.len() as u64 * WIRE_OVERHEAD_MULTIPLIER,
        }
    }
}

/// A single training or sampling datum: a model input plus named loss inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub model_input: ModelInput,
    pub loss_fn_inputs: HashMap<String, LossInput>,
}

impl Datum {
    pub fn new(model_input: ModelInput) -> Self {
        Self {
            model_input,
            loss_fn_inputs: HashMap::new(),
        }
    }

    /// Sum over the model-input chunks plus the loss-fn-inputs sum.
    pub fn estimated_bytes(&self) -> u64 {
        self.model_input.estimated_bytes()
            + self
                .loss_fn_inputs
                .values()
                .map(LossInput::estimated_bytes)
                .sum::<u64>()
    }
}

/// Sum of [`Datum::estimated_bytes`] over a slice, used by the dispatch and
/// chunker paths. Additive by construction, so
/// `estimate_datums(concat(a, b)) == estimate_datums(a) + estimate_datums(b)`.
pub fn estimate_datums(datums: &[Datum]) -> u64 {
    datums.iter().map(Datum::estimated_bytes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_datum(tokens: usize) -> Datum {
        Datum::new(ModelInput::new(vec![Chunk::EncodedText {
            token_ids: vec![0; tokens],
        }]))
    }

    #[test]
    fn encoded_text_is_ten_times_token_count() {
        let c = Chunk::EncodedText {
            token_ids: vec![1, 2, 3],
        };
        assert_eq!(c.estimated_bytes(), 30);
    }

    #[test]
    fn image_chunk_is_raw_byte_size() {
        let c = Chunk::Image {
            data: vec![0u8; 4096],
            format: "png".into(),
        };
        assert_eq!(c.estimated_bytes(), 4096);
    }

    #[test]
    fn asset_pointer_is_location_byte_size() {
        let c = Chunk::ImageAssetPointer {
            location: "s3://bucket/key".into(),
            format: "png".into(),
        };
        assert_eq!(c.estimated_bytes(), "s3://bucket/key".len() as u64);
    }

    #[test]
    fn datum_sums_model_input_and_loss_inputs() {
        let mut d = text_datum(10);
        d.loss_fn_inputs
            .insert("advantages".into(), LossInput::Tensor { element_count: 5 });
        // 10 tokens * 10 + 5 elements * 10 = 150
        assert_eq!(d.estimated_bytes(), 150);
    }

    #[test]
    fn estimator_is_additive_over_concatenation() {
        let a = vec![text_datum(10), text_datum(20)];
        let b = vec![text_datum(5)];
        let mut concat = a.clone();
        concat.extend(b.clone());
        assert_eq!(
            estimate_datums(&concat),
            estimate_datums(&a) + estimate_datums(&b)
        );
    }
}

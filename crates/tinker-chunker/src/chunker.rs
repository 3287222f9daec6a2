//! Greedy left-to-right chunking, jointly bounded by item count and an
//! estimated byte budget.

use crate::config::ChunkerConfig;
use tinker_core::estimate::Datum;

/// A contiguous run of datums, plus the summed estimate that put it under
/// the configured byte budget.
#[derive(Debug, Clone, Default)]
pub struct DatumChunk {
    pub datums: Vec<Datum>,
    pub estimated_bytes: u64,
}

impl DatumChunk {
    fn push(&mut self, datum: Datum, bytes: u64) {
        self.datums.push(datum);
        self.estimated_bytes += bytes;
    }
}

/// Splits `datums` into chunks satisfying `len <= config.max_items` and
/// `estimated_bytes <= config.max_bytes`, greedily filling each chunk before
/// opening the next.
///
/// A chunk only closes ahead of a datum that would push it over either
/// bound, and only when it already holds at least one datum — a single
/// datum whose own estimate exceeds `max_bytes` is still placed alone in
/// its own chunk rather than never admitted. Order is preserved:
/// concatenating the chunks' datums reproduces the input.
pub fn chunk_datums(datums: Vec<Datum>, config: &ChunkerConfig) -> Vec<DatumChunk> {
    let mut chunks = Vec::new();
    let mut current = DatumChunk::default();

    for datum in datums {
        let bytes = datum.estimated_bytes();
        let would_exceed_items = current.datums.len() + 1 > config.max_items;
        let would_exceed_bytes = current.estimated_bytes + bytes > config.max_bytes;

        if !current.datums.is_empty() && (would_exceed_items || would_exceed_bytes) {
            chunks.push(std::mem::take(&mut current));
        }

        current.push(datum, bytes);
    }

    if !current.datums.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tinker_core::estimate::{Chunk, ModelInput};

    fn text_datum(tokens: usize) -> Datum {
        Datum::new(ModelInput::new(vec![Chunk::EncodedText {
            token_ids: vec![0; tokens],
        }]))
    }

    #[test]
    fn splits_2049_datums_into_1024_1024_1() {
        // 2049 datums of 100 tokens each (1000 estimated bytes apiece) against
        // the default config: item count, not byte budget, is the binding
        // bound, so chunks come out [1024, 1024, 1].
        let datums: Vec<Datum> = (0..2049).map(|_| text_datum(100)).collect();
        let chunks = chunk_datums(datums, &ChunkerConfig::default());
        let sizes: Vec<usize> = chunks.iter().map(|c| c.datums.len()).collect();
        assert_eq!(sizes, vec![1024, 1024, 1]);
    }

    #[test]
    fn oversized_single_datum_gets_its_own_chunk() {
        let config = ChunkerConfig::builder().max_bytes(100).build();
        let huge = text_datum(1000); // 10_000 estimated bytes, over the 100-byte budget alone
        let chunks = chunk_datums(vec![huge], &config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].datums.len(), 1);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = chunk_datums(Vec::new(), &ChunkerConfig::default());
        assert!(chunks.is_empty());
    }

    fn arb_datum() -> impl Strategy<Value = Datum> {
        (1usize..200).prop_map(text_datum)
    }

    proptest! {
        #[test]
        fn chunks_respect_joint_bounds_and_preserve_order(
            datums in proptest::collection::vec(arb_datum(), 0..200)
        ) {
            let config = ChunkerConfig::builder().max_items(16).max_bytes(5_000).build();
            let input_len = datums.len();
            let chunks = chunk_datums(datums.clone(), &config);

            let mut reconstructed_len = 0usize;
            for chunk in &chunks {
                prop_assert!(chunk.datums.len() <= config.max_items);
                prop_assert!(chunk.estimated_bytes <= config.max_bytes || chunk.datums.len() == 1);
                prop_assert!(!chunk.datums.is_empty());
                reconstructed_len += chunk.datums.len();
            }
            prop_assert_eq!(reconstructed_len, input_len);
        }
    }
}

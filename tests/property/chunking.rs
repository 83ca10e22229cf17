//! Property-based tests for file chunking and reassembly.
//!
//! Uses proptest to verify:
//! 1. Split-then-concatenate restores the input for any payload/chunk size.
//! 2. The chunk count never over- or under-counts, including at exact
//!    multiples of the chunk size.
//! 3. Ingesting the chunks of a transfer in an arbitrary permutation
//!    completes exactly once with byte-identical content.
//! 4. Random bytes never cause a panic in `codec::decode`.

use proptest::prelude::*;

use meshchat_proto::assembler::FileAssembler;
use meshchat_proto::chunk::{chunk_count, split};
use meshchat_proto::codec;
use meshchat_proto::message::FileChunk;

/// Strategy for payload/chunk-size pairs, covering the empty payload and
/// chunk sizes both smaller and larger than the payload.
fn arb_payload_and_chunk_size() -> impl Strategy<Value = (Vec<u8>, usize)> {
    (prop::collection::vec(any::<u8>(), 0..16_384), 1usize..4096)
}

/// Wraps the split of `bytes` into wire-level chunks from one sender.
fn chunks_of(bytes: &[u8], chunk_size: usize) -> Vec<FileChunk> {
    let parts = split(bytes, chunk_size);
    let total = u32::try_from(parts.len()).unwrap();
    parts
        .into_iter()
        .enumerate()
        .map(|(i, chunk_data)| FileChunk {
            file_name: "prop.bin".into(),
            sender_id: "peer-prop".into(),
            sender_name: "prop".into(),
            chunk_index: u32::try_from(i).unwrap(),
            total_chunks: total,
            chunk_data,
        })
        .collect()
}

proptest! {
    #[test]
    fn split_concat_restores_input((bytes, chunk_size) in arb_payload_and_chunk_size()) {
        let rebuilt: Vec<u8> = split(&bytes, chunk_size).concat();
        prop_assert_eq!(rebuilt, bytes);
    }

    #[test]
    fn chunk_count_matches_split((bytes, chunk_size) in arb_payload_and_chunk_size()) {
        prop_assert_eq!(split(&bytes, chunk_size).len(), chunk_count(bytes.len(), chunk_size));
    }

    #[test]
    fn exact_multiples_never_gain_a_chunk(full_chunks in 1usize..32, chunk_size in 1usize..2048) {
        // A payload of exactly n*chunk_size bytes splits into n chunks.
        prop_assert_eq!(chunk_count(full_chunks * chunk_size, chunk_size), full_chunks);
    }

    #[test]
    fn shuffled_ingest_reassembles_exactly(
        (bytes, chunk_size) in arb_payload_and_chunk_size(),
        shuffle_seed in any::<prop::sample::Index>(),
    ) {
        let chunks = chunks_of(&bytes, chunk_size);
        let n = chunks.len();

        // Derive a permutation from the seed (Fisher-Yates with an
        // index-based step so the property stays deterministic per case).
        let mut order: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            let j = shuffle_seed.index(i + 1);
            order.swap(i, j);
        }

        let mut asm = FileAssembler::new();
        let mut completed = None;
        for &i in &order {
            if let Some(done) = asm.ingest(chunks[i].clone()).unwrap() {
                prop_assert!(completed.is_none(), "transfer completed twice");
                completed = Some(done);
            }
        }

        let done = completed.expect("transfer never completed");
        prop_assert_eq!(done.bytes, bytes);
        prop_assert_eq!(asm.in_flight(), 0);
    }

    #[test]
    fn decode_never_panics_on_random_bytes(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        // Err is fine; a panic would fail the test.
        let _ = codec::decode(&bytes);
    }
}

//! Property-based tests for part accumulation and upload

use std::io;

use bytes::Bytes;
use dqship_client::testing::MemoryStore;
use dqship_client::{CancellationToken, ChunkAccumulator, UploadOptions, Uploader};
use dqship_core::{parts_are_sequential, Destination};
use futures::stream;
use proptest::prelude::*;

fn cut(chunks: &[Vec<u8>], threshold: usize) -> Vec<dqship_client::Part> {
    let mut acc = ChunkAccumulator::new(threshold);
    let mut parts: Vec<_> = chunks.iter().filter_map(|c| acc.push(c)).collect();
    parts.extend(acc.finish());
    parts
}

proptest! {
    #[test]
    fn props_parts_concatenate_to_source(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..40),
        threshold in 1usize..200
    ) {
        let parts = cut(&chunks, threshold);

        let expected: Vec<u8> = chunks.concat();
        let rebuilt: Vec<u8> = parts.iter().flat_map(|p| p.body.iter().copied()).collect();
        prop_assert_eq!(rebuilt, expected);
    }

    #[test]
    fn props_part_numbers_have_no_gaps(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 0..40),
        threshold in 1usize..200
    ) {
        let parts = cut(&chunks, threshold);

        for (i, part) in parts.iter().enumerate() {
            prop_assert_eq!(part.number.get(), i as u32 + 1);
        }
    }

    #[test]
    fn props_only_the_last_part_may_be_small(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..40),
        threshold in 1usize..200
    ) {
        let parts = cut(&chunks, threshold);
        let (last, rest) = parts.split_last().unwrap();

        for part in rest {
            prop_assert!(part.len() > threshold);
        }
        prop_assert!(!last.is_empty());
    }

    #[test]
    fn props_retries_never_duplicate_parts(
        data in prop::collection::vec(any::<u8>(), 1..2000),
        chunk in 1usize..100,
        threshold in 1usize..300,
        failures in prop::collection::vec((1u32..10, 0u32..3), 0..5)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemoryStore::new();
            // Below the attempt cap, so every part eventually lands
            for (part, times) in &failures {
                store.fail_part(*part, *times);
            }

            let destination = Destination::parse("backups", "prop.tar.gz").unwrap();
            let uploader = Uploader::new(
                store,
                UploadOptions { chunk_threshold: threshold, ..UploadOptions::default() },
            );

            let chunks: Vec<io::Result<Bytes>> = data
                .chunks(chunk)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();

            let report = uploader
                .upload_stream(destination.clone(), stream::iter(chunks), &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(report.total_bytes, data.len() as u64);
            assert_eq!(uploader.store().object(&destination).unwrap(), data);
        });
    }
}

#[test]
fn recorded_parts_are_sequential_after_retries() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let store = MemoryStore::new();
        store.fail_part(1, 2);
        store.fail_part(3, 1);

        let destination = Destination::parse("backups", "seq.tar.gz").unwrap();
        let mut session = dqship_client::UploadSession::open(&store, destination)
            .await
            .unwrap();
        let mut driver = dqship_client::UploadDriver::new(
            &store,
            5,
            dqship_client::RetryPolicy::default(),
            CancellationToken::new(),
        );

        let chunks: Vec<io::Result<Bytes>> =
            (0..10).map(|i| Ok(Bytes::from(vec![i as u8; 4]))).collect();
        driver.run(&mut session, stream::iter(chunks)).await.unwrap();

        assert!(parts_are_sequential(session.parts()));
        assert_eq!(session.parts().len(), 5);
        assert_eq!(session.total_bytes(), 40);
    });
}

//! Parse-then-persist round trips through the SQLite store

mod helpers;

use helpers::{write_archive, CaseFileFixture, TestEnv};
use tmha_ingest::config::DEFAULT_RECORD_ELEMENT;
use tmha_ingest::{parse_archive, BatchSink, SqliteCaseStore};

fn varied_case_files() -> Vec<CaseFileFixture> {
    vec![
        CaseFileFixture::new(75_000_001)
            .with_registration(2_000_001, "19990301")
            .with_state("TX")
            .with_attorney("Attorney One")
            .with_mark("LONESTAR")
            .with_goods("030", "coffee")
            .with_goods("043", "cafe services"),
        CaseFileFixture::new(75_000_002).with_country("GB"),
        CaseFileFixture::new(75_000_003)
            .with_code("016")
            .with_code("")
            .with_goods("041", "education"),
        CaseFileFixture::new(75_000_004).with_statement("GS0251", "hats"),
    ]
}

#[tokio::test]
async fn test_saved_batch_reads_back_equal() {
    let env = TestEnv::new();
    let archive = write_archive(env.path(), "varied", &varied_case_files());
    let batch = parse_archive(&env.workspace, &archive, DEFAULT_RECORD_ELEMENT).unwrap();
    assert_eq!(batch.len(), 4);

    let store = SqliteCaseStore::open(&env.database_path()).await.unwrap();
    store.create_schema().await.unwrap();
    store.save_batch(batch.clone()).await.unwrap();

    let stored = store.get_all().await.unwrap();
    assert_eq!(stored, batch);
}

#[tokio::test]
async fn test_batches_accumulate_in_order() {
    let env = TestEnv::new();
    let archive = write_archive(env.path(), "varied", &varied_case_files());
    let batch = parse_archive(&env.workspace, &archive, DEFAULT_RECORD_ELEMENT).unwrap();

    let store = SqliteCaseStore::open(&env.database_path()).await.unwrap();
    store.create_schema().await.unwrap();
    for _ in 0..5 {
        store.save_batch(batch.clone()).await.unwrap();
    }

    let stored = store.get_all().await.unwrap();
    assert_eq!(stored.len(), 5 * batch.len());
    assert!(stored.chunks(batch.len()).all(|chunk| chunk == batch.as_slice()));
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let env = TestEnv::new();
    let archive = write_archive(env.path(), "varied", &varied_case_files());
    let batch = parse_archive(&env.workspace, &archive, DEFAULT_RECORD_ELEMENT).unwrap();

    {
        let store = SqliteCaseStore::open(&env.database_path()).await.unwrap();
        store.create_schema().await.unwrap();
        store.save_batch(batch.clone()).await.unwrap();
        store.close().await;
    }

    let reopened = SqliteCaseStore::open(&env.database_path()).await.unwrap();
    reopened.create_schema().await.unwrap();
    assert_eq!(reopened.get_all().await.unwrap(), batch);
}

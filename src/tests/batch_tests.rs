use crate::scraper::batch::{rows_for_append, BatchSink};
use crate::scraper::models::{ListingRecord, NOT_FOUND};
use crate::scraper::retry::RetryPolicy;
use crate::scraper::ScraperError;
use crate::tests::utils::{listing_url, MemoryStore};

fn priced(id: u32, price: &str, area: &str) -> ListingRecord {
    ListingRecord {
        price_amount: price.into(),
        area_amount: area.into(),
        ..ListingRecord::for_url(&listing_url(id))
    }
}

#[test]
fn formula_targets_the_row_each_record_lands_on() {
    let records = vec![
        priced(1, "85000", "45"),
        priced(2, NOT_FOUND, "60"),
        priced(3, "120000", "80"),
    ];

    let rows = rows_for_append(&records, 7);

    assert_eq!(rows[0][4], "=C8/D8");
    assert_eq!(rows[1][4], NOT_FOUND);
    assert_eq!(rows[2][4], "=C10/D10");
    assert!(rows.iter().all(|r| r.len() == 18));
    assert_eq!(rows[2][17], listing_url(3));
}

#[test]
fn zero_area_gets_no_formula() {
    let rows = rows_for_append(&[priced(1, "85000", "0")], 1);
    assert_eq!(rows[0][4], NOT_FOUND);
}

#[test]
fn flushes_when_full() {
    let store = MemoryStore::new();
    let mut sink = BatchSink::new(&store, 2, RetryPolicy::immediate(1));

    assert_eq!(sink.push(priced(1, "100", "10")).unwrap(), 0);
    assert_eq!(sink.pending(), 1);
    assert_eq!(sink.push(priced(2, "200", "20")).unwrap(), 2);
    assert_eq!(sink.pending(), 0);

    let rows = store.data_rows();
    // Header is row 1, so the first record lands on row 2.
    assert_eq!(rows[0][4], "=C2/D2");
    assert_eq!(rows[1][4], "=C3/D3");
}

#[test]
fn failed_flush_keeps_buffer_for_next_flush() {
    let store = MemoryStore::new();
    store.fail_appends.set(2);
    let mut sink = BatchSink::new(&store, 10, RetryPolicy::immediate(2));

    sink.push(priced(1, "100", "10")).unwrap();
    sink.push(priced(2, "200", "20")).unwrap();

    let err = sink.flush().unwrap_err();
    assert!(matches!(err, ScraperError::Persistence(_)));
    assert_eq!(sink.pending(), 2);
    assert_eq!(sink.persisted(), 0);
    assert!(store.data_rows().is_empty());

    sink.push(priced(3, "300", "30")).unwrap();
    assert_eq!(sink.flush().unwrap(), 3);
    assert_eq!(sink.pending(), 0);

    let rows = store.data_rows();
    let urls: Vec<_> = rows.iter().map(|r| r[17].clone()).collect();
    assert_eq!(urls, vec![listing_url(1), listing_url(2), listing_url(3)]);
    assert_eq!(rows[0][4], "=C2/D2");
    assert_eq!(rows[2][4], "=C4/D4");
}

#[test]
fn retry_recovers_transient_append_failure() {
    let store = MemoryStore::new();
    store.fail_appends.set(1);
    let mut sink = BatchSink::new(&store, 10, RetryPolicy::immediate(3));

    sink.push(priced(1, "100", "10")).unwrap();
    assert_eq!(sink.flush().unwrap(), 1);
    assert_eq!(sink.persisted(), 1);
}

fn urls_and_formulas(store: &MemoryStore) -> Vec<(String, String)> {
    store
        .data_rows()
        .into_iter()
        .map(|r| (r[17].clone(), r[4].clone()))
        .collect()
}

#[test]
fn append_applied_despite_error_is_not_written_twice() {
    let store = MemoryStore::new();
    store.short_write.set(Some(usize::MAX));
    let mut sink = BatchSink::new(&store, 10, RetryPolicy::immediate(3));

    sink.push(priced(1, "100", "10")).unwrap();
    sink.push(priced(2, "200", "20")).unwrap();
    assert_eq!(sink.flush().unwrap(), 2);

    assert_eq!(
        urls_and_formulas(&store),
        vec![
            (listing_url(1), "=C2/D2".to_string()),
            (listing_url(2), "=C3/D3".to_string()),
        ]
    );
}

#[test]
fn partial_append_resumes_with_the_missing_rows() {
    let store = MemoryStore::new();
    store.short_write.set(Some(1));
    let mut sink = BatchSink::new(&store, 10, RetryPolicy::immediate(3));

    for id in 1..=3 {
        sink.push(priced(id, "100", "10")).unwrap();
    }
    assert_eq!(sink.flush().unwrap(), 3);

    assert_eq!(
        urls_and_formulas(&store),
        vec![
            (listing_url(1), "=C2/D2".to_string()),
            (listing_url(2), "=C3/D3".to_string()),
            (listing_url(3), "=C4/D4".to_string()),
        ]
    );
}

#[test]
fn partial_append_is_resumed_by_the_next_flush() {
    let store = MemoryStore::new();
    store.short_write.set(Some(1));
    let mut sink = BatchSink::new(&store, 10, RetryPolicy::immediate(1));

    sink.push(priced(1, "100", "10")).unwrap();
    sink.push(priced(2, "200", "20")).unwrap();
    assert!(sink.flush().is_err());
    assert_eq!(sink.pending(), 2);

    sink.push(priced(3, "300", "30")).unwrap();
    assert_eq!(sink.flush().unwrap(), 3);

    assert_eq!(
        urls_and_formulas(&store),
        vec![
            (listing_url(1), "=C2/D2".to_string()),
            (listing_url(2), "=C3/D3".to_string()),
            (listing_url(3), "=C4/D4".to_string()),
        ]
    );
}

#[test]
fn huge_batch_size_does_not_preallocate() {
    let store = MemoryStore::new();
    let mut sink = BatchSink::new(&store, usize::MAX, RetryPolicy::immediate(1));
    sink.push(priced(1, "100", "10")).unwrap();
    assert_eq!(sink.flush().unwrap(), 1);
}

#[test]
fn empty_flush_is_a_no_op() {
    let store = MemoryStore::new();
    store.fail_appends.set(5);
    let mut sink = BatchSink::new(&store, 10, RetryPolicy::immediate(1));
    assert_eq!(sink.flush().unwrap(), 0);
}

#[test]
fn retry_gives_up_after_max_attempts() {
    let mut calls = 0;
    let result: Result<(), _> = RetryPolicy::immediate(3).run("always failing", || {
        calls += 1;
        Err(ScraperError::transport("https://example.test", format!("attempt {calls}")))
    });

    assert_eq!(calls, 3);
    match result {
        Err(ScraperError::Transport { reason, .. }) => assert_eq!(reason, "attempt 3"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn retry_does_not_repeat_non_retryable_errors() {
    let mut calls = 0;
    let result: Result<(), _> = RetryPolicy::immediate(5).run("config", || {
        calls += 1;
        Err(ScraperError::Config("bad".into()))
    });
    assert!(result.is_err());
    assert_eq!(calls, 1);
}

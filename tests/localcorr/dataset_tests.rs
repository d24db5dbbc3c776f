use localcorr::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn context(target: &str, partitions: usize) -> ExecutionContext {
    ExecutionContext::builder(target.parse().unwrap())
        .app_name("dataset-tests")
        .partitions(partitions)
        .open()
        .unwrap()
}

#[test]
fn test_connection_target_parsing() {
    assert_eq!(
        "local".parse::<ConnectionTarget>().unwrap(),
        ConnectionTarget::Local { threads: None }
    );
    assert_eq!(
        "local[*]".parse::<ConnectionTarget>().unwrap(),
        ConnectionTarget::Local { threads: None }
    );
    assert_eq!(
        "local[3]".parse::<ConnectionTarget>().unwrap(),
        ConnectionTarget::Local { threads: Some(3) }
    );
    assert_eq!(ConnectionTarget::Local { threads: Some(3) }.to_string(), "local[3]");

    for bad in ["local[0]", "local[x]", "spark://master:7077", "", "local[2"] {
        match bad.parse::<ConnectionTarget>() {
            Err(e @ LocalCorrError::UnsupportedTarget(_)) => assert!(e.is_configuration()),
            other => panic!("Expected UnsupportedTarget for {bad:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_context_lifecycle() {
    let ctx = context("local[2]", 3);
    assert!(ctx.is_open());
    assert_eq!(ctx.default_partitions(), 3);

    let data = ctx.parallelize((0..10).collect::<Vec<i32>>());
    assert_eq!(data.count().unwrap(), 10);

    ctx.close();
    assert!(!ctx.is_open());
    assert!(matches!(data.count(), Err(LocalCorrError::ContextClosed(_))));

    // Closing twice is harmless.
    ctx.close();
}

#[test]
fn test_zero_partitions_rejected() {
    let result = ExecutionContext::builder(ConnectionTarget::default())
        .partitions(0)
        .open();
    assert!(matches!(result, Err(LocalCorrError::InvalidPartitions(0))));
}

#[test]
fn test_map_and_flat_map_preserve_order() {
    let ctx = context("local[4]", 4);
    let data = ctx.parallelize((1..=20).collect::<Vec<u64>>());

    let squares = data.map(|v| v * v).collect().unwrap();
    assert_eq!(squares, (1..=20).map(|v| v * v).collect::<Vec<u64>>());

    let repeated = data.flat_map(|v| vec![*v; 2]).collect().unwrap();
    assert_eq!(repeated.len(), 40);
    assert_eq!(&repeated[..4], &[1, 1, 2, 2]);

    assert_eq!(data.first().unwrap(), Some(1));
    let empty = ctx.parallelize(Vec::<u64>::new());
    assert_eq!(empty.first().unwrap(), None);
}

#[test]
fn test_try_flat_map_propagates_errors() {
    let ctx = context("local[2]", 2);
    let data = ctx.parallelize(vec!["1", "2", "oops", "4"]);

    let parsed = data.try_flat_map(|s| {
        s.parse::<i32>()
            .map(Some)
            .map_err(|e| LocalCorrError::parse(s, e.to_string()))
    });
    assert!(matches!(parsed.collect(), Err(LocalCorrError::Parse { .. })));
}

#[test]
fn test_transformations_are_lazy() {
    let ctx = context("local[2]", 2);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let mapped = ctx.parallelize((0..8).collect::<Vec<i32>>()).map(move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        v + 1
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    mapped.count().unwrap();
    mapped.count().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 16);
}

#[test]
fn test_cache_and_materialize_stop_recomputation() {
    let ctx = context("local[2]", 2);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let cached = ctx
        .parallelize((0..8).collect::<Vec<i32>>())
        .map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v * 2
        })
        .cache();

    assert_eq!(cached.collect().unwrap().len(), 8);
    assert_eq!(cached.count().unwrap(), 8);
    assert_eq!(calls.load(Ordering::SeqCst), 8);

    let counter = Arc::clone(&calls);
    let barrier = ctx
        .parallelize((0..5).collect::<Vec<i32>>())
        .map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            *v
        })
        .materialize()
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 13);

    let downstream = barrier.map(|v| v + 100);
    assert_eq!(downstream.collect().unwrap(), vec![100, 101, 102, 103, 104]);
    assert_eq!(downstream.count().unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 13);
}

#[test]
fn test_reduce_by_key() {
    let ctx = context("local[4]", 4);
    let pairs: Vec<(u32, u64)> = (0..30u64).map(|v| ((v % 3) as u32, v)).collect();

    let mut sums = ctx
        .parallelize(pairs)
        .try_reduce_by_key(2, |acc, v| {
            *acc += *v;
            Ok(())
        })
        .collect()
        .unwrap();
    sums.sort();

    // 0 + 3 + ... + 27 = 135, then +10 and +20 for the other residues.
    assert_eq!(sums, vec![(0, 135), (1, 145), (2, 155)]);
}

#[test]
fn test_reduce_error_aborts() {
    let ctx = context("local[2]", 2);
    let data = ctx.parallelize(vec![(1, 1), (1, 2), (2, 3)]);

    let failing = data.try_reduce_by_key(2, |_acc: &mut i32, _v| {
        Err(LocalCorrError::ShapeMismatch {
            expected: 1,
            found: 2,
        })
    });
    assert!(matches!(
        failing.collect(),
        Err(LocalCorrError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_inner_join() {
    let ctx = context("local[3]", 3);
    let left = ctx.parallelize((0..5).map(|k| (k, format!("l{k}"))).collect::<Vec<_>>());
    let right = ctx.parallelize(vec![(3, 30), (4, 40), (4, 41), (7, 70)]);

    let mut joined = left.join(&right, 4).collect().unwrap();
    joined.sort();

    assert_eq!(
        joined,
        vec![
            (3, ("l3".to_string(), 30)),
            (4, ("l4".to_string(), 40)),
            (4, ("l4".to_string(), 41)),
        ]
    );
}

#[test]
fn test_shuffle_is_independent_of_worker_count() {
    let pairs: Vec<(i64, f64)> = (0..500)
        .map(|i| (i % 37, (i as f64 * 0.731).sin() * 1e3))
        .collect();

    let run = |target: &str| {
        let ctx = context(target, 4);
        ctx.parallelize(pairs.clone())
            .try_reduce_by_key(5, |acc, v| {
                *acc += *v;
                Ok(())
            })
            .collect()
            .unwrap()
    };

    let sequential = run("local[1]");
    let parallel = run("local[4]");
    assert_eq!(sequential.len(), 37);
    assert_eq!(sequential.len(), parallel.len());
    for ((ka, va), (kb, vb)) in sequential.iter().zip(&parallel) {
        assert_eq!(ka, kb);
        assert_eq!(va.to_bits(), vb.to_bits());
    }
}

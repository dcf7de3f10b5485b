use anyhow::{Result, anyhow};
use weather_summary::runner::{ExecMode, Runner};
use weather_summary::{Pipeline, from_vec};

fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
    v.sort();
    v
}

fn word_lengths(p: &Pipeline) -> weather_summary::PCollection<(usize, Vec<String>)> {
    let words: Vec<String> = "a bb cc ddd e ff ggg hhhh i jj"
        .split(' ')
        .map(str::to_string)
        .collect();
    from_vec(p, words)
        .key_by(|w: &String| w.len())
        .group_by_key()
        .map_values(|ws: &Vec<String>| {
            let mut ws = ws.clone();
            ws.sort();
            ws
        })
}

#[test]
fn sequential_and_parallel_agree() -> Result<()> {
    let seq = sorted(word_lengths(&Pipeline::default()).collect_seq()?);
    for parts in [1, 2, 3, 7, 64] {
        let par = sorted(word_lengths(&Pipeline::default()).collect_par(None, Some(parts))?);
        assert_eq!(seq, par, "partitions = {parts}");
    }
    assert_eq!(seq[0], (1, vec!["a".into(), "e".into(), "i".into()]));
    Ok(())
}

#[test]
fn stateless_chains_keep_source_order_in_parallel() -> Result<()> {
    let p = Pipeline::default();
    let out = from_vec(&p, (0..1000u32).collect::<Vec<_>>())
        .map(|x: &u32| x * 2)
        .filter(|x: &u32| x % 3 != 0)
        .collect_par(Some(3), Some(8))?;
    let expected: Vec<u32> = (0..1000u32).map(|x| x * 2).filter(|x| x % 3 != 0).collect();
    assert_eq!(out, expected);
    Ok(())
}

#[test]
fn explicit_runner_with_thread_pool() -> Result<()> {
    let p = Pipeline::default();
    let runner = Runner::new(ExecMode::Parallel {
        threads: Some(2),
        partitions: Some(5),
    });
    let out = from_vec(&p, (1..=100u64).collect::<Vec<_>>())
        .map(|x: &u64| x * x)
        .collect_with(&runner)?;
    assert_eq!(out.iter().sum::<u64>(), 338_350);
    Ok(())
}

#[test]
fn errors_in_any_partition_abort_the_run() {
    let p = Pipeline::default();
    let err = from_vec(&p, (0..100i32).collect::<Vec<_>>())
        .try_map(|x: &i32| {
            if *x == 73 {
                Err(anyhow!("bad element {x}"))
            } else {
                Ok(*x)
            }
        })
        .named("validate")
        .collect_par(None, Some(10))
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("step 'validate' failed"), "{msg}");
    assert!(msg.contains("bad element 73"), "{msg}");
}

#[test]
fn nothing_downstream_runs_after_a_failure() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let p = Pipeline::default();
    let result = from_vec(&p, vec![("k".to_string(), 1u8), ("k".to_string(), 2)])
        .try_map(|kv: &(String, u8)| {
            if kv.1 == 2 {
                Err(anyhow!("reject"))
            } else {
                Ok(kv.clone())
            }
        })
        .group_by_key()
        .map(move |kv: &(String, Vec<u8>)| {
            counter.fetch_add(1, Ordering::SeqCst);
            kv.1.len()
        })
        .collect_seq();

    assert!(result.is_err());
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[cfg(feature = "metrics")]
#[test]
fn runner_counts_output_elements() -> Result<()> {
    use weather_summary::metrics::MetricsCollector;

    let p = Pipeline::default();
    let metrics = MetricsCollector::new();
    p.set_metrics(metrics.clone());
    from_vec(&p, vec![1u8, 2, 3, 4])
        .filter(|x: &u8| x % 2 == 0)
        .collect_seq()?;
    assert_eq!(metrics.counter("runner.output_elements"), Some(2));
    assert!(p.take_metrics().is_some());
    assert!(p.metrics().is_none());
    Ok(())
}

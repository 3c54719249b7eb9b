// tests/independence.rs

mod common;
use crate::common::{TestResult, eventually, manual_engine, threaded_engine};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use depengine::{Completion, Context, Property};

#[test]
fn held_write_on_one_variable_does_not_block_another() -> TestResult {
    let (engine, exec) = manual_engine();
    let a = engine.new_variable()?;
    let b = engine.new_variable()?;
    let held: Arc<Mutex<Option<Completion>>> = Arc::new(Mutex::new(None));

    {
        let held = Arc::clone(&held);
        engine.push_async(
            move |_, done| *held.lock().unwrap() = Some(done),
            Context::cpu(),
            &[],
            &[a],
            Property::Normal,
        )?;
    }
    exec.run_all();

    let b_ran = Arc::new(AtomicBool::new(false));
    {
        let b_ran = Arc::clone(&b_ran);
        engine.push_sync(
            move |_| b_ran.store(true, Ordering::SeqCst),
            Context::cpu(),
            &[],
            &[b],
            Property::Normal,
        )?;
    }
    engine.push_sync(|_| {}, Context::cpu(), &[a], &[], Property::Normal)?;

    assert_eq!(exec.parked(), 1, "only the work on b is runnable");
    exec.run_next();
    assert!(b_ran.load(Ordering::SeqCst));
    assert!(engine.var_stats(b)?.is_idle());
    assert_eq!(engine.var_stats(a)?.queued, 1);

    held.lock().unwrap().take().expect("write on a ran").signal();
    assert_eq!(exec.run_all(), 1);
    Ok(())
}

#[test]
fn work_without_variables_runs_immediately() -> TestResult {
    let (engine, exec) = manual_engine();
    engine.push_sync(|_| {}, Context::cpu(), &[], &[], Property::Normal)?;
    assert_eq!(exec.parked(), 1);
    exec.run_all();
    assert_eq!(engine.pending(), 0);
    Ok(())
}

#[test]
fn disjoint_work_overlaps_on_the_threaded_executor() -> TestResult {
    let engine = threaded_engine();
    let a = engine.new_variable()?;
    let b = engine.new_variable()?;
    let (tx, rx) = mpsc::channel::<()>();

    // The write on `a` only finishes once the write on `b` has run, which
    // is only possible if the two are not serialised.
    engine.push_sync(
        move |_| {
            rx.recv_timeout(Duration::from_secs(5))
                .expect("write on b never ran");
        },
        Context::cpu(),
        &[],
        &[a],
        Property::Normal,
    )?;
    let b_done = Arc::new(AtomicBool::new(false));
    {
        let b_done = Arc::clone(&b_done);
        engine.push_sync(
            move |_| {
                b_done.store(true, Ordering::SeqCst);
                let _ = tx.send(());
            },
            Context::cpu(),
            &[],
            &[b],
            Property::Normal,
        )?;
    }

    assert!(eventually(Duration::from_secs(5), || b_done
        .load(Ordering::SeqCst)));
    engine.wait_for_all()?;
    Ok(())
}

#[test]
fn copy_work_runs_on_the_copy_lane() -> TestResult {
    let engine = threaded_engine();
    let v = engine.new_variable()?;
    let seen = Arc::new(Mutex::new(Vec::new()));

    for prop in [Property::Normal, Property::CopyToDevice, Property::Async] {
        let seen = Arc::clone(&seen);
        engine.push_sync(
            move |run| seen.lock().unwrap().push((prop, run.lane)),
            Context::gpu(0),
            &[v],
            &[],
            prop,
        )?;
    }
    engine.wait_for_var(v)?;

    let mut seen = seen.lock().unwrap().clone();
    seen.sort_by_key(|(prop, _)| format!("{prop:?}"));
    assert_eq!(
        seen,
        vec![
            (Property::Async, depengine::Lane::Inline),
            (Property::CopyToDevice, depengine::Lane::Copy),
            (Property::Normal, depengine::Lane::Compute),
        ]
    );
    Ok(())
}

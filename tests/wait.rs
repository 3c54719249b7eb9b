// tests/wait.rs

mod common;
use crate::common::{TestResult, eventually, manual_engine, threaded_engine};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use depengine::{Completion, Context, Engine, EngineError, Property};

#[test]
fn wait_for_var_covers_everything_pushed_before_it() -> TestResult {
    let engine = threaded_engine();
    let v = engine.new_variable()?;
    let done = Arc::new(AtomicUsize::new(0));

    for i in 0..64 {
        let done = Arc::clone(&done);
        let (reads, writes) = if i % 4 == 0 { (vec![], vec![v]) } else { (vec![v], vec![]) };
        engine.push_sync(
            move |_| {
                thread::sleep(Duration::from_micros(100));
                done.fetch_add(1, Ordering::SeqCst);
            },
            Context::cpu(),
            &reads,
            &writes,
            Property::Normal,
        )?;
    }

    engine.wait_for_var(v)?;
    assert_eq!(done.load(Ordering::SeqCst), 64);
    assert!(engine.var_stats(v)?.is_idle());
    Ok(())
}

#[test]
fn wait_for_var_on_an_idle_variable_returns_immediately() -> TestResult {
    let engine = threaded_engine();
    let v = engine.new_variable()?;
    engine.wait_for_var(v)?;
    engine.wait_for_var(v)?;
    Ok(())
}

#[test]
fn wait_for_all_reaches_quiescence_and_engine_stays_usable() -> TestResult {
    let engine = threaded_engine();
    let vars = (0..8)
        .map(|_| engine.new_variable())
        .collect::<Result<Vec<_>, _>>()?;
    let done = Arc::new(AtomicUsize::new(0));

    for (i, v) in vars.iter().enumerate().cycle().take(200) {
        let done = Arc::clone(&done);
        let writes = if i % 2 == 0 { vec![*v] } else { vec![] };
        engine.push_sync(
            move |_| {
                done.fetch_add(1, Ordering::SeqCst);
            },
            Context::cpu(),
            &[],
            &writes,
            Property::Normal,
        )?;
    }

    engine.wait_for_all()?;
    assert_eq!(done.load(Ordering::SeqCst), 200);
    assert_eq!(engine.pending(), 0);
    for v in &vars {
        assert!(engine.var_stats(*v)?.is_idle());
    }

    let late = Arc::new(AtomicBool::new(false));
    {
        let late = Arc::clone(&late);
        engine.push_sync(
            move |_| late.store(true, Ordering::SeqCst),
            Context::cpu(),
            &[vars[0]],
            &[],
            Property::Normal,
        )?;
    }
    engine.wait_for_all()?;
    assert!(late.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn held_completion_blocks_waiters_until_signalled() -> TestResult {
    let engine = Arc::new(threaded_engine());
    let v = engine.new_variable()?;
    let held: Arc<Mutex<Option<Completion>>> = Arc::new(Mutex::new(None));

    {
        let held = Arc::clone(&held);
        engine.push_async(
            move |_, done| *held.lock().unwrap() = Some(done),
            Context::cpu(),
            &[],
            &[v],
            Property::Normal,
        )?;
    }
    assert!(eventually(Duration::from_secs(5), || held
        .lock()
        .unwrap()
        .is_some()));

    let returned = Arc::new(AtomicBool::new(false));
    let waiter = {
        let engine = Arc::clone(&engine);
        let returned = Arc::clone(&returned);
        thread::spawn(move || {
            engine.wait_for_var(v).expect("wait_for_var");
            returned.store(true, Ordering::SeqCst);
        })
    };

    // Still held: the waiter must not get through.
    assert!(!eventually(Duration::from_millis(100), || returned
        .load(Ordering::SeqCst)));

    held.lock().unwrap().take().expect("completion").signal();
    assert!(eventually(Duration::from_secs(5), || returned
        .load(Ordering::SeqCst)));
    waiter.join().expect("waiter thread");
    Ok(())
}

#[test]
fn later_pushes_are_not_waited_for() -> TestResult {
    let (engine, exec) = manual_engine();
    let v = engine.new_variable()?;

    engine.push_sync(|_| {}, Context::cpu(), &[], &[v], Property::Normal)?;
    exec.run_all();

    // Nothing outstanding: the wait's barrier resolves at push time even
    // though a later push is parked behind it.
    engine.wait_for_var(v)?;
    engine.push_sync(|_| {}, Context::cpu(), &[v], &[], Property::Normal)?;
    assert_eq!(exec.parked(), 1);
    exec.run_all();
    Ok(())
}

#[test]
fn blocking_waits_are_refused_inside_work_functions() -> TestResult {
    let engine = Arc::new(Engine::naive());
    let v = engine.new_variable()?;
    let outcomes = Arc::new(Mutex::new(Vec::new()));

    {
        let inner = Arc::clone(&engine);
        let outcomes = Arc::clone(&outcomes);
        engine.push_sync(
            move |_| {
                let mut outcomes = outcomes.lock().unwrap();
                outcomes.push(inner.wait_for_var(v));
                outcomes.push(inner.wait_for_all());
            },
            Context::cpu(),
            &[v],
            &[],
            Property::Normal,
        )?;
    }

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 2);
    for outcome in outcomes.iter() {
        assert!(matches!(outcome, Err(EngineError::WaitFromWorker)));
    }
    Ok(())
}

#[tokio::test]
async fn async_wait_for_var_resolves_after_earlier_work() -> TestResult {
    let engine = threaded_engine();
    let v = engine.new_variable()?;
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        engine.push_sync(
            move |_| {
                thread::sleep(Duration::from_millis(1));
                counter.fetch_add(1, Ordering::SeqCst);
            },
            Context::cpu(),
            &[],
            &[v],
            Property::Normal,
        )?;
    }

    engine.wait_for_var_async(v).await?;
    assert_eq!(counter.load(Ordering::SeqCst), 10);
    Ok(())
}

//! Ordered parallel map: bounded producer, `N` worker threads, reorder buffer.
//!
//! Mirrors the producer/worker/`crossbeam_channel` shape used by the pack's
//! indexing pipelines, but keeps a strict job-index reorder buffer so output
//! order always equals input order (the `sorted` mode). An `unsorted` mode
//! skips the reorder buffer and releases results as workers finish them.

use std::collections::BTreeMap;
use std::thread;

use crossbeam_channel::{bounded, Sender};

/// One item flowing out of the map: either `f`'s successful output, or the
/// error it raised, tagged with the job index it belongs to.
enum Outcome<T, E> {
    Ok(usize, T),
    Err(usize, E),
}

/// Run `f` over `input` using `workers` threads, calling `on_result` with
/// each output in order (sorted) or as workers finish (unsorted).
///
/// In sorted mode, an error at job `j` is surfaced only once every job before
/// it has been delivered to `on_result`; later jobs are still computed (the
/// workers don't know to stop) but their results are never delivered once the
/// error has fired, matching "propagated... aborts the run".
pub fn ordered_parallel_map<I, T, E, F>(
    input: I,
    workers: usize,
    sorted: bool,
    f: F,
    mut on_result: impl FnMut(T) -> Result<(), E>,
) -> Result<(), E>
where
    I: IntoIterator,
    I::Item: Send,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(I::Item) -> Result<T, E> + Send + Sync,
{
    let workers = workers.max(1);
    let (job_tx, job_rx) = bounded::<(usize, I::Item)>(workers);
    let (result_tx, result_rx) = bounded::<Outcome<T, E>>(workers);

    let result = thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx: Sender<Outcome<T, E>> = result_tx.clone();
            let f = &f;
            scope.spawn(move || {
                for (idx, item) in job_rx.iter() {
                    let outcome = match f(item) {
                        Ok(v) => Outcome::Ok(idx, v),
                        Err(e) => Outcome::Err(idx, e),
                    };
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        scope.spawn(move || {
            for (idx, item) in input.into_iter().enumerate() {
                if job_tx.send((idx, item)).is_err() {
                    break;
                }
            }
        });

        if sorted {
            drain_sorted(result_rx, &mut on_result)
        } else {
            drain_unsorted(result_rx, &mut on_result)
        }
    });

    result
}

fn drain_sorted<T, E>(
    result_rx: crossbeam_channel::Receiver<Outcome<T, E>>,
    on_result: &mut impl FnMut(T) -> Result<(), E>,
) -> Result<(), E> {
    let mut pending: BTreeMap<usize, Outcome<T, E>> = BTreeMap::new();
    let mut next = 0usize;
    let mut deferred_err: Option<E> = None;

    for outcome in result_rx.iter() {
        let idx = match &outcome {
            Outcome::Ok(i, _) => *i,
            Outcome::Err(i, _) => *i,
        };
        pending.insert(idx, outcome);

        while let Some(outcome) = pending.remove(&next) {
            next += 1;
            match outcome {
                Outcome::Ok(_, v) => {
                    if let Err(e) = on_result(v) {
                        deferred_err = Some(e);
                    }
                }
                Outcome::Err(_, e) => {
                    deferred_err = Some(e);
                }
            }
            if deferred_err.is_some() {
                break;
            }
        }
        if deferred_err.is_some() {
            break;
        }
    }

    match deferred_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn drain_unsorted<T, E>(
    result_rx: crossbeam_channel::Receiver<Outcome<T, E>>,
    on_result: &mut impl FnMut(T) -> Result<(), E>,
) -> Result<(), E> {
    for outcome in result_rx.iter() {
        match outcome {
            Outcome::Ok(_, v) => on_result(v)?,
            Outcome::Err(_, e) => return Err(e),
        }
    }
    Ok(())
}

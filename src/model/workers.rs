//! Scatter/gather evaluation of the training objective.
//!
//! Oligos are dealt round-robin to a fixed set of worker threads, each of
//! which loads its shard once. Every evaluation broadcasts θ to all workers
//! and blocks until each has replied with its partial sums on its own
//! reply channel.

use super::data::OligoData;
use super::objective::Objective;
use crate::utils::Result;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct WorkerPool {
    senders: Vec<Sender<Arc<Vec<f64>>>>,
    replies: Vec<Receiver<Objective>>,
    handles: Vec<JoinHandle<()>>,
    dims: usize,
    oligos: usize,
}

/// Splits `ids` into `n` shards, assigning ids round-robin.
pub fn round_robin<T: Clone>(ids: &[T], n: usize) -> Vec<Vec<T>> {
    let n = n.max(1);
    (0..n)
        .map(|shard| ids.iter().skip(shard).step_by(n).cloned().collect())
        .collect()
}

impl WorkerPool {
    /// Starts up to `num_workers` threads; `load` runs on the worker that owns
    /// an oligo. Fails if any oligo cannot be loaded.
    pub fn start<L>(oligo_ids: &[String], num_workers: usize, dims: usize, load: L) -> Result<Self>
    where
        L: Fn(&str) -> Result<OligoData> + Send + Sync + 'static,
    {
        let load = Arc::new(load);
        let shards = round_robin(oligo_ids, num_workers.min(oligo_ids.len()));
        let (ready_tx, ready_rx) = unbounded::<Result<usize>>();
        let mut pool = WorkerPool {
            senders: Vec::with_capacity(shards.len()),
            replies: Vec::with_capacity(shards.len()),
            handles: Vec::with_capacity(shards.len()),
            dims,
            oligos: 0,
        };

        for (index, shard) in shards.into_iter().enumerate() {
            let (theta_tx, theta_rx) = bounded::<Arc<Vec<f64>>>(1);
            let (reply_tx, reply_rx) = bounded::<Objective>(1);
            let (ready_tx, load) = (ready_tx.clone(), load.clone());
            let handle = thread::Builder::new()
                .name(format!("selftarget-worker-{}", index))
                .spawn(move || {
                    let data = match shard.iter().map(|id| load(id)).collect::<Result<Vec<_>>>() {
                        Ok(data) => data,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    if ready_tx.send(Ok(data.len())).is_err() {
                        return;
                    }
                    drop(ready_tx);
                    for theta in theta_rx {
                        let mut partial = Objective::zero(dims);
                        for oligo in &data {
                            partial.accumulate(&theta, oligo);
                        }
                        if reply_tx.send(partial).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| format!("Failed to spawn worker thread: {}", e))?;
            pool.senders.push(theta_tx);
            pool.replies.push(reply_rx);
            pool.handles.push(handle);
        }
        drop(ready_tx);

        for _ in 0..pool.handles.len() {
            match ready_rx.recv() {
                Ok(loaded) => pool.oligos += loaded?,
                Err(_) => return Err("Worker exited before loading its oligos".into()),
            }
        }
        log::debug!(
            "Started {} workers holding {} oligos",
            pool.handles.len(),
            pool.oligos
        );
        Ok(pool)
    }

    pub fn num_workers(&self) -> usize {
        self.handles.len()
    }

    pub fn num_oligos(&self) -> usize {
        self.oligos
    }

    /// Averaged, regularized objective over every oligo held by the pool.
    pub fn evaluate(&self, theta: &[f64], penalties: &[f64]) -> Result<Objective> {
        let shared = Arc::new(theta.to_vec());
        for sender in &self.senders {
            sender
                .send(shared.clone())
                .map_err(|_| "Worker thread is no longer running")?;
        }
        let mut total = Objective::zero(self.dims);
        for replies in &self.replies {
            let partial = replies
                .recv()
                .map_err(|_| "Worker thread exited without replying")?;
            total.merge(partial);
        }
        Ok(total.finalize(theta, penalties))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.senders.clear();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
    }
}

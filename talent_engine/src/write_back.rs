//! Asynchronous persistence of freshly computed match scores.
//!
//! Rankings hand their new scores to a [`WriteBackQueue`] and return immediately. A single worker task drains the
//! queue and merges each batch into the job's cache through [`MatchScoreCache::merge_write_back`]. Storage failures
//! are logged and dropped: the scores are recomputed on a later ranking.
//!
//! The worker exits once every queue handle has been dropped and the remaining batches are applied, so awaiting its
//! `JoinHandle` is a clean shutdown. [`WriteBackQueue::flush`] waits for everything queued so far.
use std::{collections::HashMap, fmt::Debug};

use log::*;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    api::MatchScoreCache,
    db_types::{JobId, UserId},
    traits::JobManagement,
};

enum WriteBackMessage {
    Write { job_id: JobId, scores: HashMap<UserId, f64> },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct WriteBackQueue {
    sender: mpsc::Sender<WriteBackMessage>,
}

impl Debug for WriteBackQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WriteBackQueue ({} free slots)", self.sender.capacity())
    }
}

impl WriteBackQueue {
    /// Queues a batch of scores without waiting. Returns false if the batch was dropped because the queue is full or
    /// the worker has stopped.
    pub fn schedule(&self, job_id: JobId, scores: HashMap<UserId, f64>) -> bool {
        if scores.is_empty() {
            return true;
        }
        let count = scores.len();
        match self.sender.try_send(WriteBackMessage::Write { job_id, scores }) {
            Ok(()) => {
                trace!("💾 {count} scores for job #{job_id} queued for write-back");
                true
            },
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("💾 Write-back queue is full. Dropping {count} scores for job #{job_id}");
                false
            },
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("💾 Write-back worker has stopped. Dropping {count} scores for job #{job_id}");
                false
            },
        }
    }

    /// Waits until every batch queued before this call has been applied. Returns false if the worker has stopped.
    pub async fn flush(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(WriteBackMessage::Flush(tx)).await.is_err() {
            return false;
        }
        rx.await.is_ok()
    }
}

/// Spawns the write-back worker on the current runtime.
pub fn start_write_back_worker<B>(cache: MatchScoreCache<B>, capacity: usize) -> (WriteBackQueue, JoinHandle<()>)
where B: JobManagement + 'static {
    let (sender, mut receiver) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        debug!("💾 Write-back worker started");
        while let Some(message) = receiver.recv().await {
            match message {
                WriteBackMessage::Write { job_id, scores } => {
                    if let Err(e) = cache.merge_write_back(job_id, &scores).await {
                        warn!("💾 Could not write back {} scores for job #{job_id}. {e}", scores.len());
                    }
                },
                WriteBackMessage::Flush(done) => {
                    let _ = done.send(());
                },
            }
        }
        debug!("💾 Write-back worker stopped");
    });
    (WriteBackQueue { sender }, handle)
}

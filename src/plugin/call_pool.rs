// Tue Jan 13 2026 - Alex

use parking_lot::Mutex;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Reusable threads for plugin calls that run under a timeout.
///
/// Each submitted call is matched with a worker of its own: an idle one when
/// available, otherwise a freshly spawned thread, so a call never queues behind
/// another. A worker stuck in a call that timed out rejoins the idle set once
/// the call returns.
pub struct CallPool {
    name: String,
    sender: Mutex<Sender<Job>>,
    receiver: Arc<Mutex<Receiver<Job>>>,
    idle: Arc<AtomicUsize>,
    spawned: AtomicUsize,
}

impl CallPool {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            name: name.into(),
            sender: Mutex::new(sender),
            receiver: Arc::new(Mutex::new(receiver)),
            idle: Arc::new(AtomicUsize::new(0)),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Threads started over the pool's lifetime.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn idle(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }

    /// Runs `call` on a worker. The returned channel yields the result, or the
    /// panic payload if the call panicked.
    pub fn submit<T, F>(&self, call: F) -> io::Result<Receiver<thread::Result<T>>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let idle = self.idle.clone();
        // The worker is idle again before the caller sees the result.
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(call));
            idle.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(outcome);
        });

        let reserved = self
            .idle
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !reserved {
            self.spawn_worker()?;
        }

        self.sender
            .lock()
            .send(job)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "call pool has no workers"))?;
        Ok(rx)
    }

    fn spawn_worker(&self) -> io::Result<()> {
        let id = self.spawned.fetch_add(1, Ordering::SeqCst);
        let receiver = self.receiver.clone();

        thread::Builder::new()
            .name(format!("{}-{}", self.name, id))
            .spawn(move || loop {
                let job = receiver.lock().recv();
                match job {
                    Ok(job) => job(),
                    Err(_) => break,
                }
            })?;

        log::trace!("Started {}-{}", self.name, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sequential_calls_reuse_one_thread() {
        let pool = CallPool::new("test");
        for i in 0..10 {
            let rx = pool.submit(move || i * 2).unwrap();
            assert_eq!(rx.recv().unwrap().unwrap(), i * 2);
        }
        assert_eq!(pool.spawned(), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_busy_worker_does_not_delay_other_calls() {
        let pool = CallPool::new("test");
        let (release, blocked) = mpsc::channel::<()>();
        let slow = pool.submit(move || blocked.recv().is_ok()).unwrap();

        let fast = pool.submit(|| "done").unwrap();
        assert_eq!(fast.recv_timeout(Duration::from_secs(5)).unwrap().unwrap(), "done");
        assert_eq!(pool.spawned(), 2);

        release.send(()).unwrap();
        assert!(slow.recv().unwrap().unwrap());
    }

    #[test]
    fn test_panics_come_back_as_payloads() {
        let pool = CallPool::new("test");
        let rx = pool.submit(|| -> u32 { panic!("worker bug") }).unwrap();
        assert!(rx.recv().unwrap().is_err());

        let rx = pool.submit(|| 7).unwrap();
        assert_eq!(rx.recv().unwrap().unwrap(), 7);
        assert_eq!(pool.spawned(), 1);
    }
}

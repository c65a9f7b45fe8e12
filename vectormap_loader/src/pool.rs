//! Bounded worker pool executing load jobs.

use crate::loader::{LoadJob, LoaderShared, run_job};
use log::debug;
use parking_lot::Mutex;
use std::{
	sync::{Arc, mpsc},
	thread,
};

pub(crate) struct WorkerPool {
	sender: Option<mpsc::Sender<LoadJob>>,
	workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
	/// Spawns `count` OS threads sharing one job queue.
	pub fn spawn(count: usize, shared: &Arc<LoaderShared>) -> WorkerPool {
		let (sender, receiver) = mpsc::channel::<LoadJob>();
		let receiver = Arc::new(Mutex::new(receiver));

		let workers = (0..count.max(1))
			.map(|index| {
				let receiver = Arc::clone(&receiver);
				let shared = Arc::clone(shared);
				thread::Builder::new()
					.name(format!("tile-worker-{index}"))
					.spawn(move || {
						loop {
							// the lock is held only while waiting for the next job
							let job = receiver.lock().recv();
							match job {
								Ok(job) => run_job(&shared, &job),
								Err(_) => break, // queue closed
							}
						}
						debug!("tile worker {index} stopped");
					})
					.expect("failed to spawn tile worker")
			})
			.collect();

		WorkerPool {
			sender: Some(sender),
			workers,
		}
	}

	pub fn enqueue(&self, job: LoadJob) {
		if let Some(sender) = &self.sender {
			// send only fails when the pool is already shut down
			sender.send(job).ok();
		}
	}
}

impl Drop for WorkerPool {
	fn drop(&mut self) {
		// closing the channel lets workers drain remaining jobs and exit
		self.sender.take();
		for worker in self.workers.drain(..) {
			worker.join().ok();
		}
	}
}

use std::future::pending;

use tokio::sync::watch;
use tracing::info;

/// Sending half: flips the run into cancellation
#[derive(Debug)]
pub struct ShutdownTrigger {
	tx: watch::Sender<bool>,
}

/// Receiving half, checked by the scheduler between queries and raced
/// against every wait.
#[derive(Debug, Clone)]
pub struct Shutdown {
	rx: watch::Receiver<bool>,
}

/// Create a linked trigger/receiver pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
	let (tx, rx) = watch::channel(false);
	(ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
	pub fn trigger(&self) {
		// No receivers left means the run already ended
		let _ = self.tx.send(true);
	}
}

impl Shutdown {
	pub fn is_triggered(&self) -> bool {
		*self.rx.borrow()
	}

	/// Resolve once cancellation has been requested.
	///
	/// If the trigger is dropped without firing this never resolves.
	pub async fn triggered(&mut self) {
		loop {
			if *self.rx.borrow_and_update() {
				return;
			}
			if self.rx.changed().await.is_err() {
				pending::<()>().await;
			}
		}
	}
}

/// Fire the trigger on SIGTERM or SIGINT (Ctrl+C on non-Unix targets).
///
/// Handlers are registered before this returns, so a signal arriving right
/// after startup is not lost.
pub fn listen_for_signals(trigger: ShutdownTrigger) -> std::io::Result<()> {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{signal, SignalKind};

		let mut sigterm = signal(SignalKind::terminate())?;
		let mut sigint = signal(SignalKind::interrupt())?;
		tokio::spawn(async move {
			tokio::select! {
				_ = sigterm.recv() => info!("received SIGTERM, draining"),
				_ = sigint.recv() => info!("received SIGINT, draining"),
			}
			trigger.trigger();
		});
	}

	#[cfg(not(unix))]
	{
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				info!("received Ctrl+C, draining");
				trigger.trigger();
			}
		});
	}

	Ok(())
}

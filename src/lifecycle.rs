use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

/// Process-id file used by external controllers to find this instance.
///
/// Written at start; removed by `release` when the run drains, or on drop
/// if the run unwinds before that.
#[derive(Debug)]
pub struct PidFile {
	path: PathBuf,
	released: bool,
}

impl PidFile {
	pub fn create(path: &Path) -> Result<Self> {
		std::fs::write(path, format!("{}\n", std::process::id()))
			.map_err(|e| anyhow!("failed to write pid file '{}': {}", path.display(), e))?;
		debug!(path = %path.display(), "wrote lifecycle marker");
		Ok(PidFile { path: path.to_path_buf(), released: false })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Remove the marker file.
	pub fn release(mut self) -> Result<()> {
		self.released = true;
		remove(&self.path)
	}
}

fn remove(path: &Path) -> Result<()> {
	match std::fs::remove_file(path) {
		Ok(()) => {
			debug!(path = %path.display(), "removed lifecycle marker");
			Ok(())
		}
		// Already gone: a controller may have cleaned it up
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
		Err(e) => Err(anyhow!("failed to remove pid file '{}': {}", path.display(), e)),
	}
}

impl Drop for PidFile {
	fn drop(&mut self) {
		if !self.released {
			if let Err(e) = remove(&self.path) {
				warn!("{}", e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_create_writes_pid() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("sim.pid");
		let marker = PidFile::create(&path).unwrap();
		let content = std::fs::read_to_string(marker.path()).unwrap();
		assert_eq!(content.trim(), std::process::id().to_string());
		marker.release().unwrap();
		assert!(!path.exists());
	}

	#[test]
	fn test_drop_removes_marker() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("sim.pid");
		{
			let _marker = PidFile::create(&path).unwrap();
			assert!(path.exists());
		}
		assert!(!path.exists());
	}

	#[test]
	fn test_release_tolerates_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("sim.pid");
		let marker = PidFile::create(&path).unwrap();
		std::fs::remove_file(&path).unwrap();
		assert!(marker.release().is_ok());
	}

	#[test]
	fn test_create_fails_in_missing_dir() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing").join("sim.pid");
		assert!(PidFile::create(&path).is_err());
	}
}

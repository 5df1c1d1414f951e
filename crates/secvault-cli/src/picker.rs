//! The CLI's notion of a user-gesture file picker.
//!
//! A desktop build would pop a dialog here; on the command line the
//! gesture is the user passing `--file`. No `--file` means the
//! gesture was dismissed, which the engine treats as a cancellation,
//! never an error.

use std::io;
use std::path::PathBuf;

use secvault_core::HandlePicker;

pub struct CliPicker {
    file: Option<PathBuf>,
}

impl CliPicker {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }
}

impl HandlePicker for CliPicker {
    fn pick_existing(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(self.file.clone())
    }

    fn pick_save_target(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(self.file.clone())
    }
}

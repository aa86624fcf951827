//! LUKS container setup for the physical-volume partition.

use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use crate::utils::prompt::Prompt;
use tracing::info;

/// Mapper name for the encrypted PV container.
pub const LUKS_NAME: &str = "root_crypt";

/// Format a LUKS container on `device`, open it, and return the mapped
/// device path (`/dev/mapper/root_crypt`) for LVM to use.
///
/// The passphrase is collected with double-entry confirmation, fed to both
/// cryptsetup invocations on stdin, and dropped immediately afterwards.
/// This runs after the partition table has already been rewritten, so
/// backing out at the passphrase prompt cannot pretend the disk is
/// untouched; it is reported as a hard error instead of a clean abort.
pub fn format_and_open(
    cmd: &CommandRunner,
    prompt: &mut dyn Prompt,
    device: &str,
) -> Result<String> {
    let passphrase = match prompt.ask_password("Encryption passphrase") {
        Ok(passphrase) => passphrase,
        Err(VolstrapError::UserCancelled) => {
            return Err(VolstrapError::EncryptionError(format!(
                "passphrase entry cancelled, but {} is already partitioned",
                device
            )));
        }
        Err(e) => return Err(e),
    };

    info!("formatting luks container on {}", device);
    cmd.run_with_input(
        "cryptsetup",
        &["luksFormat", "--hash=sha512", "--key-size=512", device],
        &passphrase,
    )
    .map_err(|e| VolstrapError::EncryptionError(format!("luksFormat failed: {}", e)))?;

    info!("opening luks container {} on {}", LUKS_NAME, device);
    cmd.run_with_input("cryptsetup", &["open", device, LUKS_NAME], &passphrase)
        .map_err(|e| VolstrapError::EncryptionError(format!("cryptsetup open failed: {}", e)))?;

    // Single use only; the passphrase does not outlive this function.
    drop(passphrase);

    Ok(format!("/dev/mapper/{}", LUKS_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::prompt::ScriptedPrompt;

    /// Prompt that backs out of every question, like Esc at the console.
    struct BackingOutPrompt;

    impl Prompt for BackingOutPrompt {
        fn ask_yes_no(&mut self, _: &str) -> Result<bool> {
            Err(VolstrapError::UserCancelled)
        }
        fn ask_text(&mut self, _: &str) -> Result<String> {
            Err(VolstrapError::UserCancelled)
        }
        fn ask_choice(&mut self, _: &str, _: &[&str]) -> Result<usize> {
            Err(VolstrapError::UserCancelled)
        }
        fn ask_password(&mut self, _: &str) -> Result<String> {
            Err(VolstrapError::UserCancelled)
        }
    }

    #[test]
    fn cancelled_passphrase_is_a_hard_error_not_a_clean_abort() {
        let cmd = CommandRunner::new(true);
        let mut prompt = BackingOutPrompt;

        match format_and_open(&cmd, &mut prompt, "/dev/sda3") {
            Err(VolstrapError::EncryptionError(msg)) => {
                assert!(msg.contains("already partitioned"), "message was: {}", msg)
            }
            Err(other) => panic!("expected EncryptionError, got {:?}", other),
            Ok(_) => panic!("cancellation must not succeed"),
        }
    }

    #[test]
    fn open_container_maps_under_dev_mapper() {
        let cmd = CommandRunner::new(true);
        let mut prompt = ScriptedPrompt::new();
        prompt.push_password("hunter2");

        let mapped = format_and_open(&cmd, &mut prompt, "/dev/sda3").unwrap();
        assert_eq!(mapped, "/dev/mapper/root_crypt");
    }
}

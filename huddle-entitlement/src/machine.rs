//! Machine fingerprinting for trial and license binding.
//!
//! Combines identifiers that survive reboots but change when the machine
//! changes hands: OS, architecture, hostname, and the platform machine id
//! where one exists.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};
use std::env;

/// Returns a stable fingerprint for the current machine.
#[must_use]
pub fn machine_fingerprint() -> String {
    let mut parts = vec![
        env::consts::OS.to_string(),
        env::consts::ARCH.to_string(),
        get_hostname(),
    ];
    if let Some(machine_id) = get_machine_id() {
        parts.push(machine_id);
    }

    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(&hash[..16])
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Platform machine id, where the OS exposes one.
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

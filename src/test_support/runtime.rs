use anyhow::{bail, Result};
use std::{
    env,
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

const SOCKET_WAIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Make sure testcontainers can reach a Docker-compatible API.
///
/// Honors `DOCKER_HOST`, then the Docker socket, then a Podman socket (which
/// is exported as `DOCKER_HOST`).
///
/// # Errors
/// Returns an error if no container runtime socket accepts connections.
pub fn ensure_container_runtime() -> Result<()> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match INIT.get_or_init(detect) {
        Ok(()) => Ok(()),
        Err(message) => bail!("{message}"),
    }
}

fn detect() -> Result<(), String> {
    if let Ok(docker_host) = env::var("DOCKER_HOST") {
        return match docker_host.strip_prefix("unix://") {
            Some(path) if !wait_for_socket(Path::new(path)) => Err(format!(
                "`DOCKER_HOST` points to `{docker_host}`, but the socket is not accepting connections"
            )),
            _ => Ok(()),
        };
    }

    if wait_for_socket(Path::new("/var/run/docker.sock")) {
        return Ok(());
    }

    if let Some(path) = podman_socket() {
        if wait_for_socket(&path) {
            env::set_var("DOCKER_HOST", format!("unix://{}", path.display()));
            return Ok(());
        }
    }

    Err("no container runtime socket found; start Docker or `podman.socket`, or set `DOCKER_HOST`"
        .to_string())
}

fn podman_socket() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(runtime_dir) = env::var("XDG_RUNTIME_DIR") {
        candidates.push(PathBuf::from(runtime_dir).join("podman/podman.sock"));
    }
    candidates.push(PathBuf::from("/run/podman/podman.sock"));
    candidates.into_iter().find(|path| path.exists())
}

fn wait_for_socket(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    let start = Instant::now();
    while start.elapsed() < SOCKET_WAIT_TIMEOUT {
        if UnixStream::connect(path).is_ok() {
            return true;
        }
        thread::sleep(Duration::from_millis(200));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_socket_is_not_ready() {
        assert!(!wait_for_socket(Path::new("/nonexistent/tessera.sock")));
    }
}

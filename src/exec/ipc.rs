// src/exec/ipc.rs

//! Parent/child message channel for the entry script.
//!
//! The channel is a Unix socket pair. The child end is installed as fd 3 in
//! the child and advertised through `NODE_CHANNEL_FD`, which is where Node's
//! `process.send()` writes. With `NODE_CHANNEL_SERIALIZATION_MODE=json` every
//! message is one line of JSON.

use serde_json::Value;

use crate::types::ChildMessage;

/// Fd number the child sees its end of the channel on.
pub const CHILD_CHANNEL_FD: i32 = 3;

pub const CHANNEL_FD_ENV: &str = "NODE_CHANNEL_FD";
pub const CHANNEL_MODE_ENV: &str = "NODE_CHANNEL_SERIALIZATION_MODE";

/// Parse one line read from the channel.
///
/// Returns `Ok(None)` for blank lines and for Node's own bookkeeping messages
/// (objects whose `cmd` starts with `NODE_`), which are never relayed.
pub fn parse_line(line: &str) -> Result<Option<ChildMessage>, serde_json::Error> {
    let raw = line.trim_end_matches(['\r', '\n']);
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw)?;
    if is_internal(&value) {
        return Ok(None);
    }

    Ok(Some(ChildMessage {
        raw: raw.to_string(),
        value,
    }))
}

fn is_internal(value: &Value) -> bool {
    value
        .get("cmd")
        .and_then(Value::as_str)
        .is_some_and(|cmd| cmd.starts_with("NODE_"))
}

#[cfg(unix)]
pub use self::unix::{MessageChannel, install_child_end};

#[cfg(unix)]
mod unix {
    use std::io;
    use std::os::fd::{AsRawFd, OwnedFd, RawFd};
    use std::os::unix::net::UnixStream as StdUnixStream;

    use tokio::net::UnixStream;
    use tokio::process::Command;

    use super::{CHANNEL_FD_ENV, CHANNEL_MODE_ENV, CHILD_CHANNEL_FD};

    /// Both ends of a freshly created channel.
    ///
    /// `child` must stay open until the child has been spawned and should be
    /// dropped right after, so the parent sees EOF once the child exits.
    #[derive(Debug)]
    pub struct MessageChannel {
        pub parent: UnixStream,
        pub child: OwnedFd,
    }

    impl MessageChannel {
        pub fn new() -> io::Result<Self> {
            let (parent, child) = StdUnixStream::pair()?;
            parent.set_nonblocking(true)?;
            Ok(Self {
                parent: UnixStream::from_std(parent)?,
                child: OwnedFd::from(child),
            })
        }
    }

    /// Arrange for `child_end` to appear as [`CHILD_CHANNEL_FD`] in the
    /// spawned process and export the Node channel variables.
    pub fn install_child_end(cmd: &mut Command, child_end: &OwnedFd) {
        let fd: RawFd = child_end.as_raw_fd();

        cmd.env(CHANNEL_FD_ENV, CHILD_CHANNEL_FD.to_string())
            .env(CHANNEL_MODE_ENV, "json");

        // SAFETY: the closure runs in the forked child before exec and only
        // calls async-signal-safe libc functions on fds we own.
        unsafe {
            cmd.pre_exec(move || {
                if fd == CHILD_CHANNEL_FD {
                    // Already in place; dup2 would be a no-op and leave
                    // FD_CLOEXEC set.
                    let flags = libc::fcntl(fd, libc::F_GETFD);
                    if flags < 0 || libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) < 0
                    {
                        return Err(io::Error::last_os_error());
                    }
                } else if libc::dup2(fd, CHILD_CHANNEL_FD) < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
}

use std::{
    collections::BTreeMap,
    io,
    os::fd::{AsRawFd, RawFd},
};

use crate::cutils::cerr;
use libc::{pollfd, POLLERR, POLLHUP, POLLIN};

/// A set of indexed file descriptors to be polled for readability using the
/// [`poll`](https://manpage.me/?q=poll) system call.
pub struct PollSet<K> {
    fds: BTreeMap<K, RawFd>,
}

impl<K: Eq + PartialEq + Ord + PartialOrd + Clone> PollSet<K> {
    /// Create an empty set of file descriptors.
    pub const fn new() -> Self {
        Self {
            fds: BTreeMap::new(),
        }
    }

    /// Add a file descriptor under the provided key.
    ///
    /// If the provided key is already in the set, calling this function will overwrite the file
    /// descriptor for that key.
    pub fn add_fd<F: AsRawFd>(&mut self, key: K, fd: &F) {
        self.fds.insert(key, fd.as_raw_fd());
    }

    /// Poll the set of file descriptors and return the keys of the descriptors that can be read
    /// without blocking.
    ///
    /// A descriptor whose other end hung up is reported as ready too, since reading it will
    /// return end-of-file immediately. Calling this function will block until one of the file
    /// descriptors in the set is ready.
    pub fn poll(&mut self) -> io::Result<Vec<K>> {
        let mut fds: Vec<pollfd> = self
            .fds
            .values()
            .map(|&fd| pollfd {
                fd,
                events: POLLIN,
                revents: 0,
            })
            .collect();

        let n = cerr(unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as _, -1) })?;

        let mut keys = Vec::with_capacity(n as usize);

        for (key, fd) in self.fds.keys().zip(fds) {
            if fd.revents & (POLLIN | POLLHUP | POLLERR) != 0 {
                keys.push(key.clone());
            }
        }

        Ok(keys)
    }
}

use crate::system::interface::ProcessId;

use super::SignalNumber;

/// One signal arrival, exactly as the kernel handed it to the stream handler.
#[repr(transparent)]
pub(crate) struct SignalInfo {
    info: libc::siginfo_t,
}

impl SignalInfo {
    pub(super) const SIZE: usize = std::mem::size_of::<Self>();

    /// Which process sent the signal. For `SIGCHLD` this is one of the children that changed
    /// state, but not necessarily the only one.
    pub(crate) fn sender(&self) -> ProcessId {
        // SAFETY: every signal routed through the stream is delivered with `SA_SIGINFO`, so the
        // `si_pid` field is initialized (possibly to zero for kernel generated signals).
        unsafe { ProcessId::new(self.info.si_pid()) }
    }

    pub(crate) fn signal(&self) -> SignalNumber {
        self.info.si_signo
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared switch that makes the harness peer go dark.
///
/// Clones refer to the same flag. It may be flipped from any thread at any time, the read loop
/// samples it once per inbound frame. A frame already being answered when the flag is set may
/// still get its reply, so callers should allow for some settle time.
#[derive(Clone, Debug, Default)]
pub struct Silence {
    flag: Arc<AtomicBool>,
}

impl Silence {
    /// A new, unset switch.
    pub fn new() -> Self {
        Silence::default()
    }

    /// Stop (`true`) or resume (`false`) answering inbound frames.
    pub fn set(&self, silent: bool) {
        let was = self.flag.swap(silent, Ordering::Release);
        if was != silent {
            net_debug!("silence {}", if silent { "on" } else { "off" });
        }
    }

    /// Check if inbound frames are currently discarded.
    pub fn get(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use std::thread;
    use super::*;

    #[test]
    fn shared_between_clones() {
        let silence = Silence::new();
        let handle = silence.clone();
        assert!(!silence.get());

        handle.set(true);
        assert!(silence.get());
        handle.set(true);
        assert!(silence.get());

        silence.set(false);
        assert!(!handle.get());
    }

    #[test]
    fn set_from_other_thread() {
        let silence = Silence::new();
        let handle = silence.clone();
        thread::spawn(move || handle.set(true))
            .join()
            .unwrap();
        assert!(silence.get());
    }
}

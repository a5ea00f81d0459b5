//! Thread safe heading cell

use std::sync::{Arc, Mutex};

use super::HeadingSource;

/// A heading value shared between a producer (e.g. a gyro driver thread) and
/// playback.
///
/// Clones refer to the same value.
#[derive(Clone, Debug, Default)]
pub struct SharedHeading {
    value: Arc<Mutex<Option<f64>>>,
}

impl SharedHeading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new heading, or `None` if the heading is unavailable.
    pub fn set(&self, heading_deg: Option<f64>) {
        if let Ok(mut v) = self.value.lock() {
            *v = heading_deg;
        }
    }
}

impl HeadingSource for SharedHeading {
    fn heading_deg(&self) -> Option<f64> {
        // A poisoned lock means the producer panicked, so treat the heading
        // as unavailable.
        self.value.lock().ok().and_then(|v| *v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shared() {
        let heading = SharedHeading::new();
        assert_eq!(heading.heading_deg(), None);

        let producer = heading.clone();
        std::thread::spawn(move || producer.set(Some(42.0)))
            .join()
            .unwrap();

        assert_eq!(heading.heading_deg(), Some(42.0));

        heading.set(None);
        assert_eq!(heading.heading_deg(), None);
    }
}

//! Notification boundary.
//!
//! The pipeline reports outcomes (new link, duplicate, failure) to an external
//! collaborator that decides how to surface them. Delivery itself, audio or
//! visual, stays outside this crate.

/// Cue accompanying a message, mirroring the distinct sounds the overlay
/// plays for each outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// A new link was added or an import succeeded.
    Open,
    /// An expected, non-exceptional outcome (duplicate, empty import).
    Notification,
    /// A genuine failure.
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, cue: Cue);
}

/// Default notifier: routes messages into the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, cue: Cue) {
        match cue {
            Cue::Error => log::warn!("{}", message),
            Cue::Open | Cue::Notification => log::info!("{}", message),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures notifications for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub events: Mutex<Vec<(String, Cue)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, cue: Cue) {
            self.events
                .lock()
                .unwrap()
                .push((message.to_string(), cue));
        }
    }
}

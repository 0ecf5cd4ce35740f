//! Narration hooks for user-visible download steps.
//!
//! Strategies never print. Every externally visible step is reported to a
//! [`Narrator`] supplied by the caller; the default narrator does nothing.

use std::future::Future;

/// Nesting level of a narrated step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionLevel {
    /// A top-level step such as "Git download"
    Action,
    /// A step inside an action, e.g. a clone or a checksum check
    SubAction,
}

/// Receives narration for download steps.
pub trait Narrator: Send + Sync {
    /// A step is about to run
    fn begin(&self, _level: ActionLevel, _message: &str) {}

    /// A step has finished
    fn end(&self, _level: ActionLevel, _message: &str, _succeeded: bool) {}

    /// A free-standing message
    fn message(&self, _message: &str) {}
}

/// Narrator that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {}

/// Narrator that routes steps through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNarrator;

impl Narrator for LogNarrator {
    fn begin(&self, level: ActionLevel, message: &str) {
        match level {
            ActionLevel::Action => log::info!("> {}", message),
            ActionLevel::SubAction => log::debug!("  > {}", message),
        }
    }

    fn end(&self, _level: ActionLevel, message: &str, succeeded: bool) {
        if !succeeded {
            log::warn!("{} failed", message);
        }
    }

    fn message(&self, message: &str) {
        log::info!("{}", message);
    }
}

/// Run `future` wrapped in a begin/end narration pair.
///
/// `end` is reported whether the future succeeds or fails.
pub async fn narrate<F, T, E>(
    narrator: &dyn Narrator,
    level: ActionLevel,
    message: &str,
    future: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    narrator.begin(level, message);
    let result = future.await;
    narrator.end(level, message, result.is_ok());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Narrator for Recorder {
        fn begin(&self, level: ActionLevel, message: &str) {
            self.events.lock().unwrap().push(format!("begin {:?} {}", level, message));
        }

        fn end(&self, _level: ActionLevel, message: &str, succeeded: bool) {
            self.events.lock().unwrap().push(format!("end {} {}", message, succeeded));
        }
    }

    #[test]
    fn test_narrate_reports_failure() {
        let recorder = Recorder::default();
        let result: Result<(), &str> = tokio_test::block_on(narrate(
            &recorder,
            ActionLevel::Action,
            "Git download",
            async { Err("boom") },
        ));

        assert!(result.is_err());
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["begin Action Git download", "end Git download false"]
        );
    }

    #[tokio::test]
    async fn test_silent_narrator_passes_value_through() {
        let value: Result<u32, ()> =
            narrate(&SilentNarrator, ActionLevel::SubAction, "step", async { Ok(7) }).await;
        assert_eq!(value, Ok(7));
    }
}

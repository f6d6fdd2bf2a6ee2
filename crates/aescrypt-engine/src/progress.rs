use std::panic::{self, AssertUnwindSafe};

/// Progress callback: receives the engine instance label and the total number
/// of octets consumed from the source so far. The reported total is
/// monotonically non-decreasing. The callback may block briefly but must not
/// re-enter the engine; if it panics the operation aborts with an internal
/// error.
pub type ProgressFn = dyn Fn(&str, u64) + Send + Sync;

/// Tracks octets consumed and drives the optional progress callback at the
/// configured interval. An interval of zero disables reporting entirely (the
/// consumed total is still tracked for the engine's own bookkeeping).
pub(crate) struct ProgressMeter<'a> {
    instance: &'a str,
    callback: Option<&'a ProgressFn>,
    interval: u64,
    since_report: u64,
    total: u64,
}

/// The callback panicked; the operation must abort with an internal error.
pub(crate) struct CallbackPanicked;

impl<'a> ProgressMeter<'a> {
    pub(crate) fn new(
        instance: &'a str,
        callback: Option<&'a ProgressFn>,
        interval: usize,
    ) -> Self {
        Self {
            instance,
            callback,
            interval: interval as u64,
            since_report: 0,
            total: 0,
        }
    }

    fn enabled(&self) -> bool {
        self.interval > 0 && self.callback.is_some()
    }

    fn report(&self) -> Result<(), CallbackPanicked> {
        if let Some(callback) = self.callback {
            panic::catch_unwind(AssertUnwindSafe(|| callback(self.instance, self.total)))
                .map_err(|_| CallbackPanicked)?;
        }
        Ok(())
    }

    /// Reports the current total unconditionally (used at operation start and
    /// completion so observers can render 0% and 100%).
    pub(crate) fn checkpoint(&mut self) -> Result<(), CallbackPanicked> {
        self.since_report = 0;
        if self.enabled() {
            self.report()?;
        }
        Ok(())
    }

    /// Accounts for `octets` consumed from the source and reports if the
    /// accumulated count has reached the interval.
    pub(crate) fn consume(&mut self, octets: u64) -> Result<(), CallbackPanicked> {
        self.total += octets;
        self.since_report += octets;
        if self.enabled() && self.since_report >= self.interval {
            self.report()?;
            self.since_report = 0;
        }
        Ok(())
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }
}

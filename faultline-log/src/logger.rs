use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use log::{LevelFilter, Metadata, Record};

use faultline_core::Client;

use crate::converters::capture_from_record;

/// Targets of the notifier itself.  Reporting them could loop.
const NOTIFIER_TARGET: &str = "faultline";

/// A `log::Log` implementation that reports errors attached to records.
pub struct FaultlineLogger {
    client: Arc<Client>,
    filter: LevelFilter,
    excluded_targets: Vec<Cow<'static, str>>,
    attach_stacktraces: bool,
    dest_log: Option<Box<dyn log::Log>>,
}

impl fmt::Debug for FaultlineLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultlineLogger")
            .field("filter", &self.filter)
            .field("excluded_targets", &self.excluded_targets)
            .field("attach_stacktraces", &self.attach_stacktraces)
            .field("dest_log", &self.dest_log.is_some())
            .finish()
    }
}

impl FaultlineLogger {
    /// Creates a logger reporting `Warn` and `Error` records to `client`.
    pub fn new(client: Arc<Client>) -> Self {
        FaultlineLogger {
            client,
            filter: LevelFilter::Warn,
            excluded_targets: vec![Cow::Borrowed(NOTIFIER_TARGET)],
            attach_stacktraces: true,
            dest_log: None,
        }
    }

    /// Sets the most verbose level that is reported.
    #[must_use]
    pub fn with_filter(mut self, filter: LevelFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Never reports records whose target starts with `prefix`.
    #[must_use]
    pub fn exclude_target<S: Into<Cow<'static, str>>>(mut self, prefix: S) -> Self {
        self.excluded_targets.push(prefix.into());
        self
    }

    /// If set to `true` the current stack is resolved and attached to
    /// captured errors.  Defaults to `true`.
    ///
    /// This needs the `backtrace` feature.  Without it, captures only point
    /// at the location of the record.
    #[must_use]
    pub fn attach_stacktraces(mut self, attach_stacktraces: bool) -> Self {
        self.attach_stacktraces = attach_stacktraces;
        self
    }

    /// Forwards every record to another logger as well.
    #[must_use]
    pub fn with_dest_log<L: log::Log + 'static>(mut self, dest_log: L) -> Self {
        self.dest_log = Some(Box::new(dest_log));
        self
    }

    /// Installs this logger as the global logger.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let max_level = match self.dest_log {
            Some(_) => LevelFilter::Trace,
            None => self.filter,
        };
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    fn is_excluded(&self, target: &str) -> bool {
        self.excluded_targets
            .iter()
            .any(|prefix| target.starts_with(prefix.as_ref()))
    }

    fn reports(&self, md: &Metadata<'_>) -> bool {
        md.level() <= self.filter && !self.is_excluded(md.target())
    }
}

impl log::Log for FaultlineLogger {
    fn enabled(&self, md: &Metadata<'_>) -> bool {
        self.reports(md) || self.dest_log.as_ref().is_some_and(|log| log.enabled(md))
    }

    fn log(&self, record: &Record<'_>) {
        if self.reports(record.metadata()) {
            if let Some(capture) = capture_from_record(record, self.attach_stacktraces) {
                self.client.capture(capture);
            }
        }
        if let Some(ref log) = self.dest_log {
            if log.enabled(record.metadata()) {
                log.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Some(ref log) = self.dest_log {
            log.flush();
        }
    }
}

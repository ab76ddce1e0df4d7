#![allow(unused_macros)]
use self::simple_logger::SimpleLogger;
use std::ops::Deref;

mod simple_logger;

macro_rules! logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => (::log::log!(target: $target, ::log::Level::$rule_level, $d($d arg)+));
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        logger_macro!($name is $rule_level to $target, $);
    };
}

// Extra job bookkeeping reports, only shown with `-v`.
logger_macro!(verbose is Info to "tsh::verbose");

macro_rules! dev_logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => {
                if std::cfg!(feature = "dev") {
                    (::log::log!(
                        target: $target,
                        ::log::Level::$rule_level,
                        "{}: {}",
                        std::panic::Location::caller(),
                        format_args!($d($d arg)+)
                    ));
                }
            };
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        dev_logger_macro!($name is $rule_level to $target, $);
    };
}

dev_logger_macro!(dev_error is Error to "tsh::dev");
dev_logger_macro!(dev_warn is Warn to "tsh::dev");
dev_logger_macro!(dev_info is Info to "tsh::dev");
dev_logger_macro!(dev_debug is Debug to "tsh::dev");

/// Routes log records to a sink chosen by the record's target prefix.
#[derive(Default)]
pub struct ShellLogger(Vec<(String, Box<dyn log::Log>)>);

impl ShellLogger {
    pub fn new(verbose: bool) -> Self {
        let mut logger: Self = Default::default();

        if verbose {
            logger.add_logger("tsh::verbose", SimpleLogger::to_stdout(""));
        }

        #[cfg(feature = "dev")]
        {
            let path = option_env!("TSH_DEV_LOGS")
                .map(|s| s.into())
                .unwrap_or_else(|| {
                    std::env::temp_dir().join(format!("tsh-dev-{}.log", std::process::id()))
                });
            match SimpleLogger::to_file(path, "") {
                Ok(file_logger) => logger.add_logger("tsh::dev", file_logger),
                Err(err) => eprintln_ignore_io_error!("tsh: cannot open development log: {err}"),
            }
        }

        logger
    }

    pub fn into_global_logger(self) {
        if log::set_boxed_logger(Box::new(self)).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    }

    /// Add a logger for a specific prefix to the stack
    fn add_logger(
        &mut self,
        prefix: impl ToString + Deref<Target = str>,
        logger: impl log::Log + 'static,
    ) {
        let prefix = if prefix.ends_with("::") {
            prefix.to_string()
        } else {
            // given a prefix `my::prefix`, we want to match `my::prefix::somewhere`
            // but not `my::prefix_to_somewhere`
            format!("{}::", prefix.to_string())
        };
        self.0.push((prefix, Box::new(logger)))
    }

    fn matching<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a dyn log::Log> + 'a {
        self.0
            .iter()
            .filter(move |(prefix, _)| {
                target == &prefix[..prefix.len() - 2] || target.starts_with(prefix.as_str())
            })
            .map(|(_, logger)| logger.as_ref())
    }
}

impl log::Log for ShellLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= log::STATIC_MAX_LEVEL
    }

    fn log(&self, record: &log::Record) {
        for logger in self.matching(record.target()) {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for (_, l) in self.0.iter() {
            l.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ShellLogger;

    #[test]
    fn verbose_sink_only_when_asked() {
        let dev = if cfg!(feature = "dev") { 1 } else { 0 };
        assert_eq!(ShellLogger::new(false).0.len(), dev);
        assert_eq!(ShellLogger::new(true).0.len(), dev + 1);
    }

    #[test]
    fn prefix_matching() {
        let logger = ShellLogger::new(true);
        assert_eq!(logger.matching("tsh::verbose").count(), 1);
        assert_eq!(logger.matching("tsh::verbose::jobs").count(), 1);
        assert_eq!(logger.matching("tsh::verbosely").count(), 0);
        assert_eq!(logger.matching("tsh::user").count(), 0);
    }
}

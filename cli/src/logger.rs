use std::io::Write;

use colored::*;
use env_logger::{Builder, Logger, Target};
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Installs the stdout logger. `verbose` adds debug lines and `quiet` hides
/// everything else; each flag is applied on its own.
pub fn init(verbose: bool, quiet: bool) {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("verbprobe_core", LevelFilter::Debug)
        .filter_module("verbprobe", LevelFilter::Debug)
        .target(Target::Stdout);

    builder.format(|buf, record| {
        let prefix = match record.level() {
            Level::Error => "[!]".red().bold(),
            Level::Warn => "[-]".yellow().bold(),
            Level::Info => "[*]".bright_cyan(),
            Level::Debug | Level::Trace => "[DEBUG]".dimmed(),
        };
        writeln!(buf, "{} {}", prefix, record.args())
    });

    let gate = VerbosityGate {
        inner: builder.build(),
        verbose,
        quiet,
    };
    if log::set_boxed_logger(Box::new(gate)).is_ok() {
        log::set_max_level(max_level(verbose, quiet));
    }
}

fn shows(level: Level, verbose: bool, quiet: bool) -> bool {
    match level {
        Level::Debug | Level::Trace => verbose,
        Level::Error | Level::Warn | Level::Info => !quiet,
    }
}

fn max_level(verbose: bool, quiet: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Off
    } else {
        LevelFilter::Info
    }
}

struct VerbosityGate {
    inner: Logger,
    verbose: bool,
    quiet: bool,
}

impl Log for VerbosityGate {
    fn enabled(&self, metadata: &Metadata) -> bool {
        shows(metadata.level(), self.verbose, self.quiet) && self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if shows(record.level(), self.verbose, self.quiet) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shows_info_but_not_debug() {
        assert!(shows(Level::Info, false, false));
        assert!(shows(Level::Error, false, false));
        assert!(!shows(Level::Debug, false, false));
        assert_eq!(max_level(false, false), LevelFilter::Info);
    }

    #[test]
    fn test_quiet_hides_everything() {
        for level in [Level::Error, Level::Warn, Level::Info, Level::Debug] {
            assert!(!shows(level, false, true), "{} should be hidden", level);
        }
        assert_eq!(max_level(false, true), LevelFilter::Off);
    }

    #[test]
    fn test_verbose_and_quiet_keep_only_debug() {
        assert!(shows(Level::Debug, true, true));
        assert!(!shows(Level::Info, true, true));
        assert!(!shows(Level::Warn, true, true));
        assert!(!shows(Level::Error, true, true));
        assert_eq!(max_level(true, true), LevelFilter::Debug);
    }

    #[test]
    fn test_verbose_adds_debug() {
        assert!(shows(Level::Debug, true, false));
        assert!(shows(Level::Warn, true, false));
    }
}

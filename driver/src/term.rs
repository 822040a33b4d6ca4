use crate::Result;
use clap::{ArgGroup, Args};
use std::fmt;

pub use owo_colors::{style, OwoColorize, Style};

const ARG_GROUP: &str = "output-opts";

/// Options controlling how the run is reported.
#[derive(Debug, Args)]
#[command(
    next_help_heading = "Output Options",
    group = ArgGroup::new(ARG_GROUP).multiple(true),
)]
pub struct OutputOptions {
    /// When to color the report and the logs.
    #[clap(
        long,
        env = "CARGO_TERM_COLORS",
        default_value_t = ColorMode::Auto,
        global = true,
        group = ARG_GROUP,
    )]
    pub color: ColorMode,

    /// Configures logging.
    ///
    /// Readers and writers log their progress at the `debug` level, and the
    /// guards log every state transition at the `trace` level.
    #[clap(
        short,
        long,
        env = "RUST_LOG",
        default_value = "rwprio=info,warn",
        global = true,
        group = ARG_GROUP,
    )]
    pub log: tracing_subscriber::filter::Targets,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum ColorMode {
    /// Color a stream only if it is a terminal.
    Auto,
    /// Color everything.
    Always,
    /// Color nothing.
    Never,
}

// === impl OutputOptions ===

impl OutputOptions {
    /// Installs a `tracing` subscriber which logs to stderr, filtered by
    /// `--log`.
    pub fn init(&self) -> Result<()> {
        use tracing_subscriber::prelude::*;
        let fmt = tracing_subscriber::fmt::layer()
            .with_ansi(self.color.should_color(atty::Stream::Stderr))
            .with_thread_names(true)
            .without_time()
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(fmt)
            .with(tracing_error::ErrorLayer::default())
            .with(self.log.clone())
            .try_init()?;
        Ok(())
    }
}

// === impl ColorMode ===

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ColorMode::Auto => "auto",
            ColorMode::Always => "always",
            ColorMode::Never => "never",
        })
    }
}

impl ColorMode {
    /// Returns `style` if stdout should be colored, or a plain style if it
    /// should not.
    pub fn if_color(self, style: Style) -> Style {
        if self.should_color(atty::Stream::Stdout) {
            style
        } else {
            owo_colors::style()
        }
    }

    pub fn should_color(self, stream: atty::Stream) -> bool {
        match self {
            ColorMode::Auto => atty::is(stream),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

use clap::Parser;
use rwprio_driver::{Options, Result};

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Options::parse();
    opts.output.init()?;

    tracing::debug!(
        ?opts.policy,
        opts.readers,
        opts.writers,
        opts.initial,
        opts.max_delay_ms,
        ?opts.seed,
        "rwprio configuration"
    );

    opts.run()
}

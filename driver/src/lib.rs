use color_eyre::{
    eyre::{ensure, format_err, WrapErr},
    Help, SectionExt,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rwprio::{Event, EventLog, Guard, Policy, Role, Task, Value};
use std::{
    io::{self, Write},
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use term::{style, OwoColorize, Style};

pub use color_eyre::eyre::Result;

pub mod term;

/// Runs readers and writers against a shared value guarded by a reader- or
/// writer-priority protocol, and reports what each of them saw.
///
/// Every writer doubles the shared value, so once all of them have finished
/// the value should be `initial * 2^writers`.
#[derive(Debug, clap::Parser)]
#[command(name = "rwprio", version)]
pub struct Options {
    /// Which priority policy to run.
    #[clap(long, value_enum, default_value_t = PolicyArg::Both)]
    pub policy: PolicyArg,

    /// The number of reader threads to spawn.
    #[clap(short, long, default_value_t = 3)]
    pub readers: usize,

    /// The number of writer threads to spawn.
    #[clap(short, long, default_value_t = 3)]
    pub writers: usize,

    /// The initial value of the shared variable.
    #[clap(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub initial: Value,

    /// The longest a reader or writer sleeps before its operation, in
    /// milliseconds.
    ///
    /// Each task sleeps for a random duration up to this long, to shake up the
    /// order in which they contend for the shared variable. 0 disables delays.
    #[clap(long, default_value_t = 300)]
    pub max_delay_ms: u64,

    /// Seeds the random delays, so that a run can be repeated.
    ///
    /// If this is not provided, a seed is chosen based on the current time,
    /// and logged.
    #[clap(long)]
    pub seed: Option<u64>,

    #[clap(flatten)]
    pub output: term::OutputOptions,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum PolicyArg {
    /// Readers are admitted even while writers wait.
    Reader,
    /// Readers are turned away while writers wait.
    Writer,
    /// Run with reader priority, then with writer priority.
    Both,
}

/// What happened during one run of a policy.
#[derive(Debug)]
pub struct Report {
    pub policy: Policy,
    pub log: EventLog,
    pub final_value: Value,
    pub expected: Value,
}

#[derive(Debug)]
struct Styles {
    reader: Style,
    writer: Style,
    heading: Style,
    value: Style,
}

// === impl Options ===

impl Options {
    pub fn run(&self) -> Result<()> {
        let expected = self.expected()?;
        let seed = self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|now| now.as_nanos() as u64)
                .unwrap_or_default()
        });
        tracing::info!(seed, "using seed");
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let styles = Styles::new(self.output.color);

        let mut failed = Vec::new();
        for &policy in self.policy.policies() {
            let tasks = self.tasks(&mut rng);
            let report = run_policy(policy, self.initial, expected, &tasks, &styles)?;
            if report.final_value != report.expected {
                failed.push(report);
            }
        }

        if let Some(report) = failed.first() {
            return Err(format_err!(
                "{} guard ended up with {}, but expected {}",
                report.policy,
                report.final_value,
                report.expected
            ))
            .note("every writer should have doubled the shared variable exactly once")
            .with_section(|| format!("{:#?}", report.log.events()).header("Events:"));
        }

        Ok(())
    }

    /// Returns the value the shared variable should hold once every writer
    /// has doubled it.
    pub fn expected(&self) -> Result<Value> {
        let writers = u32::try_from(self.writers)?;
        2i64.checked_pow(writers)
            .and_then(|factor| self.initial.checked_mul(factor))
            .ok_or_else(|| {
                format_err!(
                    "{} doubled {} times overflows the shared variable",
                    self.initial,
                    self.writers
                )
            })
            .suggestion("try fewer writers, or a smaller initial value")
    }

    /// Returns the readers, then the writers, each with a random delay.
    pub fn tasks(&self, rng: &mut impl Rng) -> Vec<Task> {
        let mut delay = || {
            if self.max_delay_ms == 0 {
                Duration::ZERO
            } else {
                Duration::from_millis(rng.gen_range(0..=self.max_delay_ms))
            }
        };
        let mut tasks = Vec::with_capacity(self.readers + self.writers);
        for id in 1..=self.readers {
            tasks.push(Task::reader(id).with_delay(delay()));
        }
        for id in 1..=self.writers {
            tasks.push(Task::writer(id).with_delay(delay()));
        }
        tasks
    }
}

// === impl PolicyArg ===

impl PolicyArg {
    pub fn policies(self) -> &'static [Policy] {
        match self {
            PolicyArg::Reader => &[Policy::ReaderPriority],
            PolicyArg::Writer => &[Policy::WriterPriority],
            PolicyArg::Both => &Policy::ALL,
        }
    }
}

// === impl Styles ===

impl Styles {
    fn new(colors: term::ColorMode) -> Self {
        Self {
            reader: colors.if_color(style().green().bold()),
            writer: colors.if_color(style().yellow().bold()),
            heading: colors.if_color(style().blue().bold()),
            value: colors.if_color(style().bold()),
        }
    }
}

/// Runs every task on its own thread against a new guard, printing a line as
/// each operation completes.
fn run_policy(
    policy: Policy,
    initial: Value,
    expected: Value,
    tasks: &[Task],
    styles: &Styles,
) -> Result<Report> {
    let _span = tracing::info_span!("run", %policy).entered();
    println!("{}", format_args!("=== {policy} ===").style(styles.heading));

    let guard = Guard::new(policy, initial);
    let log = EventLog::new();
    let started = Instant::now();
    thread::scope(|s| -> Result<()> {
        let handles = tasks
            .iter()
            .map(|task| {
                let (guard, log) = (&guard, &log);
                let name = format!("{}-{}", task.role(), task.id());
                thread::Builder::new()
                    .name(name)
                    .spawn_scoped(s, move || {
                        let event = task.run(guard, |x| x * 2, log);
                        print_event(&mut io::stdout().lock(), &event, started, styles)
                    })
            })
            .collect::<io::Result<Vec<_>>>()?;

        for handle in handles {
            handle
                .join()
                .map_err(|_| format_err!("a reader or writer thread panicked"))?
                .wrap_err("failed to write to stdout")?;
        }
        Ok(())
    })?;

    let final_value = guard.read();
    println!(
        "{} final value: {} (expected {})",
        format_args!("=== {policy} ===").style(styles.heading),
        final_value.style(styles.value),
        expected,
    );
    tracing::debug!(final_value, expected, events = log.len(), "run complete");
    ensure!(
        log.len() == tasks.len(),
        "only {} of {} tasks completed",
        log.len(),
        tasks.len()
    );

    Ok(Report {
        policy,
        log,
        final_value,
        expected,
    })
}

/// Prints one completed operation, stamped with how long after `started` it
/// took place.
fn print_event(
    out: &mut impl Write,
    event: &Event,
    started: Instant,
    styles: &Styles,
) -> io::Result<()> {
    let elapsed = event.at.saturating_duration_since(started);
    let (who, what, style) = match event.role {
        Role::Reader => ("Reader", "has read the shared variable", styles.reader),
        Role::Writer => ("Writer", "modified the shared variable to", styles.writer),
    };
    writeln!(
        out,
        "{} {what}: {} | +{:.1}ms",
        format_args!("{who} {}", event.id).style(style),
        event.value.style(styles.value),
        elapsed.as_secs_f64() * 1000.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_is_well_formed() {
        Options::command().debug_assert();
    }

    fn parse(args: &[&str]) -> Options {
        Options::try_parse_from(std::iter::once("rwprio").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn defaults() {
        let opts = parse(&[]);
        assert_eq!(opts.policy, PolicyArg::Both);
        assert_eq!(opts.policy.policies(), &Policy::ALL);
        assert_eq!((opts.readers, opts.writers, opts.initial), (3, 3, 1));
        assert_eq!(opts.max_delay_ms, 300);
        assert_eq!(opts.seed, None);
        assert_eq!(opts.expected().unwrap(), 8);
    }

    #[test]
    fn negative_initial_value() {
        let opts = parse(&["--initial", "-3", "--writers", "2"]);
        assert_eq!(opts.expected().unwrap(), -12);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let res = Options::try_parse_from(["rwprio", "--readers", "-1"]);
        assert!(res.is_err());
    }

    #[test]
    fn overflow_is_rejected() {
        let opts = parse(&["--writers", "64"]);
        assert!(opts.expected().is_err());
    }

    #[test]
    fn readers_are_spawned_first() {
        let opts = parse(&["--readers", "2", "--writers", "2", "--max-delay-ms", "5"]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let tasks = opts.tasks(&mut rng);

        let order = tasks
            .iter()
            .map(|task| (task.role(), task.id()))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            [
                (Role::Reader, 1),
                (Role::Reader, 2),
                (Role::Writer, 1),
                (Role::Writer, 2),
            ]
        );
        assert!(tasks
            .iter()
            .all(|task| task.delay() <= Duration::from_millis(5)));
    }

    #[test]
    fn seeded_delays_repeat() {
        let opts = parse(&["--max-delay-ms", "1000"]);
        let delays = |seed| {
            opts.tasks(&mut Xoshiro256PlusPlus::seed_from_u64(seed))
                .iter()
                .map(Task::delay)
                .collect::<Vec<_>>()
        };
        assert_eq!(delays(42), delays(42));
    }

    #[test]
    fn run_both_policies() {
        let opts = parse(&["--policy", "both", "--max-delay-ms", "2", "--seed", "7"]);
        opts.run().unwrap();

        let styles = Styles::new(term::ColorMode::Never);
        for policy in Policy::ALL {
            let tasks = opts.tasks(&mut Xoshiro256PlusPlus::seed_from_u64(7));
            let report = run_policy(policy, 1, 8, &tasks, &styles).unwrap();
            assert_eq!(report.final_value, 8);
            assert_eq!(report.log.events_for(Role::Reader).len(), 3);
            assert_eq!(report.log.events_for(Role::Writer).len(), 3);
        }
    }

    fn event(role: Role, id: usize, value: Value, at: Instant) -> Event {
        Event {
            role,
            id,
            value,
            at,
        }
    }

    #[test]
    fn events_are_timestamped() {
        let styles = Styles::new(term::ColorMode::Never);
        let started = Instant::now();
        let mut out = Vec::new();

        let read = event(Role::Reader, 2, 4, started + Duration::from_micros(12_300));
        print_event(&mut out, &read, started, &styles).unwrap();
        let write = event(Role::Writer, 1, 8, started + Duration::from_millis(250));
        print_event(&mut out, &write, started, &styles).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Reader 2 has read the shared variable: 4 | +12.3ms\n\
             Writer 1 modified the shared variable to: 8 | +250.0ms\n"
        );
    }

    #[test]
    fn events_before_the_start_are_not_negative() {
        let styles = Styles::new(term::ColorMode::Never);
        let at = Instant::now();
        let mut out = Vec::new();
        print_event(
            &mut out,
            &event(Role::Writer, 3, 2, at),
            at + Duration::from_secs(1),
            &styles,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("| +0.0ms\n"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_are_returned() {
        let styles = Styles::new(term::ColorMode::Never);
        let now = Instant::now();
        let err = print_event(&mut BrokenPipe, &event(Role::Reader, 1, 1, now), now, &styles)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}

//! Command-line front end for the `siglogd` demo daemon.
//!
//! `siglogd run` hosts the logging service and produces a steady stream of
//! log lines and dump material. `siglogd level` and `siglogd dump` send the
//! trigger signals to a running instance.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use siglog::{LogLevel, SiglogConfig, global};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const PROGRAM_NAME: &str = "siglogd";

/// Environment variable holding the diagnostics filter.
const TRACE_ENV: &str = "SIGLOG_TRACE";

static TICKS: AtomicU64 = AtomicU64::new(0);
static LAST_TICK_MS: AtomicU32 = AtomicU32::new(0);
static UPTIME_SECS: AtomicU64 = AtomicU64::new(0);

/// Routes service diagnostics to stderr, filtered by `SIGLOG_TRACE`.
pub fn install_tracing() {
    let filter = EnvFilter::try_from_env(TRACE_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .about("Signal-driven logging service demo")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run the service and log a heartbeat at every level.")
                .arg(
                    Arg::new("dir")
                        .long("dir")
                        .value_name("DIR")
                        .help("Directory for the log and dump files.")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("level")
                        .long("level")
                        .value_name("LEVEL")
                        .help("Starting level: disabled, min, standard, max or 0-3.")
                        .value_parser(value_parser!(LogLevel)),
                )
                .arg(
                    Arg::new("level-signal")
                        .long("level-signal")
                        .value_name("SIGNO")
                        .help("Signal carrying level changes (default SIGRTMIN).")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i32)),
                )
                .arg(
                    Arg::new("dump-signal")
                        .long("dump-signal")
                        .value_name("SIGNO")
                        .help("Signal requesting a dump (default level signal + 1).")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i32)),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .value_name("N")
                        .help("Number of heartbeats before exiting; 0 runs forever.")
                        .default_value("0")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .value_name("MS")
                        .help("Milliseconds between heartbeats.")
                        .default_value("1000")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("level")
                .about("Ask a running instance to change its level.")
                .arg(pid_arg())
                .arg(
                    Arg::new("value")
                        .required(true)
                        .value_name("LEVEL")
                        .help("Level name or raw integer payload.")
                        .allow_negative_numbers(true),
                )
                .arg(signal_arg("Level signal of the target (default SIGRTMIN).")),
        )
        .subcommand(
            Command::new("dump")
                .about("Ask a running instance to write a dump file.")
                .arg(pid_arg())
                .arg(signal_arg("Dump signal of the target (default level signal + 1).")),
        )
}

fn pid_arg() -> Arg {
    Arg::new("pid")
        .required(true)
        .value_name("PID")
        .help("Process id of the running instance.")
        .value_parser(value_parser!(i32))
}

fn signal_arg(help: &'static str) -> Arg {
    Arg::new("signal")
        .long("signal")
        .value_name("SIGNO")
        .help(help)
        .action(ArgAction::Set)
        .value_parser(value_parser!(i32))
}

/// Parses `args`, runs the selected subcommand and maps the outcome to an
/// exit status.
pub fn run_with<I, S, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let matches = match clap_command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(error) if error.use_stderr() => {
            let _ = write!(stderr, "{}", error.render());
            return ExitCode::from(2);
        }
        Err(error) => {
            let _ = write!(stdout, "{}", error.render());
            return ExitCode::SUCCESS;
        }
    };

    let outcome = match matches.subcommand() {
        Some(("run", sub)) => run(sub, stdout),
        Some(("level", sub)) => send_level(sub, stdout),
        Some(("dump", sub)) => send_dump(sub, stdout),
        _ => Err("missing subcommand".to_owned()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let _ = writeln!(stderr, "{PROGRAM_NAME}: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_config(matches: &ArgMatches) -> Result<SiglogConfig, String> {
    let base = SiglogConfig::from_env().map_err(|error| error.to_string())?;
    let mut builder = SiglogConfig::builder().start_level(base.start_level());
    if let Some(signal) = base.level_signal() {
        builder = builder.level_signal(signal);
    }
    if let Some(signal) = base.dump_signal() {
        builder = builder.dump_signal(signal);
    }
    if let Some(dir) = base.directory() {
        builder = builder.directory(dir);
    }

    if let Some(dir) = matches.get_one::<PathBuf>("dir") {
        builder = builder.directory(dir);
    }
    if let Some(level) = matches.get_one::<LogLevel>("level") {
        builder = builder.start_level(*level);
    }
    if let Some(signal) = matches.get_one::<i32>("level-signal") {
        builder = builder.level_signal(*signal);
    }
    if let Some(signal) = matches.get_one::<i32>("dump-signal") {
        builder = builder.dump_signal(*signal);
    }
    Ok(builder.build())
}

fn register_demo_entries(interval: Duration) -> Result<(), String> {
    let pid = std::process::id();
    let interval_ms = interval.as_millis();
    global::register_producer(move |sink| {
        writeln!(sink, "pid: {pid}")?;
        writeln!(sink, "interval_ms: {interval_ms}")
    })
    .and_then(|()| global::register_watch(siglog::Watchpoint::new("ticks", &TICKS)))
    .and_then(|()| global::register_watch(siglog::Watchpoint::new("uptime_secs", &UPTIME_SECS)))
    .and_then(|()| {
        global::register_watch(siglog::Watchpoint::f32_bits(
            "last_tick_ms",
            &LAST_TICK_MS,
        ))
    })
    .map_err(|error| error.to_string())
}

fn run<Out: Write>(matches: &ArgMatches, stdout: &mut Out) -> Result<(), String> {
    let config = run_config(matches)?;
    let (level_signal, dump_signal) = config.resolved_signals();
    let iterations = matches.get_one::<u64>("iterations").copied().unwrap_or(0);
    let interval = Duration::from_millis(
        matches
            .get_one::<u64>("interval-ms")
            .copied()
            .unwrap_or(1000),
    );

    global::init(config).map_err(|error| error.to_string())?;
    let result = heartbeat(stdout, level_signal, dump_signal, iterations, interval);
    global::teardown();
    result
}

fn heartbeat<Out: Write>(
    stdout: &mut Out,
    level_signal: i32,
    dump_signal: i32,
    iterations: u64,
    interval: Duration,
) -> Result<(), String> {
    register_demo_entries(interval)?;
    writeln!(
        stdout,
        "{PROGRAM_NAME} pid={} level_signal={level_signal} dump_signal={dump_signal}",
        signal::current_pid()
    )
    .and_then(|()| stdout.flush())
    .map_err(|error| error.to_string())?;

    let started = Instant::now();
    let mut tick = 0_u64;
    while iterations == 0 || tick < iterations {
        let began = Instant::now();
        tick += 1;
        siglog::min!("heartbeat {tick}");
        siglog::standard!("heartbeat {tick}: {} s up", started.elapsed().as_secs());
        siglog::max!("heartbeat {tick}: interval {} ms", interval.as_millis());

        TICKS.store(tick, Ordering::Relaxed);
        UPTIME_SECS.store(started.elapsed().as_secs(), Ordering::Relaxed);
        let spent_ms = began.elapsed().as_secs_f32() * 1000.0;
        LAST_TICK_MS.store(spent_ms.to_bits(), Ordering::Relaxed);

        if iterations == 0 || tick < iterations {
            thread::sleep(interval);
        }
    }
    Ok(())
}

fn parse_payload(text: &str) -> Result<i32, String> {
    text.trim()
        .parse::<i32>()
        .or_else(|_| text.parse::<LogLevel>().map(LogLevel::as_i32))
        .map_err(|error| error.to_string())
}

#[cfg(target_os = "linux")]
fn send_level<Out: Write>(matches: &ArgMatches, stdout: &mut Out) -> Result<(), String> {
    let pid = matches.get_one::<i32>("pid").copied().unwrap_or_default();
    let value = matches
        .get_one::<String>("value")
        .map(String::as_str)
        .unwrap_or_default();
    let payload = parse_payload(value)?;
    let signal = matches
        .get_one::<i32>("signal")
        .copied()
        .unwrap_or_else(signal::default_level_signal);

    signal::queue(pid, signal, payload).map_err(|error| format!("signal {signal} to {pid}: {error}"))?;
    writeln!(stdout, "sent level payload {payload} to {pid} (signal {signal})")
        .map_err(|error| error.to_string())
}

#[cfg(not(target_os = "linux"))]
fn send_level<Out: Write>(matches: &ArgMatches, _stdout: &mut Out) -> Result<(), String> {
    let value = matches
        .get_one::<String>("value")
        .map(String::as_str)
        .unwrap_or_default();
    parse_payload(value)?;
    Err("sending a level payload requires sigqueue, which this platform lacks".to_owned())
}

fn send_dump<Out: Write>(matches: &ArgMatches, stdout: &mut Out) -> Result<(), String> {
    let pid = matches.get_one::<i32>("pid").copied().unwrap_or_default();
    let signal = matches.get_one::<i32>("signal").copied().unwrap_or_else(|| {
        signal::default_dump_signal(signal::default_level_signal())
    });

    signal::raise_dump(pid, signal).map_err(|error| format!("signal {signal} to {pid}: {error}"))?;
    writeln!(stdout, "requested dump from {pid} (signal {signal})").map_err(|error| error.to_string())
}

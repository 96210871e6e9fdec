//! Bedsense CLI
//!
//! Usage:
//!   bedsense --replay sensor.log                # Replay a recorded log
//!   bedsense --replay - < sensor.log            # Replay from stdin
//!   bedsense --replay sensor.log --calibrate 60 # Calibrate on the first 60s
//!   bedsense --interactive                      # Type ticks and commands
//!   bedsense --serve --addr 0.0.0.0:8080        # HTTP API server
//!   bedsense --replay sensor.log --json         # JSON output

use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Read, Write};
use std::process::ExitCode;

use bedsense::config::EngineConfig;
use bedsense::core::{run_server, PresenceEngine, Replay, TickParser};
use bedsense::types::{CalibrationEvent, TickOutput};
use bedsense::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "bedsense",
    version = VERSION,
    about = "Bedsense - debounced presence from a noisy energy signal",
    long_about = "Bedsense turns a periodic energy reading (plus an optional distance)\n\
                  into a debounced presence boolean using a z-score against a\n\
                  robust baseline, hysteresis thresholds and two debounce timers.\n\n\
                  Log line format:\n  \
                  t=<ms> energy=<float> [distance=<float>]\n\n\
                  States:\n  \
                  IDLE           - No presence\n  \
                  DEBOUNCING_ON  - Strong signal, waiting out on-debounce\n  \
                  PRESENT        - Presence confirmed\n  \
                  DEBOUNCING_OFF - Weak signal, waiting out off-debounce"
)]
struct Args {
    /// Replay a log file ("-" for stdin)
    #[arg(short, long)]
    replay: Option<String>,

    /// Interactive mode - tick lines and :commands from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Engine config (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Start a baseline calibration of this many seconds at the first tick
    #[arg(long)]
    calibrate: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Print every tick and debug logs
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match &args.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {}", "config error:".red(), e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let result = if args.serve {
        run_server(&args.addr, config).await
    } else if let Some(ref path) = args.replay {
        run_replay(path, &config, &args)
    } else {
        if !args.interactive {
            tracing::debug!("no mode given, starting interactive session");
        }
        run_interactive(&config, &args)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays parseable
fn init_tracing(verbose: bool) {
    let default = if verbose { "bedsense=debug" } else { "bedsense=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Replay a whole log
fn run_replay(path: &str, config: &EngineConfig, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let input = if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };

    let ticks = TickParser::new().parse_all(&input)?;
    tracing::info!(ticks = ticks.len(), "replaying log");

    let mut replay = Replay::new(config.build_engine());
    if let Some(secs) = args.calibrate {
        replay = replay.with_calibration(secs);
    }

    for tick in ticks {
        let output = replay.feed(tick);
        if args.verbose || output.is_noteworthy() {
            print_output(&output, args)?;
        }
    }

    let report = replay.finish();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("{}", format!("Bedsense v{} - replay summary", VERSION).bold());
        println!("  ticks:       {} ({} admitted)", report.ticks, report.admitted);
        println!("  transitions: {}", report.transitions.len());
        for event in &report.calibrations {
            println!("  calibration: {}", describe_calibration(event));
        }
        let status = &report.final_status;
        println!(
            "  final:       {} presence={} baseline μ={:.2} σ={:.2}",
            status.state.paint(&status.state.to_string()),
            if status.presence { "on" } else { "off" },
            status.baseline.mean,
            status.baseline.spread
        );
        println!("  reason:      {} ({})", status.reason, status.change_reason.code());
    }
    Ok(())
}

/// Interactive mode: tick lines plus :commands, clock taken from the last tick
fn run_interactive(config: &EngineConfig, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let parser = TickParser::new();
    let mut engine = config.build_engine();
    let mut now_ms: u64 = 0;

    print_header(args.no_color);
    println!("Enter ticks as 't=<ms> energy=<x> [distance=<d>]' or a command:");
    println!("  :calibrate <secs>  :stop  :reset  :set <param> <value>  :status  :quit");
    println!();

    if let Some(secs) = args.calibrate {
        let event = engine.start_calibration(secs, now_ms);
        println!("{}", describe_calibration(&event));
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line_no = 0;

    loop {
        print!("{} > ", engine.state().paint(&format!("[{}]", engine.state())));
        stdout.flush()?;

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        line_no += 1;
        let line = line.trim();

        if let Some(command) = line.strip_prefix(':') {
            if !run_command(command, &mut engine, now_ms, args)? {
                break;
            }
            continue;
        }

        match parser.parse_line(line_no, line) {
            Ok(Some(tick)) => {
                now_ms = tick.now_ms;
                let mut output = engine.tick(tick);
                if !output.admitted {
                    output.calibration = engine.poll(now_ms);
                }
                print_output(&output, args)?;
            }
            Ok(None) => {}
            Err(e) => println!("{}", e.to_string().yellow()),
        }
    }

    println!("\nSession ended. State: {}", engine.state());
    Ok(())
}

/// Run one :command. Returns false to quit.
fn run_command(
    command: &str,
    engine: &mut PresenceEngine,
    now_ms: u64,
    args: &Args,
) -> Result<bool, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = command.split_whitespace().collect();
    match parts.as_slice() {
        ["quit"] | ["exit"] => return Ok(false),
        ["calibrate", secs] => match secs.parse::<u32>() {
            Ok(secs) => println!("{}", describe_calibration(&engine.start_calibration(secs, now_ms))),
            Err(_) => println!("{}", "usage: :calibrate <secs>".yellow()),
        },
        ["stop"] => println!("{}", describe_calibration(&engine.stop_calibration())),
        ["reset"] => {
            engine.reset_to_defaults();
            println!("{}", engine.reason());
        }
        ["set", name, value] => {
            if !apply_setting(engine, name, value) {
                println!("{}", format!("cannot set {} = {}", name, value).yellow());
            }
        }
        ["status"] => {
            let status = engine.status();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!(
                    "{} presence={} μ={:.2} σ={:.2} k_on={:.2} k_off={:.2} | {}",
                    status.state,
                    status.presence,
                    status.baseline.mean,
                    status.baseline.spread,
                    status.params.thresholds.k_on,
                    status.params.thresholds.k_off,
                    status.reason
                );
            }
        }
        _ => println!("{}", format!("unknown command: {}", command).yellow()),
    }
    Ok(true)
}

/// Dispatch a named setter
fn apply_setting(engine: &mut PresenceEngine, name: &str, value: &str) -> bool {
    match name {
        "k_on" | "k_off" | "distance_min" | "distance_max" => {
            let Ok(v) = value.parse::<f64>() else { return false };
            match name {
                "k_on" => engine.set_k_on(v),
                "k_off" => engine.set_k_off(v),
                "distance_min" => engine.set_distance_min(v),
                _ => engine.set_distance_max(v),
            }
        }
        "on_debounce_ms" | "off_debounce_ms" | "abs_clear_delay_ms" => {
            let Ok(ms) = value.parse::<u64>() else { return false };
            match name {
                "on_debounce_ms" => engine.set_on_debounce_ms(ms),
                "off_debounce_ms" => engine.set_off_debounce_ms(ms),
                _ => engine.set_abs_clear_delay_ms(ms),
            }
        }
        _ => return false,
    }
    true
}

fn print_output(output: &TickOutput, args: &Args) -> Result<(), serde_json::Error> {
    if args.json {
        println!("{}", serde_json::to_string(output)?);
    } else if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }
    Ok(())
}

fn describe_calibration(event: &CalibrationEvent) -> String {
    match event {
        CalibrationEvent::Started { duration_s, deadline_ms } => {
            format!("started for {}s (deadline t={}ms)", duration_s, deadline_ms)
        }
        CalibrationEvent::Rejected { requested_s } => {
            format!("rejected ({}s duration)", requested_s)
        }
        CalibrationEvent::Completed(s) => format!(
            "completed on {}: μ={:.2} σ={:.2} n={}",
            s.termination, s.mean, s.spread, s.samples
        ),
        CalibrationEvent::Failed { termination } => {
            format!("failed on {}: insufficient samples", termination)
        }
        CalibrationEvent::StopIgnored => "stop ignored, no calibration running".to_string(),
    }
}

fn print_header(no_color: bool) {
    let title = format!("Bedsense v{} - Interactive", VERSION);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", title.bold());
    }
    println!();
}

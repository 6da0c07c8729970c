//! Vigil CLI - run the telemetry agent on a host machine
//!
//! Commands:
//! - run: run the tick loop with simulated sensors and an NDJSON stdout transport
//! - config: print the default configuration
//! - schema: print the sample/alert wire schemas

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use vigil_agent::console::{self, CommandError};
use vigil_agent::sensors::{NullEnvironment, PatternMotion};
use vigil_agent::transport::Transport;
use vigil_agent::{AgentConfig, AgentError, CommandReply, StatusReport, TelemetryAgent, AGENT_VERSION};

/// Vigil - data-acquisition and telemetry agent
#[derive(Parser)]
#[command(name = "vigil")]
#[command(version = AGENT_VERSION)]
#[command(about = "Sample, classify and relay telemetry with offline buffering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent tick loop
    Run {
        /// Configuration file (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Device identifier override
        #[arg(long)]
        device_id: Option<String>,

        /// Sampling cadence override (milliseconds)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Offline buffer capacity override (samples)
        #[arg(long)]
        capacity: Option<usize>,

        /// Stop after this many ticks (runs forever when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        /// Start with the link disabled (`wifi on` enables it later)
        #[arg(long)]
        offline: bool,
    },

    /// Print the default configuration as JSON
    Config,

    /// Print wire schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as a JSON schema document
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Data-topic sample object
    Sample,
    /// Alert-topic alert object
    Alert,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), VigilCliError> {
    match cli.command {
        Commands::Run {
            config,
            device_id,
            tick_ms,
            capacity,
            ticks,
            offline,
        } => cmd_run(config.as_deref(), device_id, tick_ms, capacity, ticks, offline),

        Commands::Config => {
            println!("{}", AgentConfig::default().to_json()?);
            Ok(())
        }

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_run(
    config_path: Option<&std::path::Path>,
    device_id: Option<String>,
    tick_ms: Option<u64>,
    capacity: Option<usize>,
    tick_limit: Option<u64>,
    offline: bool,
) -> Result<(), VigilCliError> {
    let mut config = match config_path {
        Some(path) => AgentConfig::from_json(&fs::read_to_string(path)?)?,
        None => AgentConfig::default(),
    };
    if let Some(device_id) = device_id {
        config.device_id = device_id;
    }
    if let Some(tick_ms) = tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if let Some(capacity) = capacity {
        config.buffer_capacity = capacity;
    }
    if offline {
        config.link_enabled = false;
    }

    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    let mut agent = TelemetryAgent::new(
        config,
        Box::new(NullEnvironment),
        Box::new(PatternMotion::rest_and_burst()),
        Box::new(StdoutTransport::new()),
    )?;

    // Operator console: only when someone is actually typing at us
    let commands = if atty::is(atty::Stream::Stdin) {
        Some(spawn_console())
    } else {
        None
    };

    let start = Instant::now();
    let mut completed = 0u64;

    loop {
        if let Some(rx) = &commands {
            while let Ok(line) = rx.try_recv() {
                let now_ms = start.elapsed().as_millis() as u64;
                apply_command_line(&mut agent, &line, now_ms);
            }
        }

        let now_ms = start.elapsed().as_millis() as u64;
        let report = agent.tick(now_ms)?;
        log::debug!(
            "tick {completed}: route={:?} drained={} buffered={}",
            report.route,
            report.drained,
            agent.buffered()
        );

        completed += 1;
        if let Some(limit) = tick_limit {
            if completed >= limit {
                break;
            }
        }
        thread::sleep(tick_interval);
    }

    Ok(())
}

/// Read operator lines on a dedicated thread so a blocking stdin read can
/// never stall the tick cadence. The agent itself stays single-threaded.
fn spawn_console() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

fn apply_command_line(agent: &mut TelemetryAgent, line: &str, now_ms: u64) {
    match console::parse(line) {
        Ok(command) => match agent.handle_command(command, now_ms) {
            CommandReply::Ack(message) => eprintln!("ok: {message}"),
            CommandReply::Help(text) => eprintln!("{text}"),
            CommandReply::Status(status) => print_status(&status),
        },
        Err(CommandError::Empty) => {}
        Err(e) => eprintln!("error: {e}"),
    }
}

fn print_status(status: &StatusReport) {
    eprintln!("Vigil Status");
    eprintln!("============");
    eprintln!("Device:    {}", status.device_id);
    eprintln!("Version:   {}", status.version);
    eprintln!("Started:   {}", status.started_at_utc.to_rfc3339());
    eprintln!("Uptime:    {} ms", status.uptime_ms);
    eprintln!("Ticks:     {}", status.ticks);
    eprintln!("Link:      {}", status.link.as_str());
    eprintln!("Buffered:  {}/{}", status.buffered, status.buffer_capacity);
    match status.manual_bpm {
        Some(bpm) => eprintln!("BPM mode:  manual ({bpm})"),
        None => eprintln!("BPM mode:  auto"),
    }
    if let Some(sample) = &status.last_sample {
        eprintln!(
            "Last:      {:.1}C {:.1}% {}bpm {:.2}g @ {} ms",
            sample.temperature, sample.humidity, sample.bpm, sample.movement, sample.timestamp
        );
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), VigilCliError> {
    match schema_type {
        SchemaType::Sample => {
            if json_schema {
                println!("{}", sample_json_schema());
            } else {
                println!("Sample object (data topic, one per tick):");
                println!();
                println!("  timestamp    integer, ms since agent start");
                println!("  temperature  float, 1 decimal, degrees C");
                println!("  humidity     float, 1 decimal, percent");
                println!("  bpm          integer, beats per minute");
                println!("  movement     float, 2 decimals, g");
                println!("  device_id    string");
                println!("  status       \"online\" | \"offline\"");
                println!("  bpm_mode     \"manual\" | \"auto\"");
            }
        }
        SchemaType::Alert => {
            if json_schema {
                println!("{}", alert_json_schema());
            } else {
                println!("Alert object (alert topic, zero or one per tick):");
                println!();
                println!("  timestamp    integer, ms since agent start");
                println!("  device_id    string");
                println!("  type         underscore-joined tags from:");
                println!("               temp_high temp_low bpm_high bpm_low humidity_high");
                println!("  message      human-readable, pipe-joined on multiple triggers");
                println!("  severity     \"warning\" | \"critical\"");
                println!("  temperature, humidity, bpm, movement: echoed sample fields");
                println!();
                println!("Alerts are not buffered: one raised while offline is dropped.");
            }
        }
    }
    Ok(())
}

fn sample_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "vigil.sample.v1",
        "type": "object",
        "required": [
            "timestamp", "temperature", "humidity", "bpm",
            "movement", "device_id", "status", "bpm_mode"
        ],
        "properties": {
            "timestamp": { "type": "integer" },
            "temperature": { "type": "number" },
            "humidity": { "type": "number" },
            "bpm": { "type": "integer" },
            "movement": { "type": "number" },
            "device_id": { "type": "string" },
            "status": { "type": "string", "enum": ["online", "offline"] },
            "bpm_mode": { "type": "string", "enum": ["manual", "auto"] }
        }
    })
    .to_string()
}

fn alert_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "vigil.alert.v1",
        "type": "object",
        "required": [
            "timestamp", "device_id", "type", "message", "severity",
            "temperature", "humidity", "bpm", "movement"
        ],
        "properties": {
            "timestamp": { "type": "integer" },
            "device_id": { "type": "string" },
            "type": { "type": "string" },
            "message": { "type": "string" },
            "severity": { "type": "string", "enum": ["warning", "critical"] },
            "temperature": { "type": "number" },
            "humidity": { "type": "number" },
            "bpm": { "type": "integer" },
            "movement": { "type": "number" }
        }
    })
    .to_string()
}

/// Transport that frames each publish as one NDJSON line on stdout:
/// `{"topic": ..., "data": {...}}`. Connectivity is simulated; the
/// operator's `wifi on|off` is what exercises the offline path.
struct StdoutTransport {
    stdout: io::Stdout,
}

impl StdoutTransport {
    fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }
}

impl Transport for StdoutTransport {
    fn connect(&mut self, client_id: &str) -> bool {
        log::info!("stdout transport session open for {client_id}");
        true
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        let data: serde_json::Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(_) => return false,
        };
        let line = serde_json::json!({ "topic": topic, "data": data });
        let mut handle = self.stdout.lock();
        writeln!(handle, "{line}").is_ok() && handle.flush().is_ok()
    }

    fn disconnect(&mut self) {
        log::info!("stdout transport session closed");
    }
}

// Error types

#[derive(Debug)]
enum VigilCliError {
    Io(io::Error),
    Agent(AgentError),
    Json(serde_json::Error),
}

impl std::fmt::Display for VigilCliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VigilCliError::Io(e) => write!(f, "{e}"),
            VigilCliError::Agent(e) => write!(f, "{e}"),
            VigilCliError::Json(e) => write!(f, "{e}"),
        }
    }
}

impl From<io::Error> for VigilCliError {
    fn from(e: io::Error) -> Self {
        VigilCliError::Io(e)
    }
}

impl From<AgentError> for VigilCliError {
    fn from(e: AgentError) -> Self {
        VigilCliError::Agent(e)
    }
}

impl From<serde_json::Error> for VigilCliError {
    fn from(e: serde_json::Error) -> Self {
        VigilCliError::Json(e)
    }
}

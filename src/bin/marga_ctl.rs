//! Command-line client for a running MargaNav daemon.
//!
//! ```text
//! marga-ctl add 10 20 5 --yaw 1.57 --index 0
//! marga-ctl remove 2
//! marga-ctl list
//! marga-ctl watch --count 4
//! ```

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use marga_nav::client::{SequencerClient, TelemetrySubscriber};
use marga_nav::core::types::Waypoint;
use marga_nav::error::Result;
use marga_nav::sequencer::InsertPosition;
use marga_nav::streaming::{Telemetry, WireFormat, create_serializer};

#[derive(Parser)]
#[command(name = "marga-ctl")]
#[command(about = "Edit and inspect the waypoint list of a MargaNav daemon")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Daemon command address
    #[arg(short, long, default_value = "127.0.0.1:5600")]
    address: String,

    /// Daemon telemetry address (watch only)
    #[arg(long, default_value = "127.0.0.1:5602")]
    publish_address: String,

    /// Wire format configured on the daemon
    #[arg(long, value_enum, default_value = "json")]
    format: FormatArg,

    /// Connect and reply timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Postcard,
}

impl From<FormatArg> for WireFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => WireFormat::Json,
            FormatArg::Postcard => WireFormat::Postcard,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a waypoint
    Add {
        x: f64,
        y: f64,
        /// Altitude, positive up
        altitude: f64,

        #[arg(long, default_value_t = 0.0)]
        yaw: f64,

        /// Insertion index (-1 appends)
        #[arg(long, default_value_t = InsertPosition::APPEND_SENTINEL, allow_negative_numbers = true)]
        index: i64,
    },

    /// Remove the waypoint at an index
    Remove {
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },

    /// Print the waypoint list
    List,

    /// Print the current index and target
    Status,

    /// Ask the daemon to load waypoints from a file
    LoadFile { path: String },

    /// Stream target and relative pose telemetry
    Watch {
        /// Stop after this many messages
        #[arg(short, long)]
        count: Option<usize>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let serializer = create_serializer(args.format.into());
    let timeout = Duration::from_millis(args.timeout_ms);

    if let Commands::Watch { count } = args.command {
        let mut subscriber = TelemetrySubscriber::connect(&args.publish_address, serializer, timeout)?;
        let mut seen = 0;
        while count.is_none_or(|limit| seen < limit) {
            let Some(message) = subscriber.recv()? else {
                continue;
            };
            print_telemetry(&message);
            seen += 1;
        }
        return Ok(());
    }

    let mut client = SequencerClient::connect(&args.address, serializer, timeout)?;

    match args.command {
        Commands::Add {
            x,
            y,
            altitude,
            yaw,
            index,
        } => {
            let count = client.add_waypoint(Waypoint::new(x, y, altitude, yaw), index)?;
            println!("{} waypoints", count);
        }
        Commands::Remove { index } => {
            let count = client.remove_waypoint(index)?;
            println!("{} waypoints", count);
        }
        Commands::List => {
            let status = client.status()?;
            for (i, wp) in client.list_waypoints()?.iter().enumerate() {
                let marker = if i as u32 == status.current_index { '*' } else { ' ' };
                println!(
                    "{} {:>3}  x={:.2} y={:.2} alt={:.2} yaw={:.3}",
                    marker, i, wp.x, wp.y, wp.altitude, wp.yaw
                );
            }
        }
        Commands::Status => {
            let status = client.status()?;
            let wp = status.current_target;
            println!(
                "waypoint {}/{} -> x={:.2} y={:.2} alt={:.2} yaw={:.3}",
                status.current_index, status.waypoint_count, wp.x, wp.y, wp.altitude, wp.yaw
            );
            println!(
                "threshold {:.2} m, {}",
                status.threshold,
                if status.cyclical { "cyclic" } else { "clamped" }
            );
        }
        Commands::LoadFile { path } => {
            let count = client.set_waypoints_from_file(&path)?;
            println!("{} waypoints", count);
        }
        Commands::Watch { .. } => {}
    }

    Ok(())
}

fn print_telemetry(message: &Telemetry) {
    match message {
        Telemetry::Target(cmd) => println!(
            "[{}] t={} x={:.2} y={:.2} alt={:.2} yaw={:.3} mode={}",
            message.topic(),
            cmd.timestamp_us,
            cmd.x,
            cmd.y,
            cmd.altitude,
            cmd.yaw,
            cmd.mode.code()
        ),
        Telemetry::RelativePose(pose) => println!(
            "[{}] x={:.2} y={:.2} alt={:.2} yaw={:.3}",
            message.topic(),
            pose.x,
            pose.y,
            pose.altitude,
            pose.yaw
        ),
    }
}

//! remcam operator client — entry point.
//!
//! ```text
//! remcam-ctl begin                                Open a session, print its id
//! remcam-ctl capture -s <id> -o brightness=70     Capture with options
//! remcam-ctl end -s <id>                          Close the session
//! remcam-ctl kill -s <id>                         Terminate the server
//! remcam-ctl --host 10.0.0.5 --port 4560 ...      Pick the broker endpoint
//! ```
//!
//! The process exit code mirrors the broker's answer: 0 on `Success`,
//! non-zero on `Failure` or a transport error.

use std::collections::BTreeMap;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use remcam_core::{options, ConnectionInfo, OptionValue};

mod client;
use client::{CamClient, Reply};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "remcam-ctl", about = "remcam broker operator client")]
struct Cli {
    /// Broker host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Broker port.
    #[arg(short, long, default_value_t = 4560)]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a session and print the issued id.
    Begin,
    /// Capture a still under an open session.
    Capture {
        /// Session id issued by `begin`.
        #[arg(short, long)]
        session: Uuid,
        /// Capture options as name=value pairs (repeatable).
        #[arg(short = 'o', long = "option", value_parser = parse_option)]
        options: Vec<(String, OptionValue)>,
    },
    /// Close the session.
    End {
        #[arg(short, long)]
        session: Uuid,
    },
    /// Terminate the server and its worker pool.
    Kill {
        #[arg(short, long)]
        session: Uuid,
    },
}

/// Parse `name=value`; numeric values become integers, everything else
/// stays text.
fn parse_option(raw: &str) -> Result<(String, OptionValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got \"{raw}\""))?;
    let value = match value.parse::<i64>() {
        Ok(v) => OptionValue::Int(v),
        Err(_) => OptionValue::Text(value.to_string()),
    };
    Ok((name.to_string(), value))
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let info = ConnectionInfo::new(cli.host.clone(), cli.port);

    let mut client = match CamClient::connect(&info).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("could not connect to {info}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Begin => client.begin_session().await,
        Command::Capture { session, options } => {
            let options: BTreeMap<String, OptionValue> = options.into_iter().collect();
            // Fail fast on options the broker would reject anyway.
            if let Err(e) = options::validate(&options) {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
            client.command(session, options).await
        }
        Command::End { session } => client.end_session(session).await,
        Command::Kill { session } => client.kill_server(session).await,
    };

    let reply = match result {
        Ok(reply) => reply,
        Err(e) => {
            eprintln!("request failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    report(&reply)
}

fn report(reply: &Reply) -> ExitCode {
    println!("{}: {}", reply.body.exit_code, reply.body.msg);
    if reply.body.exit_code.is_success() {
        if let Some(id) = reply.session_id {
            println!("session: {id}");
        }
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

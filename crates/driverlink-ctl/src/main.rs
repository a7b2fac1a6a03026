//! driverlink-ctl: command-line interface for the DriverLink daemon.

mod cmd;

use anyhow::{Context, Result};

use cmd::notifications::{cmd_clear, cmd_dismiss, cmd_notifications};
use cmd::session::{cmd_ack_expired, cmd_connect, cmd_login, cmd_logout};
use cmd::status::cmd_status;

const DEFAULT_PORT: u16 = 9011;

fn print_usage() {
    println!("Usage: driverlink-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status              Show session state");
    println!("  notifications       List pending ride offers");
    println!("  dismiss <ride_id>   Remove one ride offer");
    println!("  clear               Remove all ride offers");
    println!("  login <token>       Hand a fresh access token to the session");
    println!("  ack-expired         Clear the session-expired flag");
    println!("  connect             Try to connect now");
    println!("  logout              Log out and wipe stored credentials");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | []                => cmd_status(port).await,
        ["notifications"]              => cmd_notifications(port).await,
        ["dismiss", ride_id]           => cmd_dismiss(port, ride_id).await,
        ["clear"]                      => cmd_clear(port).await,
        ["login", token]               => cmd_login(port, token).await,
        ["ack-expired"]                => cmd_ack_expired(port).await,
        ["connect"]                    => cmd_connect(port).await,
        ["logout"]                     => cmd_logout(port).await,
        ["help"] | ["--help"] | ["-h"] => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

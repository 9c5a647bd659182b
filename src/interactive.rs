//! Interactive monitor.
//!
//! Terminal front end for a [`MonitorSession`]: the user picks a network,
//! enters an address and an optional low-balance threshold, then runs manual
//! checks or toggles monitoring. Timer results are printed as they arrive.
//!
//! # Commands
//!
//! - `networks` - list networks and their keys
//! - `network <key>` - select a network
//! - `address [addr]` - set the wallet address, or clear it
//! - `threshold [amount]` - set the low balance alert, or clear it
//! - `check` - check the balance once
//! - `start` / `stop` / `toggle` - control monitoring
//! - `status` - show the current session
//! - `help`, `quit`

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::AppError;
use crate::monitor::Notification;
use crate::networks::{NetworkDescriptor, Registry};
use crate::rpc::ChainRpc;
use crate::session::{MonitorEvent, MonitorSession, TimerEvent, Update};
use crate::utils;

/// Startup settings of an interactive session.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub network: Option<String>,
    pub address: Option<String>,
    pub threshold: Option<Decimal>,
    pub interval: Duration,
}

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Help,
    /// List networks, testnets included when `true`.
    Networks(bool),
    Network(String),
    Address(String),
    Threshold(Option<Decimal>),
    Check,
    Start,
    Stop,
    Toggle,
    Status,
    Quit,
}

const HELP: &str = "These commands are supported:
  networks [mainnet]  list networks and their keys (mainnet: hide testnets)
  network <key>       select a network
  address [addr]      set the wallet address (no argument clears it)
  threshold [amount]  set the low balance alert (no argument clears it)
  check               check the balance once
  start | stop        start or stop monitoring
  toggle              start monitoring if idle, stop it otherwise
  status              show the current session
  help                display this text
  quit                leave the monitor";

/// Parses one input line. Blank lines yield `Ok(None)`.
fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "networks" | "list" => match arg.to_ascii_lowercase().as_str() {
            "" | "all" => Command::Networks(true),
            "mainnet" | "mainnets" => Command::Networks(false),
            _ => return Err("Usage: networks [all|mainnet]".to_string()),
        },
        "network" | "net" => {
            if arg.is_empty() {
                return Err("Usage: network <key>".to_string());
            }
            Command::Network(arg.to_string())
        }
        "address" | "addr" => Command::Address(arg.to_string()),
        "threshold" => {
            if arg.is_empty() {
                Command::Threshold(None)
            } else {
                Command::Threshold(Some(utils::parse_threshold(arg).map_err(|e| e.to_string())?))
            }
        }
        "check" | "balance" => Command::Check,
        "start" => Command::Start,
        "stop" => Command::Stop,
        "toggle" | "monitor" => Command::Toggle,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{other}', type `help` for the list")),
    };
    Ok(Some(command))
}

/// Runs the interactive monitor on stdin/stdout until `quit` or end of input.
pub async fn run(
    rpc: Arc<dyn ChainRpc>,
    registry: Registry,
    options: MonitorOptions,
) -> Result<(), AppError> {
    let network = match options.network {
        Some(key) => registry
            .find(&key)
            .cloned()
            .ok_or(AppError::UnknownNetwork(key))?,
        None => registry
            .default_network()
            .cloned()
            .ok_or_else(|| AppError::UnknownNetwork("<none configured>".to_string()))?,
    };

    let (mut session, mut events) = MonitorSession::new(rpc, network, options.interval);
    if let Some(address) = options.address {
        session.set_address(&address).await;
    }
    session.set_threshold(options.threshold).await;

    println!("Blockchain Wallet Balance Monitor");
    println!("{HELP}\n");
    print_status(&session).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    log::debug!("End of input, leaving monitor");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => execute(&mut session, &registry, command).await,
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                }
            }
            Some(event) = events.recv() => print_event(&session, event).await,
        }
    }

    session.stop().await;
    log::info!("Monitor session closed");
    Ok(())
}

async fn execute(session: &mut MonitorSession, registry: &Registry, command: Command) {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Networks(include_testnets) => {
            for line in network_listing(registry, include_testnets) {
                println!("{line}");
            }
        }
        Command::Network(key) => match registry.find(&key) {
            Some(network) => {
                let was_monitoring = session.is_monitoring().await;
                session.select_network(network.clone()).await;
                if was_monitoring {
                    println!("Monitoring stopped.");
                }
                println!("Selected {} ({}).", network.name, network.symbol);
            }
            None => println!("{}", AppError::UnknownNetwork(key)),
        },
        Command::Address(address) => {
            let was_monitoring = session.is_monitoring().await;
            session.set_address(&address).await;
            if was_monitoring && !session.is_monitoring().await {
                println!("Monitoring stopped.");
            }
            if address.is_empty() {
                println!("Address cleared.");
            } else {
                let network = session.network().await;
                if !network.family().is_valid_address(&address) {
                    println!("Note: this is not a valid {} address.", network.family());
                }
                println!("Address set to {address}.");
            }
        }
        Command::Threshold(threshold) => {
            session.set_threshold(threshold).await;
            let symbol = session.network().await.symbol;
            match threshold {
                Some(value) => println!(
                    "Low balance threshold set to {}.",
                    utils::format_amount(value, &symbol)
                ),
                None => println!("Low balance threshold cleared."),
            }
        }
        Command::Check => match session.check().await {
            Ok(update) => print_update(session, &update).await,
            Err(e) => print_error(&e.to_string()),
        },
        Command::Start => start(session).await,
        Command::Stop => {
            session.stop().await;
            println!("Monitoring stopped.");
        }
        Command::Toggle => match session.toggle().await {
            Ok(Some(update)) => started(session, &update).await,
            Ok(None) => println!("Monitoring stopped."),
            Err(e) => print_error(&e.to_string()),
        },
        Command::Status => print_status(session).await,
        Command::Quit => {}
    }
}

async fn start(session: &mut MonitorSession) {
    match session.start().await {
        Ok(update) => started(session, &update).await,
        Err(e) => print_error(&e.to_string()),
    }
}

async fn started(session: &MonitorSession, update: &Update) {
    println!(
        "Monitoring balance every {} seconds.",
        session.interval().as_secs()
    );
    print_update(session, update).await;
}

fn network_listing(registry: &Registry, include_testnets: bool) -> Vec<String> {
    registry.all(include_testnets).map(describe_network).collect()
}

pub(crate) fn describe_network(network: &NetworkDescriptor) -> String {
    format!(
        "{:>10}  {} ({}){}",
        network.key,
        network.name,
        network.symbol,
        if network.is_testnet { " [testnet]" } else { "" }
    )
}

async fn print_status(session: &MonitorSession) {
    let network = session.network().await;
    let state = session.snapshot().await;
    println!("Network:    {} ({})", network.name, network.symbol);
    println!(
        "Address:    {}",
        if state.address.is_empty() { "<not set>" } else { state.address.as_str() }
    );
    match state.threshold {
        Some(threshold) => println!(
            "Threshold:  {}",
            utils::format_amount(threshold, &network.symbol)
        ),
        None => println!("Threshold:  <not set>"),
    }
    println!(
        "Monitoring: {}",
        if state.active {
            format!("every {} seconds", session.interval().as_secs())
        } else {
            "off".to_string()
        }
    );
    if let Some(last) = state.last.as_ref().and_then(|r| r.amount()) {
        println!("Balance:    {}", utils::format_amount(last, &network.symbol));
    }
    if let Some(error) = &state.error {
        println!("Last error: {error}");
    }
    if let Some(notification) = &state.notification {
        print_notification(notification);
    }
}

async fn print_update(session: &MonitorSession, update: &Update) {
    let network = session.network().await;
    let address = session.snapshot().await.address;
    if let Some(amount) = update.result.amount() {
        println!(
            "[{}] Wallet: {} — {}",
            utils::now_timestamp(),
            utils::shorten_address(&address),
            utils::format_amount(amount, update.result.symbol())
        );
    }
    let explorer = network.explorer.as_deref();
    if let (Some(url), Some(explorer)) = (network.address_url(&address), explorer) {
        println!("View on {}: {}", utils::explorer_host(explorer), url);
    }
    if let Some(notification) = &update.notification {
        print_notification(notification);
    }
}

async fn print_event(session: &MonitorSession, event: TimerEvent) {
    let Some(event) = session.accept(event).await else {
        return;
    };
    match event {
        MonitorEvent::Updated(update) => print_update(session, &update).await,
        MonitorEvent::Stopped { reason } => {
            print_error(&format!("Failed to fetch balance: {reason}"));
            println!("Monitoring stopped.");
        }
    }
}

fn print_notification(notification: &Notification) {
    println!("[{}] {}", utils::now_timestamp(), notification);
}

fn print_error(message: &str) {
    eprintln!("[{}] Error: {message}", utils::now_timestamp());
}

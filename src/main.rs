use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use duet_chat::cli::{parse_command, Args, Command};
use duet_chat::client::ChatClient;
use duet_chat::config::{load_server_config, ChatConfig, RoleModels};
use duet_chat::render::TerminalRenderer;
use duet_chat::{new_controls, DialogDriver, Halt, SharedControls};

fn print_help() {
    println!("{}", "DUET CHAT".bright_cyan().bold());
    println!("Commands:");
    println!("  start         begin a new dialog");
    println!("  pause         pause after the current turn finishes");
    println!("  continue      resume a paused dialog");
    println!("  rounds <n>    set the round limit for upcoming turns");
    println!("  world <text>  set the world-setting context");
    println!("  quit          exit");
}

fn report_halt(halt: Halt) {
    match halt {
        // Same affordance either way: type `continue` to keep going.
        Halt::Paused => println!("\n{}", "dialog paused, `continue` to resume".bright_green()),
        Halt::RoundsExhausted => {
            println!("\n{}", "round limit reached, `continue` to resume".bright_green())
        }
        Halt::Failed => println!("\n{}", "turn failed, `continue` to retry".bright_red()),
    }
}

/// Background task reading stdin lines. Pause, rounds, and world edits land
/// directly in the shared control inputs so they take effect while a dialog
/// is running; start/continue/quit are forwarded to the main loop.
async fn command_reader(tx: mpsc::UnboundedSender<Command>, controls: SharedControls) {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let Some(command) = parse_command(&line) else {
            print_help();
            continue;
        };
        match command {
            Command::Pause => {
                controls
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .pause_requested = true;
                println!("{}", "pausing after the current turn...".bright_yellow());
            }
            Command::Rounds(rounds) => {
                controls.lock().unwrap_or_else(|e| e.into_inner()).rounds_input = rounds;
            }
            Command::World(world) => {
                controls.lock().unwrap_or_else(|e| e.into_inner()).world_setting = world;
                println!("{}", "world setting updated".bright_yellow());
            }
            Command::Start | Command::Continue => {
                controls
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .pause_requested = false;
                if tx.send(command).is_err() {
                    return;
                }
            }
            Command::Quit => {
                let _ = tx.send(Command::Quit);
                return;
            }
        }
    }
}

/// Discard start/continue lines the user typed while a dialog was running.
/// Replaying them would chain restarts the user never asked for; the next
/// dialog only starts from a command typed after the halt was reported. A
/// queued quit is still honored.
fn drain_stale_commands(rx: &mut mpsc::UnboundedReceiver<Command>) -> bool {
    let mut quit = false;
    while let Ok(command) = rx.try_recv() {
        if command == Command::Quit {
            quit = true;
        }
    }
    quit
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let client = ChatClient::new(&args.server);
    let mut config = ChatConfig::default();
    let mut roles = RoleModels::default();
    load_server_config(&client, &mut config, &mut roles).await;

    let controls = new_controls();
    {
        let mut inputs = controls.lock().unwrap_or_else(|e| e.into_inner());
        inputs.rounds_input = args.rounds;
        inputs.world_setting = args.world.clone().unwrap_or_default();
    }

    let mut driver = DialogDriver::new(
        client,
        config,
        roles,
        TerminalRenderer::new(),
        Arc::clone(&controls),
    );

    if args.auto {
        let halt = driver.run_dialog(false).await;
        report_halt(halt);
        return Ok(());
    }

    print_help();
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(command_reader(tx, Arc::clone(&controls)));

    while let Some(command) = rx.recv().await {
        match command {
            Command::Start => {
                let halt = driver.run_dialog(false).await;
                report_halt(halt);
                if drain_stale_commands(&mut rx) {
                    break;
                }
            }
            Command::Continue => {
                let halt = driver.run_dialog(true).await;
                report_halt(halt);
                if drain_stale_commands(&mut rx) {
                    break;
                }
            }
            Command::Quit => break,
            // Pause/rounds/world are handled by the reader task.
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_discards_queued_start_and_continue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Command::Start).expect("send");
        tx.send(Command::Continue).expect("send");
        assert!(!drain_stale_commands(&mut rx));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drain_honors_queued_quit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Command::Continue).expect("send");
        tx.send(Command::Quit).expect("send");
        assert!(drain_stale_commands(&mut rx));
    }

    #[test]
    fn test_drain_empty_queue_keeps_running() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<Command>();
        assert!(!drain_stale_commands(&mut rx));
    }
}

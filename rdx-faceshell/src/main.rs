use anyhow::{bail, Context, Result};
use cautionface::prelude::*;
use cautionface::{FACE_NAME, VERSION as LIB_VERSION};
use chrono::{Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Highlights the command word in bold and its arguments in plain yellow.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// One parsed line of shell input.
#[derive(Debug, PartialEq)]
enum ShellCommand {
    Show,
    Hide,
    Ambient(bool),
    LowBit(bool),
    Timezone(Tz),
    Add {
        start_min: i64,
        duration_min: i64,
        color: Rgb,
    },
    Clear,
    Reload,
    Tick,
    Surface { width: f32, height: f32 },
    Frames(bool),
    List,
    Help,
    Exit,
    Nothing,
}

fn parse_switch(arg: Option<&&str>, usage: &str) -> Result<bool> {
    match arg {
        Some(&"on") => Ok(true),
        Some(&"off") => Ok(false),
        _ => bail!("Usage: {}", usage),
    }
}

fn parse_command(line: &str) -> Result<ShellCommand> {
    let args = line.split_whitespace().collect::<Vec<_>>();
    let Some(command) = args.first() else {
        return Ok(ShellCommand::Nothing);
    };
    let parsed = match *command {
        "show" => ShellCommand::Show,
        "hide" => ShellCommand::Hide,
        "ambient" => ShellCommand::Ambient(parse_switch(args.get(1), "ambient on|off")?),
        "lowbit" => ShellCommand::LowBit(parse_switch(args.get(1), "lowbit on|off")?),
        "frames" => ShellCommand::Frames(parse_switch(args.get(1), "frames on|off")?),
        "tz" => {
            let Some(name) = args.get(1) else {
                bail!("Usage: tz <ZONE>");
            };
            match name.parse::<Tz>() {
                Ok(timezone) => ShellCommand::Timezone(timezone),
                Err(e) => bail!("Unknown timezone '{}': {}", name, e),
            }
        }
        "add" => {
            let [_, start, duration, color] = args.as_slice() else {
                bail!("Usage: add <START_MIN> <DURATION_MIN> <#RRGGBB>");
            };
            ShellCommand::Add {
                start_min: start
                    .parse()
                    .with_context(|| format!("'{}' is not a number of minutes", start))?,
                duration_min: duration
                    .parse()
                    .with_context(|| format!("'{}' is not a number of minutes", duration))?,
                color: color.parse()?,
            }
        }
        "surface" => {
            let [_, width, height] = args.as_slice() else {
                bail!("Usage: surface <WIDTH> <HEIGHT>");
            };
            ShellCommand::Surface {
                width: width
                    .parse()
                    .with_context(|| format!("'{}' is not a width", width))?,
                height: height
                    .parse()
                    .with_context(|| format!("'{}' is not a height", height))?,
            }
        }
        "clear" => ShellCommand::Clear,
        "reload" => ShellCommand::Reload,
        "tick" => ShellCommand::Tick,
        "list" => ShellCommand::List,
        "help" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => bail!("Unknown command: '{}'. Type 'help'.", other),
    };
    Ok(parsed)
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    let rule = "-".repeat(64);
    println!("{}", FACE_NAME.cyan().bold());
    println!("{}", rule.dimmed());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license.".dimmed()
    );
    println!("{}", rule.dimmed());
}

fn print_help() {
    println!("Available commands:");
    println!("  show | hide               - Makes the face visible or hides it.");
    println!("  ambient on|off            - Enters or leaves ambient mode.");
    println!("  lowbit on|off             - Sets the low-bit ambient property.");
    println!("  tz <ZONE>                 - Switches timezone, e.g. 'tz Europe/Paris'.");
    println!("  add <START> <DUR> <COLOR> - Adds an event START minutes from now.");
    println!("  clear                     - Removes every event from the calendar.");
    println!("  reload                    - Reloads events now.");
    println!("  tick                      - Delivers a host time tick.");
    println!("  surface <W> <H>           - Resizes the drawing surface.");
    println!("  frames on|off             - Prints every rendered frame.");
    println!("  list                      - Shows the events in the next twelve hours.");
    println!("  exit                      - Quits the shell.");
}

/// Spawns tasks that print what the engine broadcasts.
fn spawn_event_listeners(face: &FaceHandle, is_listening_to_frames: Arc<AtomicBool>) {
    let mut system_rx = face.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            println!("\n<-- [SYSTEM EVENT] {:?}\n>> ", event);
        }
    });

    let mut frame_rx = face.subscribe_frames();
    tokio::spawn(async move {
        while let Ok(frame) = frame_rx.recv().await {
            if is_listening_to_frames.load(Ordering::Relaxed) {
                let wedges = frame
                    .ops
                    .iter()
                    .filter(|op| {
                        matches!(op, DrawOp::Path { paint, .. } if paint.style == PaintStyle::Stroke)
                    })
                    .count();
                println!(
                    "<-- [FRAME] {} {:?}: {} ops, {} wedges",
                    frame.at.format("%a %H:%M:%S %Z"),
                    frame.mode,
                    frame.ops.len(),
                    wedges
                );
            }
        }
    });
}

fn list_events(calendar: &MemoryCalendar, window: ChronoDuration) -> Result<()> {
    let now = Utc::now();
    let events = calendar.events_between(now, now + window)?;
    if events.is_empty() {
        println!("No events in the next {} hours.", window.num_hours());
        return Ok(());
    }
    println!("Events:");
    for event in &events {
        println!(
            "  {} .. {}  {}",
            event.begin().format("%H:%M"),
            event.end().format("%H:%M"),
            event.color()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = FaceConfig::load(None)?;
    let window = config.window();
    let calendar = Arc::new(MemoryCalendar::new(config.palette.event_fill_default));
    let clock = Arc::new(SystemClock::from_env(config.timezone));
    let (engine, face) = FaceEngine::new(config, Arc::clone(&calendar), clock);

    let is_listening_to_frames = Arc::new(AtomicBool::new(false));
    spawn_event_listeners(&face, is_listening_to_frames.clone());

    info!("Spawning {} in the background...", FACE_NAME.cyan());
    tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));
    let mut properties = FaceProperties::default();

    println!(
        "{} is running. Type 'help' for commands or 'exit' to quit.",
        FACE_NAME.cyan()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting faceshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("Error: {:#}", e);
                continue;
            }
        };
        match command {
            ShellCommand::Show => {
                face.visibility_changed(true);
            }
            ShellCommand::Hide => {
                face.visibility_changed(false);
            }
            ShellCommand::Ambient(ambient) => {
                face.ambient_mode_changed(ambient);
            }
            ShellCommand::LowBit(low_bit) => {
                properties.low_bit_ambient = low_bit;
                face.properties_changed(properties);
            }
            ShellCommand::Timezone(timezone) => {
                face.timezone_changed(Some(timezone));
                println!("--> Timezone set to {}.", timezone);
            }
            ShellCommand::Add {
                start_min,
                duration_min,
                color,
            } => {
                let begin = Utc::now() + ChronoDuration::minutes(start_min);
                let end = begin + ChronoDuration::minutes(duration_min);
                calendar.insert(EventRecord::timed(begin, end, color));
                println!(
                    "--> Added {} event at {}. Use 'reload' to show it.",
                    color,
                    begin.format("%H:%M")
                );
            }
            ShellCommand::Clear => {
                calendar.clear();
                println!("--> Calendar cleared.");
            }
            ShellCommand::Reload => {
                face.request_reload();
            }
            ShellCommand::Tick => {
                face.time_tick();
            }
            ShellCommand::Surface { width, height } => {
                face.surface_changed(width, height);
            }
            ShellCommand::Frames(on) => {
                is_listening_to_frames.store(on, Ordering::Relaxed);
                let verb = if on { "Started" } else { "Stopped" };
                println!("--> {} printing frames.", verb);
            }
            ShellCommand::List => {
                if let Err(e) = list_events(&calendar, window) {
                    println!("Error: {:#}", e);
                }
            }
            ShellCommand::Help => print_help(),
            ShellCommand::Exit => break,
            ShellCommand::Nothing => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_switches() {
        assert_eq!(parse_command("ambient on").unwrap(), ShellCommand::Ambient(true));
        assert_eq!(parse_command("frames off").unwrap(), ShellCommand::Frames(false));
        assert!(parse_command("lowbit maybe").is_err());
    }

    #[test]
    fn parses_add() {
        assert_eq!(
            parse_command("add 30 90 #e53935").unwrap(),
            ShellCommand::Add {
                start_min: 30,
                duration_min: 90,
                color: Rgb::new(0xE5, 0x39, 0x35),
            }
        );
        assert!(parse_command("add 30 #e53935").is_err());
        assert!(parse_command("add soon 90 #e53935").is_err());
    }

    #[test]
    fn parses_timezone() {
        assert_eq!(
            parse_command("tz Europe/Paris").unwrap(),
            ShellCommand::Timezone(chrono_tz::Europe::Paris)
        );
        assert!(parse_command("tz Mars/Olympus").is_err());
    }

    #[test]
    fn blank_lines_do_nothing() {
        assert_eq!(parse_command("   ").unwrap(), ShellCommand::Nothing);
        assert!(parse_command("dance").is_err());
    }
}

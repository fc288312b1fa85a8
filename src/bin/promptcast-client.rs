use std::env;
use std::io::Write;
use std::sync::Arc;

use promptcast::lifecycle::{session, ControllerSettings, SessionHandle, ViewUpdate};
use promptcast::logger::{self, LogLevel, LoggerConfig};
use promptcast::{ApiClient, ClientConfig, LifecycleState};
use tokio::io::{AsyncBufReadExt, BufReader};

const BAR_WIDTH: usize = 24;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();

    let log_config = if env::var("LOG_LEVEL").is_ok() {
        LoggerConfig::from_env()
    } else {
        LoggerConfig::new().with_level(LogLevel::Warn)
    };
    logger::init_with_config(log_config)?;

    let config = ClientConfig::from_env();
    let api = Arc::new(ApiClient::new(&config));
    log::info!("Using image server at {}", api.endpoint());

    let (driver, handle, mut updates) = session(api, ControllerSettings::from(&config));
    let driver_task = tokio::spawn(driver.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current = LifecycleState::Idle;
    print_prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "q" {
                    break;
                }
                match current {
                    LifecycleState::Idle => {
                        handle.submit(line);
                    }
                    LifecycleState::Pending { .. } => println!("Still generating, hang on..."),
                    LifecycleState::Revealing { .. } | LifecycleState::Error { .. } => {
                        if line.is_empty() || line == "r" {
                            handle.reset();
                        }
                    }
                }
            }
            Some(update) = updates.recv() => render(update, &handle, &mut current),
        }
    }

    drop(handle);
    driver_task.await?;
    Ok(())
}

fn render(update: ViewUpdate, handle: &SessionHandle, current: &mut LifecycleState) {
    match &update {
        ViewUpdate::Notice(notice) => println!("{}", notice),
        // stdin lines are consumed as they are read
        ViewUpdate::InputCleared => {}
        ViewUpdate::State(state) => {
            match state {
                LifecycleState::Idle => {
                    if !current.is_idle() {
                        println!();
                        print_prompt();
                    }
                }
                LifecycleState::Pending { deadline_ticks, .. } => {
                    print!("\r⏳ {:>3}", deadline_ticks);
                    let _ = std::io::stdout().flush();
                }
                LifecycleState::Revealing {
                    image_ref,
                    rendered,
                    ..
                } => {
                    if !rendered {
                        println!("\r🖼️  {}", image_ref);
                        // nothing to decode in a terminal, so the first render is immediate
                        handle.image_rendered();
                    }
                }
                LifecycleState::Error { kind, message } => {
                    println!("\r❌ {} ({})", message, kind);
                    println!("Press Enter to try again.");
                }
            }
            *current = state.clone();
        }
        ViewUpdate::Reveal(frame) => {
            let filled = (frame.progress * BAR_WIDTH as f32).round() as usize;
            print!(
                "\r🔎 [{}{}] blur {:>5.1}px",
                "#".repeat(filled),
                " ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
                frame.blur
            );
            let _ = std::io::stdout().flush();
            if frame.is_finished() {
                println!();
                println!("✨ Done. Press Enter to generate a new image, q to quit.");
            }
        }
    }
}

fn print_prompt() {
    println!("Type a phrase and press Enter (q to quit):");
}

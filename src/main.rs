//! Tilt Climber entry point
//!
//! `host` runs the simulation and waits for one controller to pair.
//! `controller` reads a device feed on stdin and forwards it to a host.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};

use tilt_climber::SessionCoordinator;
use tilt_climber::consts::{MAX_SUBSTEPS, SIM_DT};
use tilt_climber::input::{ControlInputMapper, DeviceEvent, parse_device_line};
use tilt_climber::pairing::{self, PeerRole};
use tilt_climber::protocol::{self, HostMessage};
use tilt_climber::settings::Settings;
use tilt_climber::transport::{self, Connection, HostListener, TransportError};

#[derive(Parser)]
#[command(name = "tilt-climber")]
#[command(about = "Vertical platform climber steered from a paired tilt controller", long_about = None)]
struct Cli {
    /// JSON settings file (defaults are used when omitted)
    #[arg(long, global = true, env = "TILT_CLIMBER_SETTINGS")]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the game and wait for a controller
    Host {
        /// Address to listen on (overrides settings)
        #[arg(long)]
        bind: Option<String>,
        /// World seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
        /// Base URL for the printed join link (overrides settings)
        #[arg(long)]
        link_base: Option<String>,
    },
    /// Pair with a host and forward tilt and jump input
    Controller {
        /// Join link printed by the host
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        link: Option<String>,
        /// Host session id (host:port)
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load_or_default(cli.settings.as_deref())?;
    match cli.command {
        Commands::Host {
            bind,
            seed,
            link_base,
        } => run_host(settings, bind, seed, link_base).await,
        Commands::Controller { link, id } => run_controller(settings, link, id).await,
    }
}

/// Next frame from the controller; never resolves while unpaired
async fn next_frame(conn: &mut Option<Connection>) -> Result<Option<String>, TransportError> {
    match conn {
        Some(conn) => conn.recv_frame().await,
        None => std::future::pending().await,
    }
}

/// Fire-and-forget delivery of host feedback
async fn send_all(conn: &mut Option<Connection>, messages: &[HostMessage]) {
    let Some(conn) = conn.as_mut() else {
        return;
    };
    for message in messages {
        if let Err(e) = conn.send(message).await {
            log::warn!("Failed to send to controller: {e}");
            return;
        }
    }
}

async fn run_host(
    mut settings: Settings,
    bind: Option<String>,
    seed: Option<u64>,
    link_base: Option<String>,
) -> Result<()> {
    if let Some(bind) = bind {
        settings.network.bind = bind;
    }
    if let Some(link_base) = link_base {
        settings.network.link_base = link_base;
    }
    let seed = seed.unwrap_or_else(rand::random);
    log::info!("Session seed {seed}");

    let listener = HostListener::bind(&settings.network.bind).await?;
    let link = pairing::join_link(&settings.network.link_base, &listener.session_id())
        .context("network.link_base is not a usable URL")?;
    log::info!("Open this link on the controller: {link}");

    let mut session = SessionCoordinator::new(settings, seed);
    let mut controller: Option<Connection> = None;

    let mut ticker = tokio::time::interval(Duration::from_secs_f32(SIM_DT));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_time = Instant::now();
    let mut accumulator = 0.0_f32;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    if session.controller_connected() {
                        log::info!("Controller {} paired", conn.peer_addr());
                        controller = Some(conn);
                    } else {
                        log::warn!("Ignoring extra controller {}", conn.peer_addr());
                        conn.close().await;
                    }
                }
                Err(e) => log::warn!("Accept failed: {e}"),
            },
            frame = next_frame(&mut controller) => match frame {
                Ok(Some(frame)) => {
                    let replies = session.handle_frame(&frame);
                    send_all(&mut controller, &replies).await;
                }
                Ok(None) => {
                    session.controller_disconnected();
                    controller = None;
                }
                Err(e) => {
                    log::warn!("Controller link failed: {e}");
                    session.controller_disconnected();
                    controller = None;
                }
            },
            now = ticker.tick() => {
                let dt = now.duration_since(last_time).as_secs_f32().min(0.1);
                last_time = now;
                accumulator += dt;

                let mut substeps = 0;
                while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                    let output = session.tick(SIM_DT);
                    send_all(&mut controller, &output.messages).await;
                    if let Some(rank) = output.game_over.and_then(|run| run.rank) {
                        log::info!("Run {} placed #{rank} this session", session.runs());
                    }
                    accumulator -= SIM_DT;
                    substeps += 1;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        }
    }

    if let Some(best) = session.high_scores().top_height() {
        log::info!("Best height this session: {best}m over {} runs", session.runs());
    }
    if let Some(conn) = controller {
        conn.close().await;
    }
    Ok(())
}

async fn run_controller(
    settings: Settings,
    link: Option<String>,
    id: Option<String>,
) -> Result<()> {
    let host_id = match (id, link) {
        (Some(id), _) => id,
        (None, Some(link)) => match pairing::role_from_link(&link)? {
            PeerRole::Controller { host_id } => host_id,
            PeerRole::Host => bail!("{link} is not a controller link"),
        },
        (None, None) => bail!("either --link or --id is required"),
    };

    let timeout = Duration::from_millis(settings.network.connect_timeout_ms);
    let mut conn = transport::connect(&host_id, timeout)
        .await
        .with_context(|| format!("pairing with {host_id} failed"))?;
    log::info!("Paired. Enter `tilt <left_right> <front_back>` or `jump` (an empty line jumps)");

    let mut mapper = ControlInputMapper::new(&settings.input);
    let mut device = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = device.next_line() => {
                let Some(line) = line? else {
                    log::info!("Device feed closed");
                    break;
                };
                let message = match parse_device_line(&line) {
                    Ok(DeviceEvent::Orientation(sample)) => mapper.on_orientation(sample),
                    Ok(DeviceEvent::Activate) => mapper.on_activate(),
                    Err(e) => {
                        log::warn!("{e}");
                        continue;
                    }
                };
                conn.send(&message).await?;
            },
            frame = conn.recv_frame() => {
                let Some(frame) = frame? else {
                    log::warn!("Host closed the connection");
                    break;
                };
                match protocol::decode_host(&frame) {
                    Ok(HostMessage::Vibrate { duration }) => log::info!("Vibrate {duration} ms"),
                    Ok(HostMessage::Score { value }) => log::info!("Height {value}"),
                    Err(e) => log::debug!("Ignoring host frame: {e}"),
                }
            },
        }
    }

    conn.close().await;
    Ok(())
}

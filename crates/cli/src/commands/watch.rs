// `festa watch` — interactive room session.
//
// Drives the full realtime loop: connect, open the room, route frames to
// the room controller and lobby router, fire the token renewal timer,
// reconnect on transport loss with the freshest token, and flush the read
// receipt on the way out.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use tracing::warn;

use festa_chat::connection::{ConnectionEvent, ConnectionManager, ConnectionState, ReconnectPolicy};
use festa_chat::http::HttpChatBackend;
use festa_chat::lobby::{LobbyNotificationRouter, LobbyUpdate};
use festa_chat::room::{RoomSessionController, RoomUpdate};
use festa_chat::session::{SessionEvent, SessionTokenManager};
use festa_chat::transport::ws::WsTransport;
use festa_common::protocol::chat::{ChatMessage, MessageKind};

use crate::commands::ConnectionArgs;

const POLL_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Room identifier.
    room_id: String,

    /// Known lifetime of the provided token, in seconds. Without it the
    /// token is traded for a fresh grant at startup.
    #[arg(long)]
    expires_in: Option<u64>,

    #[command(flatten)]
    conn: ConnectionArgs,
}

enum Input {
    Line(String),
    Eof,
}

pub fn run(args: WatchArgs) -> anyhow::Result<()> {
    let ctx = args.conn.resolve()?;
    let token = ctx.require_token()?.to_string();

    // The session manager owns its own REST client for reissue calls; a
    // second one serves room operations and is kept in sync on renewal.
    let mut backend = ctx.backend()?;
    let mut session = SessionTokenManager::new(ctx.backend()?);

    // With no known lifetime the session starts inside the renewal margin,
    // which trades the token for a fresh grant immediately.
    if session.set_session(token, args.expires_in.unwrap_or(0)) == SessionEvent::LoggedOut {
        anyhow::bail!("access token was rejected; log in again");
    }
    sync_token(&session, &mut backend);
    let mut renewal_deadline: Option<(u64, Instant)> = None;

    let transport = WsTransport::new()?;
    let mut conn = ConnectionManager::new(ctx.config.ws_url.clone(), transport)
        .with_reconnect_policy(ReconnectPolicy {
            delay: Duration::from_secs(ctx.config.reconnect_delay_secs),
        });
    let access = session.access_token().context("no session")?.to_string();
    conn.connect(&access)?;

    let mut lobby =
        LobbyNotificationRouter::new(ctx.username.clone(), ctx.config.destinations.clone());
    if let Err(error) = lobby.on_connected(&mut conn) {
        warn!(%error, "lobby subscription failed");
    }

    let mut room = RoomSessionController::new(
        ctx.username.clone(),
        ctx.config.destinations.clone(),
        ctx.config.history_page_size,
    );
    room.open(&mut backend, &mut conn, &args.room_id)?;
    for message in room.messages() {
        print_message(message);
    }
    println!("-- type to talk, /img <url> to share an image, /leave to leave, /quit to exit --");

    let input_rx = spawn_stdin_reader();
    let mut reconnect_at: Option<Instant> = None;

    'main: loop {
        // Track the single armed renewal timer and fire it when due.
        renewal_deadline = match (renewal_deadline, session.pending_renewal()) {
            (Some((generation, at)), Some(timer)) if timer.generation == generation => {
                Some((generation, at))
            }
            (_, Some(timer)) => Some((timer.generation, Instant::now() + timer.delay)),
            (_, None) => None,
        };
        if let Some((generation, at)) = renewal_deadline {
            if Instant::now() >= at {
                renewal_deadline = None;
                if session.fire_renewal(generation) == Some(SessionEvent::LoggedOut) {
                    eprintln!("-- session expired; logging out --");
                    break 'main;
                }
                sync_token(&session, &mut backend);
            }
        }

        // Reconnect after the fixed delay, with the freshest token.
        if conn.reconnect_due() {
            let due = *reconnect_at.get_or_insert_with(|| Instant::now() + conn.reconnect_delay());
            if Instant::now() >= due {
                reconnect_at = None;
                let Some(token) = session.access_token().map(str::to_string) else {
                    break 'main;
                };
                match conn.connect(&token) {
                    Ok(_) => {
                        if let Err(error) = lobby.on_connected(&mut conn) {
                            warn!(%error, "lobby resubscription failed");
                        }
                        if let Err(error) = room.on_reconnected(&mut conn) {
                            warn!(%error, "room resubscription failed");
                        }
                        eprintln!("-- reconnected --");
                    }
                    Err(error) => warn!(%error, "reconnect attempt failed"),
                }
            }
        }

        // Drain the socket.
        if conn.state() == ConnectionState::Connected {
            if let Some(event) = conn.poll_event(POLL_WINDOW) {
                match event {
                    ConnectionEvent::Frame(frame) => {
                        if lobby.owns(frame.subscription) {
                            if let LobbyUpdate::TotalUnread(count) = lobby.handle_frame(&frame) {
                                eprintln!("-- {count} unread elsewhere --");
                            }
                        } else if room.subscription() == Some(frame.subscription) {
                            match serde_json::from_str::<ChatMessage>(&frame.body) {
                                Ok(message) => match room.handle_frame(message) {
                                    RoomUpdate::Appended(message) => print_message(&message),
                                    RoomUpdate::ParticipantCount(count) => {
                                        eprintln!("-- {count} participant(s) --");
                                    }
                                    RoomUpdate::Ignored => {}
                                },
                                Err(error) => warn!(%error, "malformed chat message"),
                            }
                        }
                    }
                    ConnectionEvent::Disconnected { reason } => {
                        eprintln!("-- connection lost ({reason}); retrying --");
                    }
                }
            }
        } else {
            thread::sleep(POLL_WINDOW);
        }

        // Drain stdin.
        loop {
            match input_rx.try_recv() {
                Ok(Input::Line(line)) => {
                    if line.trim() == "/quit" {
                        break 'main;
                    }
                    if line.trim() == "/leave" {
                        if let Err(error) = room.leave_room(&mut backend, &mut conn, &args.room_id)
                        {
                            eprintln!("-- leave failed: {error} --");
                        }
                        break 'main;
                    }
                    let result = if let Some(url) = line.strip_prefix("/img ") {
                        room.send_image(&mut conn, url.trim())
                    } else {
                        room.send_text(&mut conn, &line)
                    };
                    if let Err(error) = result {
                        eprintln!("-- send failed: {error} --");
                    }
                }
                Ok(Input::Eof) | Err(mpsc::TryRecvError::Disconnected) => break 'main,
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }
    }

    room.close(&mut backend, &mut conn);
    conn.disconnect();
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = tx.send(Input::Eof);
    });
    rx
}

fn print_message(message: &ChatMessage) {
    match message.kind {
        MessageKind::Talk => {
            println!("<{}> {}", message.sender, message.message.as_deref().unwrap_or(""));
        }
        MessageKind::Image => {
            println!("<{}> [image] {}", message.sender, message.message.as_deref().unwrap_or(""));
        }
        MessageKind::Enter => println!("-- {} entered --", message.sender),
        MessageKind::Leave => println!("-- {} left --", message.sender),
        MessageKind::ParticipantCountUpdate => {}
    }
}

fn sync_token(session: &SessionTokenManager<HttpChatBackend>, backend: &mut HttpChatBackend) {
    if let Some(token) = session.access_token() {
        backend.set_access_token(token.to_string());
    }
}

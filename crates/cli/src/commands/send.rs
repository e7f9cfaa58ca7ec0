// `festa send` — one-shot: open a room, publish one message, close.

use clap::Args;
use std::time::Duration;

use festa_chat::connection::{ConnectionManager, ReconnectPolicy};
use festa_chat::room::RoomSessionController;
use festa_chat::transport::ws::WsTransport;

use crate::commands::ConnectionArgs;

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Room identifier.
    room_id: String,

    /// Message text (or an image URL with --image).
    text: String,

    /// Send as an IMAGE message; the text is an already-uploaded URL.
    #[arg(long)]
    image: bool,

    #[command(flatten)]
    conn: ConnectionArgs,
}

pub fn run(args: SendArgs) -> anyhow::Result<()> {
    let ctx = args.conn.resolve()?;
    let token = ctx.require_token()?.to_string();
    let mut backend = ctx.backend()?;

    let transport = WsTransport::new()?;
    let mut conn = ConnectionManager::new(ctx.config.ws_url.clone(), transport)
        .with_reconnect_policy(ReconnectPolicy {
            delay: Duration::from_secs(ctx.config.reconnect_delay_secs),
        });
    conn.connect(&token)?;

    let mut room = RoomSessionController::new(
        ctx.username.clone(),
        ctx.config.destinations.clone(),
        ctx.config.history_page_size,
    );
    room.open(&mut backend, &mut conn, &args.room_id)?;

    let outcome = if args.image {
        room.send_image(&mut conn, &args.text)
    } else {
        room.send_text(&mut conn, &args.text)
    };

    // Clean up before surfacing a send failure.
    room.close(&mut backend, &mut conn);
    conn.disconnect();
    outcome?;

    println!("sent to room {}", args.room_id);
    Ok(())
}

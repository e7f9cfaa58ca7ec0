// `festa leave` — remove this user from a room's membership.
//
// REST-only and independent of any socket state; read state for the room
// is forfeited, not flushed.

use clap::Args;

use festa_chat::backend::ChatBackend;

use crate::commands::ConnectionArgs;

#[derive(Debug, Args)]
pub struct LeaveArgs {
    /// Room identifier.
    room_id: String,

    #[command(flatten)]
    conn: ConnectionArgs,
}

pub fn run(args: LeaveArgs) -> anyhow::Result<()> {
    let ctx = args.conn.resolve()?;
    let mut backend = ctx.backend()?;

    backend.leave_room(&args.room_id, &ctx.username)?;
    println!("left room {}", args.room_id);
    Ok(())
}

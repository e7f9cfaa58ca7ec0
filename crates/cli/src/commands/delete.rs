// `festa delete` — delete a room outright.

use clap::Args;

use festa_chat::backend::ChatBackend;

use crate::commands::ConnectionArgs;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Room identifier.
    room_id: String,

    #[command(flatten)]
    conn: ConnectionArgs,
}

pub fn run(args: DeleteArgs) -> anyhow::Result<()> {
    let ctx = args.conn.resolve()?;
    let mut backend = ctx.backend()?;

    backend.delete_room(&args.room_id)?;
    println!("deleted room {}", args.room_id);
    Ok(())
}

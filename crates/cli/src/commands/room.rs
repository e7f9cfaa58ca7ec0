// `festa room` — show a chat room's metadata.

use clap::Args;

use festa_chat::backend::ChatBackend;

use crate::commands::ConnectionArgs;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RoomArgs {
    /// Room identifier.
    room_id: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    conn: ConnectionArgs,
}

pub fn run(args: RoomArgs) -> anyhow::Result<()> {
    let ctx = args.conn.resolve()?;
    let mut backend = ctx.backend()?;

    let detail = backend.room_detail(&args.room_id)?;

    let format = OutputFormat::detect(args.json);
    output::print_output(format, &detail, |d| {
        let meeting = d
            .meeting_date
            .map(|date| format!("\nmeeting:      {date}"))
            .unwrap_or_default();
        format!(
            "{} — {}\nparticipants: {}/{}\ncreated by:   {}{meeting}",
            d.room_id, d.subject, d.participant_count, d.max_participants, d.creator
        )
    })?;
    Ok(())
}

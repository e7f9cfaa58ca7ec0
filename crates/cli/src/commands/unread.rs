// `festa unread` — show the total unread message count.

use clap::Args;

use festa_chat::backend::ChatBackend;

use crate::commands::ConnectionArgs;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct UnreadArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    conn: ConnectionArgs,
}

pub fn run(args: UnreadArgs) -> anyhow::Result<()> {
    let ctx = args.conn.resolve()?;
    let mut backend = ctx.backend()?;

    let unread = backend.total_unread_count(&ctx.username)?;

    let format = OutputFormat::detect(args.json);
    output::print_output(format, &unread, |u| {
        format!("{} unread message(s)", u.total_unread_count)
    })?;
    Ok(())
}

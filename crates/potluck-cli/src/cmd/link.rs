//! `potluck link` — print a fresh share link for an event.

use clap::Args;

use super::Session;

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Event code or share link.
    pub target: String,
}

pub fn run_link(args: &LinkArgs, session: &Session) -> anyhow::Result<()> {
    let state = session.load(&args.target)?;
    session.finish("link", &state)
}

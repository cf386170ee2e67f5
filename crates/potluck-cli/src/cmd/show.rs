//! `potluck show` — display an event by code or link.

use chrono::Utc;
use clap::Args;

use super::{EventView, Session, render_event};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Event code or share link.
    pub target: String,
}

pub fn run_show(args: &ShowArgs, session: &Session) -> anyhow::Result<()> {
    let state = session.load(&args.target)?;
    render_event(session.output, &EventView::new(&state, Utc::now()))
}

//! `potluck create` — start a new event and print its first share link.

use chrono::{DateTime, Utc};
use clap::Args;
use potluck_core::id::SystemIds;
use potluck_core::model::{EventState, NewEvent};
use tracing::info;

use super::{Session, parse_when};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Event name.
    #[arg(short, long)]
    pub name: String,

    /// When the event takes place. Defaults to the first proposed date.
    #[arg(short, long, value_parser = parse_when)]
    pub date: Option<DateTime<Utc>>,

    /// Candidate date to vote on (repeat for a multi-date event).
    #[arg(short, long = "propose", value_parser = parse_when)]
    pub propose: Vec<DateTime<Utc>>,
}

pub fn run_create(args: &CreateArgs, session: &Session) -> anyhow::Result<()> {
    let event_date = args
        .date
        .or_else(|| args.propose.first().copied())
        .unwrap_or_else(Utc::now);

    let new = NewEvent::new(args.name.as_str(), event_date).with_proposed_dates(args.propose.clone());
    let state = session.apply(EventState::create(
        new,
        &mut SystemIds,
        session.config.config.retention(),
    ))?;

    info!(code = %state.event_code, multi_day = state.is_multi_day, "event created");
    session.finish("created", &state)
}

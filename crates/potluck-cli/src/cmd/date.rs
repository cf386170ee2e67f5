//! `potluck date` — vote on candidate dates of a multi-date event.
//!
//! Dates are referenced by id or by their 1-based position as `show`
//! lists them.

use clap::{Args, Subcommand};
use potluck_core::error::MutationError;
use potluck_core::id::SystemIds;

use super::{Session, find_date, missing};

#[derive(Args, Debug)]
pub struct DateVoteArgs {
    /// Event code or share link.
    pub target: String,
    /// Date id or position (1, 2, …).
    pub date: String,
    /// Voter name.
    pub voter: String,
}

#[derive(Subcommand, Debug)]
pub enum DateCommand {
    /// Vote for a date. Voting twice counts once.
    Vote(DateVoteArgs),
    /// Take back a date vote.
    Unvote(DateVoteArgs),
    /// Vote, or take the vote back if already cast.
    Toggle(DateVoteArgs),
}

pub fn run_date(command: &DateCommand, session: &Session) -> anyhow::Result<()> {
    let (args, action) = match command {
        DateCommand::Vote(args) => (args, "date voted"),
        DateCommand::Unvote(args) => (args, "date vote withdrawn"),
        DateCommand::Toggle(args) => (args, "date vote toggled"),
    };

    let state = session.load(&args.target)?;
    let Some(date) = find_date(&state, &args.date) else {
        return missing(session.output, MutationError::DateNotFound(args.date.clone()));
    };
    let date_id = date.id.clone();

    let result = match command {
        DateCommand::Vote(_) => state.vote_date(&date_id, &args.voter, &mut SystemIds),
        DateCommand::Unvote(_) => state.unvote_date(&date_id, &args.voter),
        DateCommand::Toggle(_) => state.toggle_date_vote(&date_id, &args.voter, &mut SystemIds),
    };
    let next = session.apply(result)?;
    session.finish(action, &next)
}

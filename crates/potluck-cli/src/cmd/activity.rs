//! `potluck activity` — propose activities and vote on them.

use clap::Subcommand;
use potluck_core::error::MutationError;
use potluck_core::id::SystemIds;
use potluck_core::model::EventState;

use super::{Session, find_activity, missing};

#[derive(Subcommand, Debug)]
pub enum ActivityCommand {
    /// Propose an activity.
    Add {
        /// Event code or share link.
        target: String,
        /// Activity name.
        name: String,
    },
    /// Withdraw an activity and its votes.
    Remove {
        /// Event code or share link.
        target: String,
        /// Activity id or name.
        activity: String,
    },
    /// Vote for an activity. Voting twice counts once.
    Vote {
        /// Event code or share link.
        target: String,
        /// Activity id or name.
        activity: String,
        /// Voter name.
        voter: String,
    },
    /// Take back a vote.
    Unvote {
        /// Event code or share link.
        target: String,
        /// Activity id or name.
        activity: String,
        /// Voter name.
        voter: String,
    },
}

fn activity_id(session: &Session, state: &EventState, reference: &str) -> anyhow::Result<String> {
    match find_activity(state, reference) {
        Some(activity) => Ok(activity.id.clone()),
        None => missing(
            session.output,
            MutationError::ActivityNotFound(reference.to_string()),
        ),
    }
}

pub fn run_activity(command: &ActivityCommand, session: &Session) -> anyhow::Result<()> {
    match command {
        ActivityCommand::Add { target, name } => {
            let state = session.load(target)?;
            let next = session.apply(state.add_activity(name, &mut SystemIds))?;
            session.finish("activity added", &next)
        }
        ActivityCommand::Remove { target, activity } => {
            let state = session.load(target)?;
            let id = activity_id(session, &state, activity)?;
            let next = session.apply(state.remove_activity(&id))?;
            session.finish("activity removed", &next)
        }
        ActivityCommand::Vote {
            target,
            activity,
            voter,
        } => {
            let state = session.load(target)?;
            let id = activity_id(session, &state, activity)?;
            let next = session.apply(state.vote_activity(&id, voter))?;
            session.finish("voted", &next)
        }
        ActivityCommand::Unvote {
            target,
            activity,
            voter,
        } => {
            let state = session.load(target)?;
            let id = activity_id(session, &state, activity)?;
            let next = session.apply(state.unvote_activity(&id, voter))?;
            session.finish("vote withdrawn", &next)
        }
    }
}

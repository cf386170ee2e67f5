//! `potluck item`, `potluck assign`, `potluck unassign` — what people bring.

use clap::{Args, Subcommand};
use potluck_core::error::MutationError;
use potluck_core::id::SystemIds;

use super::{Session, find_item, missing};

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    /// Add something to bring.
    Add {
        /// Event code or share link.
        target: String,
        /// Item name.
        name: String,
    },
    /// Remove an item and its assignment.
    Remove {
        /// Event code or share link.
        target: String,
        /// Item id or name.
        item: String,
    },
}

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Event code or share link.
    pub target: String,
    /// Item id or name.
    pub item: String,
    /// Who brings it. Replaces any earlier assignment.
    pub person: String,
}

#[derive(Args, Debug)]
pub struct UnassignArgs {
    /// Event code or share link.
    pub target: String,
    /// Item id or name.
    pub item: String,
}

pub fn run_item(command: &ItemCommand, session: &Session) -> anyhow::Result<()> {
    match command {
        ItemCommand::Add { target, name } => {
            let state = session.load(target)?;
            let next = session.apply(state.add_item(name, &mut SystemIds))?;
            session.finish("item added", &next)
        }
        ItemCommand::Remove { target, item } => {
            let state = session.load(target)?;
            let Some(found) = find_item(&state, item) else {
                return missing(session.output, MutationError::ItemNotFound(item.clone()));
            };
            let next = session.apply(state.remove_item(&found.id))?;
            session.finish("item removed", &next)
        }
    }
}

pub fn run_assign(args: &AssignArgs, session: &Session) -> anyhow::Result<()> {
    let state = session.load(&args.target)?;
    let Some(found) = find_item(&state, &args.item) else {
        return missing(session.output, MutationError::ItemNotFound(args.item.clone()));
    };
    let next = session.apply(state.assign_item(&found.id, &args.person, &mut SystemIds))?;
    session.finish("assigned", &next)
}

pub fn run_unassign(args: &UnassignArgs, session: &Session) -> anyhow::Result<()> {
    let state = session.load(&args.target)?;
    let Some(found) = find_item(&state, &args.item) else {
        return missing(session.output, MutationError::ItemNotFound(args.item.clone()));
    };
    let next = session.apply(state.unassign_item(&found.id))?;
    session.finish("unassigned", &next)
}

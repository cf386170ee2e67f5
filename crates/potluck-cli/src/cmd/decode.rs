//! `potluck decode` — inspect a raw link token without touching the store.

use chrono::Utc;
use clap::Args;
use potluck_core::codec::decode_state;
use potluck_core::link::ShareLink;

use super::{EventView, render_event};
use crate::output::{OutputMode, fail};

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// The `data` token, or a whole share link.
    pub token: String,
}

pub fn run_decode(args: &DecodeArgs, output: OutputMode) -> anyhow::Result<()> {
    let token = if args.token.contains("://") {
        let link = ShareLink::parse(&args.token).or_else(|err| fail(output, err))?;
        link.token.unwrap_or_default()
    } else {
        args.token.clone()
    };

    let state = decode_state(&token).or_else(|err| fail(output, err))?;
    render_event(output, &EventView::new(&state, Utc::now()))
}

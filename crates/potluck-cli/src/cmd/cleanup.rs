//! `potluck cleanup` — drop expired events from the local store.

use chrono::Utc;
use potluck_core::pipeline::cleanup_expired;
use serde::Serialize;
use std::io::Write;

use super::Session;
use crate::output::{fail, render};

#[derive(Debug, Serialize)]
struct CleanupReport {
    removed: usize,
}

pub fn run_cleanup(session: &Session) -> anyhow::Result<()> {
    let removed =
        cleanup_expired(session.store.as_ref(), Utc::now()).or_else(|err| fail(session.output, err))?;
    render(session.output, &CleanupReport { removed }, |r, w| {
        writeln!(w, "removed {} expired event(s)", r.removed)
    })
}

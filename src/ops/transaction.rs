//! Transaction commands
//!
//! The session state machine and the driver's journal stack move in
//! lockstep: the session transition is validated first, so the driver is
//! never asked to pop a level that is not open.

use super::{Ctx, ReplyBody};
use crate::error::Result;
use crate::wire::reader::Arg;
use tracing::debug;

/// `tstart`: push one nesting level
pub fn start(ctx: &mut Ctx<'_>, _args: &[Arg<'_>]) -> Result<ReplyBody> {
    let depth = ctx.session.begin_transaction()?;
    ctx.driver.tx_start(ctx.handle())?;
    debug!(handle = ctx.handle(), depth, "transaction started");
    Ok(ReplyBody::empty())
}

/// `tlevel`: current depth as a decimal string, "0" outside a transaction
pub fn level(ctx: &mut Ctx<'_>, _args: &[Arg<'_>]) -> Result<ReplyBody> {
    Ok(ReplyBody::text(&ctx.session.state().tx_depth().to_string()))
}

/// `tcommit`: publish the innermost level and pop it
pub fn commit(ctx: &mut Ctx<'_>, _args: &[Arg<'_>]) -> Result<ReplyBody> {
    let depth = ctx.session.end_transaction_level()?;
    ctx.driver.tx_commit(ctx.handle())?;
    debug!(handle = ctx.handle(), depth, "transaction committed");
    Ok(ReplyBody::empty())
}

/// `trollback`: discard the innermost level and pop it
pub fn rollback(ctx: &mut Ctx<'_>, _args: &[Arg<'_>]) -> Result<ReplyBody> {
    let depth = ctx.session.end_transaction_level()?;
    ctx.driver.tx_rollback(ctx.handle())?;
    debug!(handle = ctx.handle(), depth, "transaction rolled back");
    Ok(ReplyBody::empty())
}

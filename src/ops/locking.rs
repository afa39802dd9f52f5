//! Node lock commands

use super::{key_slices, require_global, Ctx, ReplyBody};
use crate::error::{DbxError, Result};
use crate::wire::reader::Arg;
use std::time::Duration;

/// Timeout argument in seconds; fractions allowed, negatives clamp to zero
fn parse_timeout(bytes: &[u8]) -> Result<Duration> {
    let secs: f64 = std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| DbxError::Config("lock timeout must be numeric".to_string()))?;
    let secs = if secs.is_finite() && secs > 0.0 { secs } else { 0.0 };
    Duration::try_from_secs_f64(secs)
        .map_err(|_| DbxError::Config("lock timeout out of range".to_string()))
}

/// `lock`: last argument is the timeout; "1" on acquire, "0" on expiry
pub fn lock(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let (timeout, keys) = match rest.split_last() {
        Some((timeout, keys)) => (parse_timeout(timeout.bytes)?, keys),
        None => (ctx.session.timeout(), rest),
    };
    let acquired = ctx.driver.lock(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &key_slices(keys),
        timeout,
    )?;
    Ok(ReplyBody::text(if acquired { "1" } else { "0" }))
}

/// `unlock`: "1" when we held the lock, "0" when we did not
pub fn unlock(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let held = ctx.driver.unlock(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &key_slices(rest),
    )?;
    Ok(ReplyBody::text(if held { "1" } else { "0" }))
}

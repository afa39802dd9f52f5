//! Connection and namespace commands

use super::{Ctx, ReplyBody};
use crate::error::{DbxError, Result};
use crate::session::OpenProfile;
use crate::wire::reader::Arg;
use tracing::{debug, info};

/// `open`: install the connection profile and reply with the backend banner
pub fn open(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    if ctx.session.state().is_connected() {
        return Err(DbxError::Session(format!(
            "session {} is already connected",
            ctx.handle()
        )));
    }
    let profile = OpenProfile::from_args(args)?;
    ctx.driver.connect(ctx.handle(), &profile)?;
    info!(
        handle = ctx.handle(),
        db_type = %profile.db_type,
        namespace = %profile.namespace,
        "session connected"
    );
    ctx.session.connect(profile)?;
    Ok(ReplyBody::bytes(ctx.driver.version().into_bytes()))
}

/// `close`: tear down driver-side state, then the session
///
/// Closing a disconnected session is a no-op, not a fault.
pub fn close(ctx: &mut Ctx<'_>, _args: &[Arg<'_>]) -> Result<ReplyBody> {
    if ctx.session.state().is_connected() {
        ctx.driver.disconnect(ctx.handle())?;
        debug!(handle = ctx.handle(), "session closed");
    }
    ctx.session.disconnect();
    Ok(ReplyBody::empty())
}

/// `namespace get`
pub fn ns_get(ctx: &mut Ctx<'_>, _args: &[Arg<'_>]) -> Result<ReplyBody> {
    Ok(ReplyBody::bytes(ctx.session.namespace().as_bytes().to_vec()))
}

/// `namespace set`: replies with the namespace actually installed
pub fn ns_set(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let name = args
        .first()
        .map(|a| String::from_utf8_lossy(a.bytes).into_owned())
        .unwrap_or_default();
    ctx.session.set_namespace(&name);
    Ok(ReplyBody::bytes(ctx.session.namespace().as_bytes().to_vec()))
}

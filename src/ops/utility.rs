//! Utility commands: timeout, charset, diagnostics

use super::{Ctx, LogLevelChoice, ReplyBody};
use crate::error::{DbxError, Result};
use crate::session::CharsetChoice;
use crate::wire::reader::Arg;
use std::time::Duration;
use tracing::info;

fn first_text(args: &[Arg<'_>]) -> String {
    args.first()
        .map(|a| String::from_utf8_lossy(a.bytes).into_owned())
        .unwrap_or_default()
}

/// `timeout`: replace the session default, in whole seconds
pub fn timeout(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let text = first_text(args);
    let secs: u32 = text
        .trim()
        .parse()
        .map_err(|_| DbxError::Config(format!("timeout must be a whole number of seconds, received {:?}", text)))?;
    ctx.session.set_timeout(Duration::from_secs(secs as u64));
    Ok(ReplyBody::empty())
}

/// `charset`: install a supported charset, echoing the canonical name
pub fn charset(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let text = first_text(args);
    let choice = CharsetChoice::parse(&text)
        .ok_or_else(|| DbxError::Config(format!("unsupported charset {:?}", text)))?;
    ctx.session.set_charset(choice);
    Ok(ReplyBody::text(choice.name()))
}

/// `loglevel`: set the engine diagnostic gate, echoing the level installed
pub fn log_level(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let text = first_text(args);
    let choice = LogLevelChoice::parse(&text)
        .ok_or_else(|| DbxError::Config(format!("unsupported log level {:?}", text)))?;
    ctx.log.set(choice);
    Ok(ReplyBody::text(choice.name()))
}

/// `logmessage`: arguments are (message, title); emits through the log gate
pub fn log_message(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    if ctx.log.enabled(LogLevelChoice::Info) {
        let message = first_text(args);
        let title = args
            .get(1)
            .map(|a| String::from_utf8_lossy(a.bytes).into_owned())
            .unwrap_or_default();
        info!(handle = ctx.session.handle(), title = %title, "{}", message);
    }
    Ok(ReplyBody::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::{darg, harness};

    #[test]
    fn test_timeout_updates_session() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        timeout(&mut ctx, &[darg(b"15")]).unwrap();
        assert_eq!(session.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_timeout_rejects_junk() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        assert!(timeout(&mut ctx, &[darg(b"soon")]).is_err());
        assert!(timeout(&mut ctx, &[]).is_err());
    }

    #[test]
    fn test_charset_echoes_canonical_name() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        assert_eq!(
            charset(&mut ctx, &[darg(b"UTF8")]).unwrap(),
            ReplyBody::text("utf-8")
        );
        assert!(charset(&mut ctx, &[darg(b"ebcdic")]).is_err());
        assert_eq!(session.charset(), crate::session::CharsetChoice::Utf8);
    }

    #[test]
    fn test_log_level_round_trip() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        assert_eq!(
            log_level(&mut ctx, &[darg(b"debug")]).unwrap(),
            ReplyBody::text("debug")
        );
        assert_eq!(log.get(), LogLevelChoice::Debug);
        assert!(log_level(&mut ctx, &[darg(b"shout")]).is_err());
    }

    #[test]
    fn test_log_message_replies_empty() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        let body = log_message(&mut ctx, &[darg(b"hello"), darg(b"client")]).unwrap();
        assert_eq!(body, ReplyBody::empty());
    }
}

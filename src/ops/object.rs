//! Function and object commands
//!
//! Object commands address instances by OREF, packed by the client as a
//! DATA/OREF item ahead of the remaining arguments.

use super::{key_slices, parse_oref, Ctx, ReplyBody};
use crate::error::{DbxError, Result};
use crate::wire::reader::Arg;

fn required<'a>(args: &'a [Arg<'a>], what: &str) -> Result<(&'a Arg<'a>, &'a [Arg<'a>])> {
    args.split_first()
        .ok_or_else(|| DbxError::Other(format!("{} argument is required", what)))
}

/// `function`: first argument names the function, the rest are its arguments
pub fn function(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (name, rest) = required(args, "function name")?;
    let out = ctx.driver.function(
        ctx.handle(),
        ctx.session.namespace(),
        name.bytes,
        &key_slices(rest),
    )?;
    Ok(ReplyBody::call(out))
}

/// `classmethod`: class name, method name, then arguments
pub fn classmethod(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (class, rest) = required(args, "class name")?;
    let (method, rest) = required(rest, "method name")?;
    let out = ctx.driver.classmethod(
        ctx.handle(),
        ctx.session.namespace(),
        class.bytes,
        method.bytes,
        &key_slices(rest),
    )?;
    Ok(ReplyBody::call(out))
}

/// `getproperty`: OREF then property name
pub fn get_property(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (oref, rest) = required(args, "object reference")?;
    let (name, _) = required(rest, "property name")?;
    let value = ctx
        .driver
        .get_property(ctx.handle(), parse_oref(oref)?, name.bytes)?;
    Ok(ReplyBody::bytes(value))
}

/// `setproperty`: OREF, property name, value
pub fn set_property(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (oref, rest) = required(args, "object reference")?;
    let (name, rest) = required(rest, "property name")?;
    let (value, _) = required(rest, "property value")?;
    ctx.driver
        .set_property(ctx.handle(), parse_oref(oref)?, name.bytes, value.bytes)?;
    Ok(ReplyBody::empty())
}

/// `method`: OREF, method name, then arguments
pub fn method(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (oref, rest) = required(args, "object reference")?;
    let (name, rest) = required(rest, "method name")?;
    let out = ctx
        .driver
        .method(ctx.handle(), parse_oref(oref)?, name.bytes, &key_slices(rest))?;
    Ok(ReplyBody::call(out))
}

/// `closeinstance`: release the OREF; an unknown OREF is a fault
pub fn close_instance(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (oref, _) = required(args, "object reference")?;
    ctx.driver.close_instance(ctx.handle(), parse_oref(oref)?)?;
    Ok(ReplyBody::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::CallValue;
    use crate::ops::test_support::{darg, harness};
    use crate::wire::{DType, Kind, Sort};
    use std::sync::Arc;

    fn oref_arg(text: &'static str) -> Arg<'static> {
        Arg {
            kind: Kind {
                sort: Sort::Data,
                dtype: DType::Oref,
            },
            bytes: text.as_bytes(),
        }
    }

    #[test]
    fn test_function_call() {
        let (driver, mut session, log) = harness();
        driver.register_function(
            "greet",
            Arc::new(|args| {
                let mut out = b"hello ".to_vec();
                if let Some(first) = args.first() {
                    out.extend_from_slice(first);
                }
                Ok(CallValue::Bytes(out))
            }),
        );
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };

        let body = function(&mut ctx, &[darg(b"greet"), darg(b"world")]).unwrap();
        assert_eq!(body, ReplyBody::text("hello world"));
        assert!(function(&mut ctx, &[darg(b"nosuch")]).is_err());
        assert!(function(&mut ctx, &[]).is_err());
    }

    #[test]
    fn test_instance_round_trip() {
        let (driver, mut session, log) = harness();
        driver.register_class("Example");
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };

        let body = classmethod(&mut ctx, &[darg(b"Example"), darg(b"%New")]).unwrap();
        let oref = match body {
            ReplyBody::Item { bytes, kind } => {
                assert_eq!(kind.dtype, DType::Oref);
                String::from_utf8(bytes).unwrap()
            }
            other => panic!("unexpected body {other:?}"),
        };
        assert_eq!(oref, "1");

        set_property(&mut ctx, &[oref_arg("1"), darg(b"name"), darg(b"widget")]).unwrap();
        assert_eq!(
            get_property(&mut ctx, &[oref_arg("1"), darg(b"name")]).unwrap(),
            ReplyBody::text("widget")
        );

        close_instance(&mut ctx, &[oref_arg("1")]).unwrap();
        assert!(get_property(&mut ctx, &[oref_arg("1"), darg(b"name")]).is_err());
        // releasing again is a fault: the OREF is gone
        assert!(close_instance(&mut ctx, &[oref_arg("1")]).is_err());
    }

    #[test]
    fn test_bad_oref_is_rejected() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        assert!(get_property(&mut ctx, &[darg(b"not-a-number"), darg(b"p")]).is_err());
    }
}

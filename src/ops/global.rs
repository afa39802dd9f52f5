//! Global node commands: storage, traversal, and the name directory

use super::{key_slices, require_global, Ctx, ReplyBody};
use crate::driver::Direction;
use crate::error::{DbxError, Result};
use crate::wire::reader::Arg;
use crate::wire::Sort;

/// `set`: last argument is the value, the rest address the node
pub fn set(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let (value, keys) = match rest.split_last() {
        Some((value, keys)) => (value.bytes, keys),
        None => (&b""[..], rest),
    };
    ctx.driver.set(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &key_slices(keys),
        value,
    )?;
    Ok(ReplyBody::empty())
}

/// `get`: an undefined node replies with the empty payload
pub fn get(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let value = ctx
        .driver
        .get(
            ctx.handle(),
            ctx.session.namespace(),
            global,
            &key_slices(rest),
        )?
        .unwrap_or_default();
    Ok(ReplyBody::bytes(value))
}

/// `delete`: removes the node and its whole subtree
pub fn delete(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    ctx.driver.delete(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &key_slices(rest),
    )?;
    Ok(ReplyBody::empty())
}

/// `defined`: replies "0", "1", "10", or "11"
pub fn defined(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let status = ctx.driver.defined(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &key_slices(rest),
    )?;
    Ok(ReplyBody::text(&status.code().to_string()))
}

/// `increment`: last argument is the delta, defaulting to 1
pub fn increment(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let (delta, keys) = match rest.split_last() {
        Some((delta, keys)) => (delta.bytes, keys),
        None => (&b"1"[..], rest),
    };
    let value = ctx.driver.increment(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &key_slices(keys),
        delta,
    )?;
    Ok(ReplyBody::bytes(value))
}

/// `merge`: a second GLOBAL-sort argument starts the source address
pub fn merge(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    let (to_global, rest) = require_global(args)?;
    let split = rest
        .iter()
        .position(|a| a.kind.sort == Sort::Global)
        .ok_or_else(|| DbxError::Global("merge needs a source global argument".to_string()))?;
    let to_keys = key_slices(&rest[..split]);
    let from_global = rest[split].bytes;
    let from_keys = key_slices(&rest[split + 1..]);
    ctx.driver.merge(
        ctx.handle(),
        ctx.session.namespace(),
        to_global,
        &to_keys,
        from_global,
        &from_keys,
    )?;
    Ok(ReplyBody::text("1"))
}

fn order(ctx: &mut Ctx<'_>, args: &[Arg<'_>], direction: Direction) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let key = ctx
        .driver
        .order(
            ctx.handle(),
            ctx.session.namespace(),
            global,
            &key_slices(rest),
            direction,
        )?
        .unwrap_or_default();
    Ok(ReplyBody::bytes(key))
}

/// `next`: sibling after the seed, "" at the end of the level
pub fn next(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    order(ctx, args, Direction::Forward)
}

/// `previous`: sibling before the seed, "" at the start of the level
pub fn previous(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    order(ctx, args, Direction::Backward)
}

fn order_data(ctx: &mut Ctx<'_>, args: &[Arg<'_>], direction: Direction) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    let keys = key_slices(rest);
    match ctx.driver.order(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &keys,
        direction,
    )? {
        Some(key) => {
            let mut probe: Vec<&[u8]> = keys[..keys.len().saturating_sub(1)].to_vec();
            probe.push(key.as_slice());
            let value = ctx
                .driver
                .get(ctx.handle(), ctx.session.namespace(), global, &probe)?
                .unwrap_or_default();
            Ok(ReplyBody::OrderData { value, key })
        }
        None => Ok(ReplyBody::OrderData {
            value: Vec::new(),
            key: Vec::new(),
        }),
    }
}

/// `next data`: as `next` but the reply also carries the value
pub fn next_data(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    order_data(ctx, args, Direction::Forward)
}

/// `previous data`: as `previous` but the reply also carries the value
pub fn previous_data(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    order_data(ctx, args, Direction::Backward)
}

fn node(
    ctx: &mut Ctx<'_>,
    args: &[Arg<'_>],
    direction: Direction,
    with_value: bool,
) -> Result<ReplyBody> {
    let (global, rest) = require_global(args)?;
    match ctx.driver.node_order(
        ctx.handle(),
        ctx.session.namespace(),
        global,
        &key_slices(rest),
        direction,
    )? {
        Some(step) => Ok(ReplyBody::Node {
            value: if with_value { step.value } else { Vec::new() },
            keys: step.keys,
            done: false,
        }),
        None => Ok(ReplyBody::Node {
            value: Vec::new(),
            keys: Vec::new(),
            done: true,
        }),
    }
}

/// `next node`: depth-first traversal, keys only
pub fn next_node(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    node(ctx, args, Direction::Forward, false)
}

/// `previous node`: depth-first traversal in reverse, keys only
pub fn previous_node(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    node(ctx, args, Direction::Backward, false)
}

/// `next node data`: depth-first traversal carrying the node value
pub fn next_node_data(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    node(ctx, args, Direction::Forward, true)
}

/// `previous node data`: reverse traversal carrying the node value
pub fn previous_node_data(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    node(ctx, args, Direction::Backward, true)
}

fn name_order(ctx: &mut Ctx<'_>, args: &[Arg<'_>], direction: Direction) -> Result<ReplyBody> {
    let seed = args.first().map(|a| a.bytes).unwrap_or(b"");
    let name = ctx
        .driver
        .name_order(ctx.handle(), ctx.session.namespace(), seed, direction)?
        .unwrap_or_default();
    Ok(ReplyBody::bytes(name))
}

/// `name next`: next global name in the directory
pub fn name_next(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    name_order(ctx, args, Direction::Forward)
}

/// `name previous`: previous global name in the directory
pub fn name_previous(ctx: &mut Ctx<'_>, args: &[Arg<'_>]) -> Result<ReplyBody> {
    name_order(ctx, args, Direction::Backward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::ops::test_support::{darg, garg, harness};

    #[test]
    fn test_set_then_get() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };

        let body = set(&mut ctx, &[garg(b"stock"), darg(b"apples"), darg(b"12")]).unwrap();
        assert_eq!(body, ReplyBody::empty());

        let body = get(&mut ctx, &[garg(b"stock"), darg(b"apples")]).unwrap();
        assert_eq!(body, ReplyBody::text("12"));

        // undefined node is an empty payload, not a fault
        let body = get(&mut ctx, &[garg(b"stock"), darg(b"pears")]).unwrap();
        assert_eq!(body, ReplyBody::empty());
    }

    #[test]
    fn test_global_name_is_required() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        assert!(get(&mut ctx, &[darg(b"stock")]).is_err());
        assert!(set(&mut ctx, &[]).is_err());
    }

    #[test]
    fn test_defined_and_delete() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };

        set(&mut ctx, &[garg(b"g"), darg(b"a"), darg(b"1")]).unwrap();
        set(&mut ctx, &[garg(b"g"), darg(b"a"), darg(b"b"), darg(b"2")]).unwrap();

        assert_eq!(
            defined(&mut ctx, &[garg(b"g"), darg(b"a")]).unwrap(),
            ReplyBody::text("11")
        );
        assert_eq!(
            defined(&mut ctx, &[garg(b"g"), darg(b"a"), darg(b"b")]).unwrap(),
            ReplyBody::text("1")
        );
        assert_eq!(
            defined(&mut ctx, &[garg(b"g"), darg(b"zz")]).unwrap(),
            ReplyBody::text("0")
        );

        delete(&mut ctx, &[garg(b"g"), darg(b"a")]).unwrap();
        assert_eq!(
            defined(&mut ctx, &[garg(b"g"), darg(b"a")]).unwrap(),
            ReplyBody::text("0")
        );
    }

    #[test]
    fn test_increment_defaults_to_one() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        assert_eq!(
            increment(&mut ctx, &[garg(b"counter")]).unwrap(),
            ReplyBody::text("1")
        );
        assert_eq!(
            increment(&mut ctx, &[garg(b"counter"), darg(b"4")]).unwrap(),
            ReplyBody::text("5")
        );
    }

    #[test]
    fn test_order_walk_and_edges() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        for key in [b"a" as &[u8], b"b", b"c"] {
            driver.set(1, "", b"walk", &[key], b"v").unwrap();
        }

        assert_eq!(
            next(&mut ctx, &[garg(b"walk"), darg(b"")]).unwrap(),
            ReplyBody::text("a")
        );
        assert_eq!(
            next(&mut ctx, &[garg(b"walk"), darg(b"a")]).unwrap(),
            ReplyBody::text("b")
        );
        assert_eq!(
            next(&mut ctx, &[garg(b"walk"), darg(b"c")]).unwrap(),
            ReplyBody::empty()
        );
        assert_eq!(
            previous(&mut ctx, &[garg(b"walk"), darg(b"")]).unwrap(),
            ReplyBody::text("c")
        );
    }

    #[test]
    fn test_order_data_carries_value() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        driver.set(1, "", b"g", &[b"k1"], b"v1").unwrap();
        driver.set(1, "", b"g", &[b"k2"], b"v2").unwrap();

        assert_eq!(
            next_data(&mut ctx, &[garg(b"g"), darg(b"k1")]).unwrap(),
            ReplyBody::OrderData {
                value: b"v2".to_vec(),
                key: b"k2".to_vec(),
            }
        );
        assert_eq!(
            next_data(&mut ctx, &[garg(b"g"), darg(b"k2")]).unwrap(),
            ReplyBody::OrderData {
                value: Vec::new(),
                key: Vec::new(),
            }
        );
    }

    #[test]
    fn test_node_traversal_bodies() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        driver.set(1, "", b"g", &[b"a"], b"1").unwrap();
        driver.set(1, "", b"g", &[b"a", b"b"], b"2").unwrap();

        assert_eq!(
            next_node_data(&mut ctx, &[garg(b"g")]).unwrap(),
            ReplyBody::Node {
                value: b"1".to_vec(),
                keys: vec![b"a".to_vec()],
                done: false,
            }
        );
        // the keys-only form leaves the value item empty
        assert_eq!(
            next_node(&mut ctx, &[garg(b"g")]).unwrap(),
            ReplyBody::Node {
                value: Vec::new(),
                keys: vec![b"a".to_vec()],
                done: false,
            }
        );
        assert_eq!(
            next_node(&mut ctx, &[garg(b"g"), darg(b"a"), darg(b"b")]).unwrap(),
            ReplyBody::Node {
                value: Vec::new(),
                keys: Vec::new(),
                done: true,
            }
        );
    }

    #[test]
    fn test_merge_needs_source_global() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        driver.set(1, "", b"src", &[b"k"], b"v").unwrap();

        assert!(merge(&mut ctx, &[garg(b"dst"), darg(b"k")]).is_err());

        let body = merge(&mut ctx, &[garg(b"dst"), garg(b"src")]).unwrap();
        assert_eq!(body, ReplyBody::text("1"));
        assert_eq!(
            get(&mut ctx, &[garg(b"dst"), darg(b"k")]).unwrap(),
            ReplyBody::text("v")
        );
    }

    #[test]
    fn test_name_directory() {
        let (driver, mut session, log) = harness();
        let mut ctx = Ctx {
            driver: &driver,
            session: &mut session,
            log: &log,
        };
        driver.set(1, "", b"alpha", &[b"k"], b"v").unwrap();
        driver.set(1, "", b"beta", &[b"k"], b"v").unwrap();

        assert_eq!(
            name_next(&mut ctx, &[darg(b"")]).unwrap(),
            ReplyBody::text("alpha")
        );
        assert_eq!(
            name_next(&mut ctx, &[darg(b"alpha")]).unwrap(),
            ReplyBody::text("beta")
        );
        assert_eq!(
            name_previous(&mut ctx, &[darg(b"")]).unwrap(),
            ReplyBody::text("beta")
        );
        assert_eq!(
            name_next(&mut ctx, &[darg(b"beta")]).unwrap(),
            ReplyBody::empty()
        );
    }
}

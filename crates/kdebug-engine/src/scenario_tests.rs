//! End-to-end scenarios driving real byte streams through the protocol
//! parsers, converted to scheduler events, and fed into a live
//! [`Scheduler`] — exercising the seam between `kdebug-protocol` and
//! `kdebug-engine` that each crate's own unit tests stop short of.

use kdebug_protocol::stdout::{OutputParser, ParserEvent, BYTES_PREFIX};
use kdebug_protocol::StdErrParser;

use crate::process::to_scheduler_event;
use crate::scheduler::{Dispatch, Event, ParserPrep, Scheduler};

fn prompt(id: u64) -> Vec<u8> {
    let mut v = b"\nKore (".to_vec();
    v.extend_from_slice(BYTES_PREFIX);
    v.extend_from_slice(id.to_string().as_bytes());
    v.extend_from_slice(BYTES_PREFIX);
    v.extend_from_slice(b")> ");
    v
}

fn feed_stdout(parser: &mut OutputParser, bytes: &[u8]) -> Vec<ParserEvent> {
    bytes.iter().flat_map(|&b| parser.process(b)).collect()
}

fn dispatch(scheduler: &mut Scheduler, events: Vec<ParserEvent>) -> Vec<Dispatch> {
    events
        .into_iter()
        .filter_map(|event| scheduler.handle(to_scheduler_event(event)).unwrap())
        .collect()
}

/// Scenario 1: startup requests the root's configuration before stepping.
#[test]
fn startup_requests_root_konfig_then_steps() {
    let mut parser = OutputParser::new();
    let mut scheduler = Scheduler::new("/tmp/graph");

    let events = feed_stdout(&mut parser, &prompt(0));
    assert_eq!(events, vec![ParserEvent::AtPrompt(0)]);

    let first = dispatch(&mut scheduler, events);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].prep, ParserPrep::Konfig);
    assert_eq!(first[0].lines, vec!["select 0", "konfig"]);

    scheduler.handle(Event::Konfig(0, Vec::new())).unwrap();
    let second = scheduler.handle(Event::AtPrompt(0)).unwrap().unwrap();
    assert_eq!(second.prep, ParserPrep::Step);
    assert_eq!(second.lines, vec!["select 0", "step", "graph expanded /tmp/graph svg"]);
}

/// Scenario 2: a single-child step extends the tree under the last
/// selected node.
#[test]
fn linear_step_adds_child_under_last_selected_node() {
    let mut parser = OutputParser::new();
    let mut scheduler = Scheduler::new("/tmp/graph");

    dispatch(&mut scheduler, feed_stdout(&mut parser, &prompt(0)));
    scheduler.handle(Event::Konfig(0, Vec::new())).unwrap();
    scheduler.handle(Event::AtPrompt(0)).unwrap();
    parser.prepare_for_step();

    let events = feed_stdout(&mut parser, &prompt(1));
    assert_eq!(events, vec![ParserEvent::AtPrompt(1)]);
    let dispatches = dispatch(&mut scheduler, events);

    assert!(scheduler.tree().find_node(1).is_some());
    assert_eq!(dispatches[0].lines[0], "select 1");
}

/// Scenario 3: branching attaches every announced child and queues them
/// depth-first, oldest unexpanded node first.
#[test]
fn branching_attaches_children_in_order() {
    let mut parser = OutputParser::new();
    let mut scheduler = Scheduler::new("/tmp/graph");

    dispatch(&mut scheduler, feed_stdout(&mut parser, &prompt(0)));
    scheduler.handle(Event::Konfig(0, Vec::new())).unwrap();
    scheduler.handle(Event::AtPrompt(0)).unwrap();
    parser.prepare_for_step();
    dispatch(&mut scheduler, feed_stdout(&mut parser, &prompt(1)));
    scheduler.handle(Event::Konfig(1, Vec::new())).unwrap();
    parser.prepare_for_step();

    let mut stream = b"\nStopped after ".to_vec();
    stream.extend_from_slice(BYTES_PREFIX);
    stream.extend_from_slice(b"3");
    stream.extend_from_slice(BYTES_PREFIX);
    stream.extend_from_slice(b" step(s) due to branching on [");
    for (i, id) in [2u64, 3, 4].into_iter().enumerate() {
        if i > 0 {
            stream.extend_from_slice(BYTES_PREFIX);
            stream.extend_from_slice(b",");
        }
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(id.to_string().as_bytes());
    }
    stream.extend_from_slice(BYTES_PREFIX);
    stream.extend_from_slice(b"]");
    stream.extend_from_slice(&prompt(1));

    let events = feed_stdout(&mut parser, &stream);
    assert_eq!(events, vec![ParserEvent::Branches(3, vec![2, 3, 4]), ParserEvent::AtPrompt(1)]);
    dispatch(&mut scheduler, events);

    let children = scheduler.tree().find_tree(1).unwrap().children();
    assert_eq!(children.len(), 3);
    assert_eq!(children[0].segment()[0].id(), 2);
}

/// Scenario 4: a stuck warning on stderr tags the next prompt's node,
/// rendered as `stuck(id)` per the proof tree's `Display` impl.
#[test]
fn stuck_warning_tags_the_next_prompt_node() {
    let mut stderr_parser = StdErrParser::new();
    let mut scheduler = Scheduler::new("/tmp/graph");
    scheduler.handle(Event::AtPrompt(0)).unwrap();
    scheduler.handle(Event::Konfig(0, Vec::new())).unwrap();
    scheduler.handle(Event::AtPrompt(0)).unwrap();

    let signal = b"WarnStuckClaimState".iter().find_map(|&b| stderr_parser.process(b));
    assert_eq!(signal, Some(kdebug_protocol::EndStateSignal::Stuck));

    scheduler.handle(Event::EndStateSet(signal.unwrap())).unwrap();
    scheduler.handle(Event::ProofEnd(5)).unwrap();
    scheduler.handle(Event::AtPrompt(7)).unwrap();

    assert_eq!(scheduler.tree().find_node(7).unwrap().to_string(), "stuck(7)");
}

/// Scenario 5: a configuration dump feeds back through the scheduler as
/// the normalized lines for exactly the node that requested it. Node 7
/// is brought into existence the same way scenario 4 does (a prompt
/// following a proof-end), since the scheduler's root is always id 0.
#[test]
fn configuration_dump_attaches_to_the_requesting_node() {
    let mut scheduler = Scheduler::new("/tmp/graph");
    scheduler.handle(Event::AtPrompt(0)).unwrap();
    scheduler.handle(Event::Konfig(0, Vec::new())).unwrap();
    scheduler.handle(Event::AtPrompt(0)).unwrap();
    scheduler.handle(Event::ProofEnd(5)).unwrap();
    scheduler.handle(Event::AtPrompt(7)).unwrap();

    let mut parser = OutputParser::new();
    parser.prepare_for_konfig();
    let mut stream = b"\nConfig at node ".to_vec();
    stream.extend_from_slice(BYTES_PREFIX);
    stream.extend_from_slice(b"7");
    stream.extend_from_slice(BYTES_PREFIX);
    stream.extend_from_slice(b" is:\nfoo\nbar\n");
    stream.extend_from_slice(&prompt(7));

    let events = feed_stdout(&mut parser, &stream);
    let ParserEvent::Konfig(id, lines) = &events[0] else { panic!("expected Konfig first") };
    assert_eq!(*id, 7);

    scheduler.handle(to_scheduler_event(events[0].clone())).unwrap();

    let stored = scheduler.tree().find_node(7).unwrap().configuration().unwrap();
    assert_eq!(stored, lines.as_slice());
}

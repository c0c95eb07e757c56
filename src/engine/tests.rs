use crate::engine::{IdleSupport, Linker, ManualClock, SkipReason, UnitVerdict};
use crate::{Document, NodeId, Options};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn engine(options: Options, idle: IdleSupport) -> (Rc<ManualClock>, Linker) {
    let clock = Rc::new(ManualClock::new());
    let linker = Linker::with_clock(options, clock.clone(), idle).unwrap();
    (clock, linker)
}

/// Append `n` paragraphs holding `text` to the body.
fn paragraphs(doc: &mut Document, n: usize, text: &str) -> Vec<NodeId> {
    (0..n)
        .map(|_| {
            let p = doc.create_element("p");
            let t = doc.create_text(text);
            doc.append_child(doc.root(), p).unwrap();
            doc.append_child(p, t).unwrap();
            p
        })
        .collect()
}

enum Setup {
    Plain,
    Attr(&'static str, &'static str),
    Style(&'static str, &'static str),
}

#[test]
fn linking_depends_on_context() {
    // (space-separated element path under body, setup applied to the outermost element, text, links expected)
    let cases: Vec<(&str, Setup, &str, u64)> = vec![
        ("p", Setup::Plain, "Call 415-555-2671 today", 1),
        ("div p", Setup::Plain, "+1 (415) 555 2671 / 415 555 2672", 2),
        ("div p", Setup::Attr("hidden", ""), "415-555-2671", 0),
        ("div p", Setup::Attr("aria-hidden", "true"), "415-555-2671", 0),
        ("div p", Setup::Attr("aria-hidden", "false"), "415-555-2671", 1),
        ("div p", Setup::Style("display", "none"), "415-555-2671", 0),
        ("div p", Setup::Style("visibility", "collapse"), "415-555-2671", 0),
        ("div p", Setup::Style("opacity", "0"), "415-555-2671", 0),
        ("div p", Setup::Style("opacity", "0.5"), "415-555-2671", 1),
        ("div p", Setup::Attr("contenteditable", "true"), "415-555-2671", 0),
        ("pre", Setup::Plain, "415-555-2671", 0),
        ("button", Setup::Plain, "415-555-2671", 0),
        ("a span", Setup::Plain, "415-555-2671", 0),
        ("p", Setup::Plain, "card 4111-1111-1111-1111", 0),
        ("p", Setup::Plain, "ext. 555-12", 0),
        ("p", Setup::Plain, "+49 30 1234 5678 9012 3", 0),
    ];

    for (path, setup, text, expected) in cases {
        let mut doc = Document::new();
        let mut parent = doc.root();
        for tag in path.split_whitespace() {
            let el = doc.create_element(tag);
            doc.append_child(parent, el).unwrap();
            parent = el;
        }
        let t = doc.create_text(text);
        doc.append_child(parent, t).unwrap();

        let outer = doc.children(doc.root())[0];
        match setup {
            Setup::Plain => {}
            Setup::Attr(name, value) => doc.set_attribute(outer, name, value).unwrap(),
            Setup::Style(prop, value) => doc.set_style(outer, prop, value).unwrap(),
        }

        let (_, mut linker) = engine(Options::default(), IdleSupport::Available);
        linker.scan_document(&mut doc);
        assert_eq!(linker.stats().links_created, expected, "{path:?} {text:?}");
    }
}

#[test]
fn first_slice_runs_immediately_and_the_rest_on_idle() {
    let mut doc = Document::new();
    paragraphs(&mut doc, 1000, "555-2671");
    let (_, mut linker) = engine(Options::default(), IdleSupport::Available);

    linker.scan_document(&mut doc);
    assert_eq!(linker.stats().slices, 1);
    assert_eq!(linker.stats().links_created, 400);
    assert_eq!(linker.pending_units(), 600);
    assert!(linker.has_idle_work());

    assert!(linker.run_idle(&mut doc));
    assert_eq!(linker.stats().links_created, 800);
    assert!(linker.run_idle(&mut doc));
    assert_eq!(linker.stats().links_created, 1000);
    assert!(!linker.run_idle(&mut doc));
    assert!(!linker.has_pending_work());
}

#[test]
fn overdue_slice_is_forced_by_the_max_wait() {
    let mut doc = Document::new();
    paragraphs(&mut doc, 500, "555-2671");
    let (clock, mut linker) = engine(Options::default(), IdleSupport::Available);

    linker.scan_document(&mut doc);
    assert_eq!(linker.next_deadline(), Some(500));

    clock.advance(499);
    assert_eq!(linker.tick(&mut doc), 0);
    clock.advance(1);
    assert_eq!(linker.tick(&mut doc), 1);
    assert_eq!(linker.stats().links_created, 500);
}

#[test]
fn hosts_without_idle_callbacks_get_a_fixed_delay() {
    let mut doc = Document::new();
    paragraphs(&mut doc, 900, "555-2671");
    let (clock, mut linker) = engine(Options::default(), IdleSupport::Unavailable);

    linker.scan_document(&mut doc);
    assert!(!linker.has_idle_work());
    assert_eq!(linker.next_deadline(), Some(50));

    clock.advance(50);
    linker.tick(&mut doc);
    assert_eq!(linker.stats().links_created, 800);
    assert_eq!(linker.next_deadline(), Some(100));

    clock.advance(50);
    linker.tick(&mut doc);
    assert_eq!(linker.stats().links_created, 900);
    assert_eq!(linker.next_deadline(), None);
}

#[test]
fn units_removed_while_pending_are_skipped_as_detached() {
    let mut doc = Document::new();
    let ps = paragraphs(&mut doc, 2, "555-2671");
    let opts = Options { batch_size: 1, ..Options::default() };
    let (_, mut linker) = engine(opts, IdleSupport::Available);
    linker.enable_trace();

    linker.scan_document(&mut doc);
    let second = doc.children(ps[1])[0];
    doc.remove(second).unwrap();
    while linker.run_idle(&mut doc) {}

    let trace = linker.take_trace();
    assert_eq!(trace[1].verdict, UnitVerdict::Skipped(SkipReason::Detached));
    assert_eq!(linker.stats().units_skipped, 1);
    assert_eq!(linker.stats().links_created, 1);
}

#[test]
fn rewrites_inside_removed_paragraphs_are_abandoned() {
    let mut doc = Document::new();
    let ps = paragraphs(&mut doc, 2, "555-2671");
    let opts = Options { batch_size: 1, ..Options::default() };
    let (_, mut linker) = engine(opts, IdleSupport::Available);
    linker.enable_trace();

    linker.scan_document(&mut doc);
    doc.remove(ps[1]).unwrap();
    while linker.run_idle(&mut doc) {}

    let trace = linker.take_trace();
    assert_eq!(trace[1].verdict, UnitVerdict::Abandoned);
    assert!(!doc.is_connected(ps[1]));
    assert_eq!(doc.inner_html(ps[1]), "555-2671");
    assert_eq!(linker.stats().rewrites_abandoned, 1);
    assert_eq!(linker.stats().links_created, 1);
}

use ansi::{Palette, Tone};
use phonelink::{Document, EngineStats, UnitTrace, UnitVerdict};
use std::time::Duration;

/// ANSI styling keyed by what a piece of the report means.
mod ansi {
    #[derive(Clone, Copy)]
    pub enum Tone {
        /// Links made, hrefs, timings.
        Good,
        /// Skipped or hidden units, candidate offsets.
        Warn,
        /// Rejections and abandoned rewrites.
        Bad,
        /// Matched text and non-zero counters.
        Info,
        Accent,
        /// Section rules and indices.
        Rule,
        Muted,
    }

    impl Tone {
        fn code(self) -> &'static str {
            match self {
                Tone::Good => "\x1b[32m",
                Tone::Warn => "\x1b[33m",
                Tone::Bad => "\x1b[31m",
                Tone::Info => "\x1b[34m",
                Tone::Accent => "\x1b[36m",
                Tone::Rule => "\x1b[90m",
                Tone::Muted => "\x1b[2m",
            }
        }
    }

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn tone(&self, s: impl AsRef<str>, tone: Tone) -> String {
            self.wrap(s.as_ref(), tone.code())
        }

        pub fn strong(&self, s: impl AsRef<str>) -> String {
            self.wrap(s.as_ref(), "\x1b[1m")
        }

        fn wrap(&self, s: &str, code: &str) -> String {
            if self.enabled { format!("{code}{s}\x1b[0m") } else { s.to_string() }
        }
    }
}

pub fn print_run(
    input: &str,
    doc: &Document,
    trace: &[UnitTrace],
    stats: &EngineStats,
    elapsed: Duration,
    color: bool,
) {
    let palette = Palette::new(color);
    let lines = input.lines().filter(|l| !l.trim().is_empty()).count();
    println!("\n{}", palette.strong(palette.tone(format!("☎  Scanning {} line(s)", lines), Tone::Accent)));

    println!("\n{}", palette.tone("━━━ Units ━━━", Tone::Rule));
    if trace.is_empty() {
        println!("{}", palette.tone("  No text units processed", Tone::Muted));
    }
    for (idx, unit) in trace.iter().enumerate() {
        print_unit(idx, unit, &palette);
    }

    println!("\n{}", palette.tone("━━━ Output ━━━", Tone::Rule));
    for &p in doc.children(doc.root()) {
        println!("  {}", doc.inner_html(p));
    }

    println!("\n{}", palette.tone("━━━ Counters ━━━", Tone::Rule));
    print_stats(stats, &palette);

    println!("\n{}", palette.tone("━━━ Timing ━━━", Tone::Rule));
    println!(
        "  Total: {}  │  Slices: {}  │  Rescans: {}",
        palette.tone(format!("{:?}", elapsed), Tone::Good),
        palette.tone(stats.slices.to_string(), Tone::Accent),
        palette.tone(stats.rescans.to_string(), Tone::Muted),
    );
    println!();
}

fn print_unit(idx: usize, unit: &UnitTrace, palette: &Palette) {
    let verdict = match &unit.verdict {
        UnitVerdict::Linked { links } => palette.tone(format!("✓ {links} link(s)"), Tone::Good),
        UnitVerdict::Unchanged => palette.tone("✗ no phone numbers", Tone::Muted),
        UnitVerdict::Skipped(reason) => palette.tone(format!("skipped ({reason:?})"), Tone::Warn),
        UnitVerdict::Hidden => palette.tone("hidden", Tone::Warn),
        UnitVerdict::Abandoned => palette.tone("rewrite abandoned", Tone::Bad),
    };
    println!("  {} {} {}", palette.tone(format!("[{}]", idx), Tone::Rule), verdict, palette.tone(preview(&unit.text), Tone::Muted));

    for c in &unit.candidates {
        let outcome = match &c.outcome {
            Ok(href) => palette.strong(palette.tone(href, Tone::Good)),
            Err(rejection) => palette.tone(rejection.to_string(), Tone::Bad),
        };
        println!(
            "      {} {} {} {}",
            palette.tone(format!("{}..{}", c.range.start, c.range.end), Tone::Warn),
            palette.tone(&c.raw, Tone::Info),
            palette.tone("│", Tone::Muted),
            outcome
        );
    }
}

fn print_stats(stats: &EngineStats, palette: &Palette) {
    let rows = [
        ("units processed", stats.units_processed),
        ("units skipped", stats.units_skipped),
        ("units hidden", stats.units_hidden),
        ("candidates", stats.candidates),
        ("links created", stats.links_created),
        ("rejected: too short", stats.rejected_short),
        ("rejected: too long", stats.rejected_long),
        ("rejected: probable card", stats.rejected_card),
        ("rewrites abandoned", stats.rewrites_abandoned),
    ];
    for (label, value) in rows {
        let shown = if value > 0 { palette.tone(value.to_string(), Tone::Info) } else { palette.tone("0", Tone::Muted) };
        println!("  {:<24} {}", palette.tone(label, Tone::Muted), shown);
    }
}

fn preview(text: &str) -> String {
    let mut s: String = text.chars().take(60).collect();
    if text.chars().count() > 60 {
        s.push('…');
    }
    format!("{s:?}")
}

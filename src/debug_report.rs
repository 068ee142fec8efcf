use parkfee::{FeeBreakdown, FeeResult, SegmentCharge, StayInterval};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// One priced facility, ready to print.
pub struct Quote {
    pub name: String,
    pub summary: String,
    pub open: bool,
    pub breakdown: FeeBreakdown,
}

pub fn print_ranking(stay: &StayInterval, quotes: &[Quote], verbose: bool, color: bool) {
    let palette = ansi::Palette::new(color);
    println!(
        "\n{}",
        palette.bold(palette.paint(
            format!(
                "🅿  Stay: {} → {} ({} min)",
                stay.entry().format("%Y-%m-%d %H:%M"),
                stay.exit().format("%Y-%m-%d %H:%M"),
                stay.minutes()
            ),
            ansi::CYAN
        ))
    );

    println!("\n{}", palette.paint("━━━ Ranking ━━━", ansi::GRAY));
    if quotes.is_empty() {
        println!("{}", palette.dim("  No facilities to rank"));
        println!();
        return;
    }

    for (idx, quote) in quotes.iter().enumerate() {
        print_quote(idx, quote, &palette);
        if verbose {
            print_segments(&quote.breakdown, &palette);
        }
    }

    if verbose {
        let elapsed: std::time::Duration = quotes.iter().map(|q| q.breakdown.elapsed).sum();
        println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
        println!(
            "  Total: {}  │  Facilities: {}",
            palette.paint(format!("{:?}", elapsed), ansi::GREEN),
            palette.dim(quotes.len().to_string()),
        );
    }
    println!();
}

fn print_quote(idx: usize, quote: &Quote, palette: &ansi::Palette) {
    let fee = match quote.breakdown.result {
        FeeResult::Fee(_) => palette.bold(palette.paint(quote.breakdown.result.to_string(), ansi::GREEN)),
        FeeResult::Unavailable => palette.paint("unavailable", ansi::RED),
    };
    let hours = if quote.open { palette.dim("open") } else { palette.paint("closed during stay", ansi::YELLOW) };

    println!(
        "  {} {} {} {} {} {}",
        palette.paint(format!("[{}]", idx), ansi::GRAY),
        palette.bold(&quote.name),
        palette.dim("│"),
        fee,
        palette.dim("│"),
        hours,
    );
    println!("      {} {}", palette.dim("rates:"), palette.paint(&quote.summary, ansi::BLUE));
    if let Some(reason) = quote.breakdown.reason {
        println!("      {} {}", palette.dim("reason:"), palette.paint(reason.to_string(), ansi::YELLOW));
    }
}

fn print_segments(breakdown: &FeeBreakdown, palette: &ansi::Palette) {
    if breakdown.segments.is_empty() {
        println!("      {}", palette.dim("(decided before segmentation)"));
        return;
    }

    for charge in &breakdown.segments {
        println!("      {}", fmt_charge(charge, palette));
    }
    if let Some(raw) = breakdown.raw_total {
        println!("      {} {}", palette.dim("raw total:"), palette.paint(format!("¥{raw}"), ansi::CYAN));
    }
}

fn fmt_charge(charge: &SegmentCharge, palette: &ansi::Palette) -> String {
    let rule = |id: Option<usize>| id.map_or_else(|| "-".to_string(), |id| format!("#{id}"));
    let span = format!("{}..{}", charge.start.format("%m-%d %H:%M"), charge.end.format("%m-%d %H:%M"));
    format!(
        "{} {} {} {} {} {}",
        palette.paint(span, ansi::YELLOW),
        palette.dim(format!("{:>4}min", charge.minutes)),
        palette.paint(format!("base {} max {}", rule(charge.base_rule), rule(charge.max_rule)), ansi::BLUE),
        palette.dim(format!("carry {}→{}", charge.carried_in, charge.carry_out)),
        palette.dim("│"),
        palette.paint(format!("¥{}", charge.fee), ansi::GREEN),
    )
}

mod debug_report;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_english::{Dialect, parse_date_string};
use log::info;
use parkfee::{
    ClampConfig, HolidayCalendar, OpeningHours, Options, RateRuleSet, RawOpeningWindow, RawRateRule, StayInterval,
    calculate_verbose_with, clamp_anomalies, summarize,
};
use serde::Deserialize;
use std::io::{self, IsTerminal};

/// One facility as exported by the facility repository.
#[derive(Debug, Deserialize)]
struct FacilityRecord {
    name: String,
    #[serde(default)]
    rules: Vec<RawRateRule>,
    #[serde(default)]
    opening_hours: Vec<RawOpeningWindow>,
}

fn main() {
    env_logger::init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let facilities = match load_facilities(&config.facilities_path) {
        Ok(facilities) => facilities,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let options = Options::default().with_classifier(config.holidays.clone());
    let classifier = options.classifier.clone();

    let mut quotes: Vec<debug_report::Quote> = Vec::new();
    for facility in facilities {
        let mut rules = RateRuleSet::from_records(&facility.rules);
        if config.clamp {
            let adjustments = clamp_anomalies(&mut rules, &ClampConfig::default());
            if !adjustments.is_empty() {
                info!("{}: {} price adjustment(s)", facility.name, adjustments.len());
            }
        }

        let hours = OpeningHours::from_records(&facility.opening_hours);
        let open = hours.is_open_for(&config.stay, &*classifier);
        if config.open_only && !open {
            info!("{}: closed during the stay, skipped", facility.name);
            continue;
        }

        let breakdown = calculate_verbose_with(&rules, config.stay, &options);
        quotes.push(debug_report::Quote { name: facility.name, summary: summarize(&rules), open, breakdown });
    }

    // Stable sort: Unavailable quotes rank after every priced one.
    quotes.sort_by(|a, b| a.breakdown.result.cmp(&b.breakdown.result));
    debug_report::print_ranking(&config.stay, &quotes, config.verbose, config.color);
}

struct CliConfig {
    facilities_path: String,
    stay: StayInterval,
    holidays: HolidayCalendar,
    clamp: bool,
    open_only: bool,
    verbose: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut facilities_path: Option<String> = None;
    let mut entry: Option<String> = None;
    let mut exit: Option<String> = None;
    let mut minutes: Option<u32> = None;
    let mut reference = Local::now().naive_local();
    let mut holidays = HolidayCalendar::new();
    let mut clamp = false;
    let mut open_only = false;
    let mut verbose = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("parkfee {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--clamp" => clamp = true,
            "--open-only" => open_only = true,
            "-v" | "--verbose" => verbose = true,
            "-f" | "--facilities" => facilities_path = Some(value("--facilities")?),
            "--entry" => entry = Some(value("--entry")?),
            "--exit" => exit = Some(value("--exit")?),
            "--minutes" => {
                let raw = value("--minutes")?;
                minutes = Some(raw.parse().map_err(|_| format!("error: invalid --minutes '{raw}'"))?);
            }
            "--reference" => {
                let raw = value("--reference")?;
                reference = parse_timestamp(&raw)
                    .ok_or_else(|| format!("error: invalid --reference '{raw}' (expected YYYY-MM-DDTHH:MM[:SS])"))?;
            }
            "--holiday" => {
                let raw = value("--holiday")?;
                let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| format!("error: invalid --holiday '{raw}' (expected YYYY-MM-DD)"))?;
                holidays.insert(date);
            }
            _ => return Err(format!("error: unknown option '{arg}'\n\n{}", help_text())),
        }
    }

    let facilities_path = facilities_path.ok_or_else(|| format!("error: --facilities is required\n\n{}", help_text()))?;
    let entry = parse_when(&entry.ok_or_else(|| "error: --entry is required".to_string())?, reference)?;
    let stay = match (exit, minutes) {
        (Some(_), Some(_)) => return Err("error: use either --exit or --minutes, not both".to_string()),
        (Some(exit), None) => StayInterval::new(entry, parse_when(&exit, reference)?),
        (None, Some(minutes)) => StayInterval::from_minutes(entry, minutes),
        (None, None) => return Err("error: --exit or --minutes is required".to_string()),
    }
    .ok_or_else(|| "error: exit must be after entry".to_string())?;

    Ok(CliConfig { facilities_path, stay, holidays, clamp, open_only, verbose, color })
}

fn load_facilities(path: &str) -> Result<Vec<FacilityRecord>, String> {
    let text = std::fs::read_to_string(path).map_err(|err| format!("error: failed to read '{path}': {err}"))?;
    serde_json::from_str(&text).map_err(|err| format!("error: invalid facility file '{path}': {err}"))
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Accept an exact timestamp or an English expression such as
/// "tomorrow 9am", resolved against `reference`.
fn parse_when(value: &str, reference: NaiveDateTime) -> Result<NaiveDateTime, String> {
    if let Some(at) = parse_timestamp(value) {
        return Ok(at);
    }
    parse_date_string(value, Utc.from_utc_datetime(&reference), Dialect::Uk)
        .map(|at| at.naive_utc())
        .map_err(|err| format!("error: cannot read time '{value}': {err}"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "parkfee {version}

Rank parking facilities by predicted fee for a stay.

Usage:
  parkfee --facilities <file.json> --entry <when> (--exit <when> | --minutes <n>) [OPTIONS]

Options:
  -f, --facilities <file>    JSON array of {{name, rules, opening_hours}} records.
  --entry <when>             Entry time: YYYY-MM-DDTHH:MM[:SS] or English
                             (\"tomorrow 9am\", \"friday 18:30\").
  --exit <when>              Exit time, same formats as --entry.
  --minutes <n>              Stay length in minutes (instead of --exit).
  --reference <timestamp>    Reference for English times. Default: now.
  --holiday <YYYY-MM-DD>     Treat a date as a holiday (repeatable).
  --clamp                    Run the anomaly clamp on ingested rates.
  --open-only                Drop facilities closed at any point of the stay.
  -v, --verbose              Print the per-segment breakdown.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging:
  RUST_LOG=parkfee=debug     Trace prechecks and segment charges.

Exit codes:
  0  Success.
  1  Facility file could not be read.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}

use log::{debug, info, warn};

use scenario_engine::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::scn::document::*;
use crate::scn::io_xlsx::read_vote_table;
use crate::scn::report::*;

mod document;
mod io_xlsx;
mod report;

#[derive(Debug, Snafu)]
pub enum ScnError {
    #[snafu(display("Error reading file {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The spreadsheet has no data"))]
    EmptyExcel {},
    #[snafu(display("Unexpected cell in row {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("The share link does not carry a valid payload: {source}"))]
    DecodingShare { source: base64::DecodeError },
    #[snafu(display("The share link is not properly escaped: {source}"))]
    DecodingLink { source: std::string::FromUtf8Error },
    #[snafu(display("Invalid scenario: {source}"))]
    InvalidScenario { source: ScenarioErrors },
    #[snafu(display("Cannot understand {arg:?}: {reason}"))]
    InvalidArgument { arg: String, reason: String },
    #[snafu(display("Difference detected between the computed summary and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ScnResult<T> = Result<T, ScnError>;

// An edit of the votes of one region, from the --set option.
#[derive(PartialEq, Debug, Clone)]
enum RegionEdit {
    Votes(RegionId, Vec<u64>),
    // A missing total means the current or default total of the region.
    Percentages(RegionId, Option<u64>, Vec<f64>),
}

fn parse_round(s: &str) -> ScnResult<RoundMode> {
    match s.trim().to_lowercase().as_str() {
        "first" | "1" | "1o" => Ok(RoundMode::FirstRound),
        "second" | "2" | "2o" => Ok(RoundMode::SecondRound),
        _ => InvalidArgumentSnafu {
            arg: s,
            reason: "expected 'first' or 'second'",
        }
        .fail(),
    }
}

/// "Name:Party:#rrggbb", where the party and the color may be left out.
fn parse_candidate(s: &str) -> CandidateSpec {
    let mut parts = s.splitn(3, ':');
    CandidateSpec {
        name: parts.next().unwrap_or("").to_string(),
        party: parts.next().unwrap_or("").to_string(),
        color: parts.next().unwrap_or("").to_string(),
    }
}

fn parse_list<T: std::str::FromStr>(arg: &str, list: &str) -> ScnResult<Vec<T>> {
    let mut res: Vec<T> = Vec::new();
    for x in list.split(',') {
        match x.trim().parse::<T>() {
            Ok(v) => res.push(v),
            Err(_) => {
                return InvalidArgumentSnafu {
                    arg,
                    reason: format!("{:?} is not a number", x),
                }
                .fail()
            }
        }
    }
    Ok(res)
}

fn parse_set(s: &str) -> ScnResult<RegionEdit> {
    let (region, rest) = s.split_once('=').context(InvalidArgumentSnafu {
        arg: s,
        reason: "expected REGION=VOTES or REGION=TOTAL:PERCENTAGES",
    })?;
    let rid = RegionId::new(region.trim());
    match rest.split_once(':') {
        Some((total, pcts)) => {
            let total = match total.trim() {
                "" => None,
                t => Some(parse_list::<u64>(s, t)?[0]),
            };
            Ok(RegionEdit::Percentages(rid, total, parse_list(s, pcts)?))
        }
        None => Ok(RegionEdit::Votes(rid, parse_list(s, rest)?)),
    }
}

fn read_region_table(path: &str) -> ScnResult<RegionTable> {
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    let raw: RegionTable = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let table = RegionTable::new(raw.groups().to_vec(), raw.regions().to_vec());
    info!(
        "read_region_table: {} regions in {} groups",
        table.regions().len(),
        table.groups().len()
    );
    Ok(table)
}

pub fn read_summary(path: &str) -> ScnResult<JSValue> {
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

// Returns the store and whether it differs from what the --state file holds.
fn load_store(args: &Args, round: Option<RoundMode>) -> ScnResult<(ScenarioStore, bool)> {
    if let Some(input) = &args.input {
        let input_type = args.input_type.as_deref().unwrap_or("json");
        info!("load_store: importing {:?} as {}", input, input_type);
        let store = match input_type {
            "json" => read_document(input)?.into_store()?,
            "xlsx" => read_vote_table(input, round)?,
            "share" => decode_share(input)?,
            x => whatever!("Input type not implemented {:?}", x),
        };
        return Ok((store, true));
    }
    if let Some(state) = &args.state {
        if Path::new(state).exists() {
            info!("load_store: restoring the scenario from {:?}", state);
            return Ok((read_document(state)?.into_store()?, false));
        }
    }
    Ok((ScenarioStore::new(), false))
}

fn apply_edits(
    store: &mut ScenarioStore,
    args: &Args,
    round: Option<RoundMode>,
    table: &RegionTable,
) -> ScnResult<()> {
    let new_round = round.filter(|r| *r != store.round_mode());
    if !args.candidate.is_empty() || new_round.is_some() {
        let round = round.unwrap_or_else(|| store.round_mode());
        let specs: Vec<CandidateSpec> = if args.candidate.is_empty() {
            store
                .candidates()
                .iter()
                .filter(|c| !c.is_others)
                .map(|c| CandidateSpec {
                    name: c.name.clone(),
                    party: c.party.clone(),
                    color: c.color.clone(),
                })
                .collect()
        } else {
            args.candidate.iter().map(|s| parse_candidate(s)).collect()
        };
        store
            .configure(round, &specs)
            .context(InvalidScenarioSnafu {})?;
    }

    for s in args.add_candidate.iter() {
        let cid = store
            .add_candidate(&parse_candidate(s))
            .context(InvalidScenarioSnafu {})?;
        info!("apply_edits: added candidate {} as {}", s, cid);
    }
    for ordinal in args.remove_candidate.iter() {
        let c = store
            .remove_candidate(CandidateId(*ordinal))
            .context(InvalidScenarioSnafu {})?;
        info!("apply_edits: removed candidate {}", c.name);
    }

    for s in args.set.iter() {
        let rid = match parse_set(s)? {
            RegionEdit::Votes(rid, votes) => {
                store
                    .set_region_votes(&rid, &votes)
                    .context(InvalidScenarioSnafu {})?;
                rid
            }
            RegionEdit::Percentages(rid, total, pcts) => {
                let total = total.unwrap_or_else(|| store.default_region_total(&rid, table));
                let votes = store
                    .set_region_percentages(&rid, total, &pcts)
                    .context(InvalidScenarioSnafu {})?;
                debug!("apply_edits: {} with {} votes -> {:?}", rid, total, votes);
                rid
            }
        };
        if table.get(&rid).is_none() {
            warn!("apply_edits: region {} is not in the table of regions", rid);
        }
    }

    for r in args.clear_region.iter() {
        if !store.clear_region(&RegionId::new(r)) {
            warn!("apply_edits: region {} had no votes", r);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct SummaryConfig<'a> {
    #[serde(rename = "roundMode")]
    round_mode: RoundMode,
    candidates: &'a [Candidate],
}

#[derive(Serialize)]
struct Summary<'a> {
    config: SummaryConfig<'a>,
    results: &'a AnalysisReport,
    map: Vec<MapRegion>,
}

fn build_summary_js(
    store: &ScenarioStore,
    report: &AnalysisReport,
    table: &RegionTable,
) -> ScnResult<JSValue> {
    let summary = Summary {
        config: SummaryConfig {
            round_mode: store.round_mode(),
            candidates: store.candidates(),
        },
        results: report,
        map: map_shading(store, table),
    };
    serde_json::to_value(&summary).context(ParsingJsonSnafu {})
}

pub fn run_scenario(args: &Args) -> ScnResult<()> {
    let table = match &args.regions {
        Some(p) => read_region_table(p)?,
        None => RegionTable::brazil(),
    };
    let round = args.round.as_deref().map(parse_round).transpose()?;

    if args.reset {
        if let Some(state) = &args.state {
            if Path::new(state).exists() {
                fs::remove_file(state).context(WritingFileSnafu { path: state })?;
                info!("run_scenario: discarded the scenario in {:?}", state);
            }
        }
    }

    let (mut store, imported) = load_store(args, round)?;
    let start = store.revision();
    apply_edits(&mut store, args, round, &table)?;
    let dirty = imported || store.revision() != start;

    let mut limits = AnalysisLimits::default();
    if let Some(n) = args.top {
        limits.top_regions = n;
        limits.balanced = n;
        limits.concentrated = n;
    }
    let report = analyze(&store, &table, &limits);
    let result_js = build_summary_js(&store, &report, &table)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match args.out.as_deref() {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingFileSnafu { path })?;
            info!("run_scenario: summary written to {:?}", path);
        }
        None => {}
    }
    if !args.quiet && args.out.as_deref() != Some("stdout") {
        print!("{}", render_report(&store, &report, &table));
    }

    for r in args.show_region.iter() {
        println!("{}", tooltip(&store, &table, &RegionId::new(r)));
    }

    if let Some(path) = &args.export {
        write_document(path, &store)?;
    }
    if let Some(base_url) = &args.share_link {
        println!("{}", share_link(base_url, &store)?);
    }
    if let Some(state) = &args.state {
        if dirty {
            write_document(state, &store)?;
        } else {
            debug!("run_scenario: scenario unchanged, not writing {:?}", state);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu { path: summary_p }.fail();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_args(state: &str) -> Args {
        Args {
            state: Some(state.to_string()),
            quiet: true,
            ..Args::default()
        }
    }

    #[test]
    fn set_syntax() {
        assert_eq!(
            parse_set("BR-SP=700,300").unwrap(),
            RegionEdit::Votes(RegionId::new("BR-SP"), vec![700, 300])
        );
        assert_eq!(
            parse_set("BR-SP=1000:60.5,39.5").unwrap(),
            RegionEdit::Percentages(RegionId::new("BR-SP"), Some(1000), vec![60.5, 39.5])
        );
        assert_eq!(
            parse_set("BR-AC=:50,50").unwrap(),
            RegionEdit::Percentages(RegionId::new("BR-AC"), None, vec![50.0, 50.0])
        );
        assert!(matches!(
            parse_set("BR-SP"),
            Err(ScnError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse_set("BR-SP=7,x"),
            Err(ScnError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn candidate_and_round_syntax() {
        let c = parse_candidate("Anna:PA:#ff0000");
        assert_eq!(
            (c.name.as_str(), c.party.as_str(), c.color.as_str()),
            ("Anna", "PA", "#ff0000")
        );
        assert_eq!(parse_candidate("Bob"), CandidateSpec::named("Bob"));
        assert_eq!(parse_round("2o").unwrap(), RoundMode::SecondRound);
        assert_eq!(parse_round("First").unwrap(), RoundMode::FirstRound);
        assert!(parse_round("third").is_err());
    }

    #[test]
    fn state_survives_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json").display().to_string();

        let mut args = state_args(&state);
        args.round = Some("second".to_string());
        args.candidate = vec!["Anna".to_string(), "Bob".to_string()];
        args.set = vec!["BR-SP=700,300".to_string()];
        run_scenario(&args).unwrap();
        assert!(Path::new(&state).exists());

        let mut args = state_args(&state);
        args.set = vec!["BR-RJ=2000:52,48".to_string()];
        run_scenario(&args).unwrap();

        let store = read_document(&state).unwrap().into_store().unwrap();
        assert_eq!(store.round_mode(), RoundMode::SecondRound);
        assert_eq!(store.region_votes(&RegionId::new("BR-SP")), vec![700, 300]);
        assert_eq!(store.region_votes(&RegionId::new("BR-RJ")), vec![1040, 960]);

        let mut args = state_args(&state);
        args.reset = true;
        run_scenario(&args).unwrap();
        assert!(!Path::new(&state).exists());
    }

    #[test]
    fn rejected_edit_keeps_the_saved_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json").display().to_string();

        let mut args = state_args(&state);
        args.round = Some("second".to_string());
        args.candidate = vec!["Anna".to_string(), "Bob".to_string()];
        args.set = vec!["BR-SP=700,300".to_string()];
        run_scenario(&args).unwrap();
        let before = fs::read_to_string(&state).unwrap();

        let mut args = state_args(&state);
        args.set = vec!["BR-SP=1000:70,40".to_string()];
        assert!(matches!(
            run_scenario(&args),
            Err(ScnError::InvalidScenario { .. })
        ));
        assert_eq!(fs::read_to_string(&state).unwrap(), before);
    }

    #[test]
    fn summary_and_reference() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("summary.json").display().to_string();

        let args = Args {
            round: Some("first".to_string()),
            candidate: vec!["Anna:PA:#ff0000".to_string(), "Bob:PB:#0000ff".to_string()],
            set: vec!["BR-SP=500,400,100".to_string(), "BR-BA=:30,60,10".to_string()],
            out: Some(out.clone()),
            quiet: true,
            ..Args::default()
        };
        run_scenario(&args).unwrap();
        let js = read_summary(&out).unwrap();
        assert_eq!(js["config"]["roundMode"], "first");
        assert_eq!(js["config"]["candidates"][2]["isOthers"], true);
        assert_eq!(js["results"]["national"]["totals"][0], 500 + 2_369_430);
        assert_eq!(js["map"].as_array().unwrap().len(), 27);

        let checked = Args {
            reference: Some(out.clone()),
            out: None,
            ..args.clone()
        };
        run_scenario(&checked).unwrap();

        let changed = Args {
            set: vec!["BR-SP=500,400,101".to_string()],
            ..checked
        };
        assert!(matches!(
            run_scenario(&changed),
            Err(ScnError::ReferenceMismatch { .. })
        ));
    }
}

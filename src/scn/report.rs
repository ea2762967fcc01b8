// Text rendering of an analysis, and the colors of the map.

use std::fmt::Write as _;

use crate::scn::*;

pub const UNCONFIGURED_COLOR: &str = "#cccccc";
const FALLBACK_RGB: (u8, u8, u8) = (0xcc, 0xcc, 0xcc);

/// 1234567 -> "1.234.567"
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut res = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            res.push('.');
        }
        res.push(c);
    }
    res
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let h = hex.strip_prefix('#')?;
    if h.len() != 6 || !h.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&h[0..2], 16).ok()?;
    let g = u8::from_str_radix(&h[2..4], 16).ok()?;
    let b = u8::from_str_radix(&h[4..6], 16).ok()?;
    Some((r, g, b))
}

/// The opacity of a region, from the share of its winner.
pub fn shade_alpha(pct: f64) -> f64 {
    if pct >= 70.0 {
        1.0
    } else if pct >= 60.0 {
        0.8
    } else if pct >= 50.0 {
        0.6
    } else if pct > 0.0 {
        0.4
    } else {
        0.2
    }
}

pub fn shade_color(hex: &str, pct: f64) -> String {
    let (r, g, b) = parse_hex_color(hex).unwrap_or_else(|| {
        warn!("shade_color: invalid color {:?}", hex);
        FALLBACK_RGB
    });
    format!("rgba({}, {}, {}, {})", r, g, b, shade_alpha(pct))
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct MapRegion {
    pub region: RegionId,
    pub name: String,
    pub fill: String,
    pub winner: Option<CandidateId>,
    #[serde(rename = "winnerPct")]
    pub winner_pct: f64,
}

/// The fill of every region of the table.
pub fn map_shading(store: &ScenarioStore, table: &RegionTable) -> Vec<MapRegion> {
    table
        .regions()
        .iter()
        .map(|info| {
            let tally = RegionTally::for_candidates(
                store.candidates(),
                store.votes().get(&info.id).unwrap_or(&[]),
            );
            let leader = tally.leader().and_then(|(cid, count)| {
                store
                    .candidate(cid)
                    .map(|c| (cid, c.color.as_str(), percentage(count, tally.total)))
            });
            match leader {
                Some((cid, color, pct)) => MapRegion {
                    region: info.id.clone(),
                    name: info.name.clone(),
                    fill: shade_color(color, pct),
                    winner: Some(cid),
                    winner_pct: round_one_decimal(pct),
                },
                None => MapRegion {
                    region: info.id.clone(),
                    name: info.name.clone(),
                    fill: UNCONFIGURED_COLOR.to_string(),
                    winner: None,
                    winner_pct: 0.0,
                },
            }
        })
        .collect()
}

/// The hover text of a region: every candidate, by decreasing number of votes.
pub fn tooltip(store: &ScenarioStore, table: &RegionTable, region: &RegionId) -> String {
    let mut res = table.name_of(region);
    if store.candidates().is_empty() || store.votes().get(region).is_none() {
        res.push_str("\n  No voting data.");
        return res;
    }
    for share in region_breakdown(store.candidates(), store.votes(), region) {
        let _ = write!(
            res,
            "\n  {}: {:.1}% ({})",
            share.name,
            share.pct,
            format_number(share.votes)
        );
    }
    res
}

fn runner_up_label(store: &ScenarioStore, m: &RegionMargin) -> String {
    match m.runner_up {
        Some(cid) => candidate_label(store.candidates(), cid).to_string(),
        None => MISSING_LABEL.to_string(),
    }
}

fn header(out: &mut String, title: &str) {
    let _ = write!(out, "\n== {} ==\n", title);
}

/// The analysis as plain text, one section after the other.
pub fn render_report(store: &ScenarioStore, report: &AnalysisReport, table: &RegionTable) -> String {
    let mut out = String::new();
    let cands = store.candidates();
    if cands.is_empty() {
        out.push_str("Configure the candidates to see the analysis.\n");
        return out;
    }
    let outcome = match &report.outcome {
        Some(o) => o,
        None => {
            out.push_str("Allocate votes in the regions to see the analysis.\n");
            return out;
        }
    };

    header(&mut out, "National result");
    let _ = writeln!(
        out,
        "{} wins with {} votes ({:.1}%)",
        outcome.name,
        format_number(outcome.votes),
        outcome.pct
    );
    if outcome.decided_in_first_round {
        out.push_str("Decided in the first round (50%+1)\n");
    } else {
        out.push_str("A second round is needed\n");
    }
    for (c, v) in cands.iter().zip(report.national.totals.iter()) {
        let _ = writeln!(
            out,
            "  {} ({}): {} ({:.1}%)",
            c.name,
            c.party,
            format_number(*v),
            round_one_decimal(percentage(*v, report.national.grand_total))
        );
    }

    if !report.top_regions.is_empty() {
        header(&mut out, "Largest electorates");
        for (idx, rv) in report.top_regions.iter().enumerate() {
            let _ = write!(out, "{}. {}: {} votes", idx + 1, rv.name, format_number(rv.total));
            if let Some(m) = report.margins.iter().find(|m| m.region == rv.region) {
                let _ = write!(
                    out,
                    " - {} ({:.1}%)",
                    candidate_label(cands, m.winner),
                    m.winner_pct
                );
            }
            out.push('\n');
        }
    }

    header(&mut out, "Regions won");
    for cw in report.regions_won.iter().filter(|cw| cw.regions_won > 0) {
        let _ = writeln!(
            out,
            "{}: {} regions, {} with an absolute majority",
            cw.name, cw.regions_won, cw.absolute_majorities
        );
    }

    if !report.top_margins.is_empty() {
        header(&mut out, "Largest margins");
        for (cid, ms) in report.top_margins.iter() {
            let _ = writeln!(out, "{}", candidate_label(cands, *cid));
            for m in ms {
                let _ = writeln!(
                    out,
                    "  {}: {:.1} points ahead ({:.1}% vs {:.1}%)",
                    table.name_of(&m.region),
                    m.margin,
                    m.winner_pct,
                    m.runner_up_pct
                );
            }
        }
    }

    if !report.swing_regions.is_empty() {
        header(
            &mut out,
            &format!("Swing regions ({})", report.swing_regions.len()),
        );
        for m in report.swing_regions.iter() {
            let _ = writeln!(
                out,
                "{}: {} ({:.1}%) vs {} ({:.1}%) - margin {:.1}",
                table.name_of(&m.region),
                candidate_label(cands, m.winner),
                m.winner_pct,
                runner_up_label(store, m),
                m.runner_up_pct,
                m.margin
            );
        }
    }

    header(&mut out, "By grouping");
    for rs in report.regional_stats.iter() {
        let winner = match rs.winner {
            Some(cid) => candidate_label(cands, cid),
            None => MISSING_LABEL,
        };
        let _ = writeln!(
            out,
            "{}: {} ({:.1}%), {} votes, {}/{} regions configured",
            rs.group,
            winner,
            rs.winner_pct,
            format_number(rs.group_total),
            rs.configured_regions,
            rs.total_regions
        );
    }

    header(&mut out, "Distribution by grouping");
    for cd in report.distribution.iter() {
        let _ = writeln!(out, "{}", cd.name);
        for gs in cd.groups.iter() {
            let _ = writeln!(
                out,
                "  {}: {:.1}% ({} votes)",
                gs.group,
                gs.pct,
                format_number(gs.votes)
            );
        }
    }

    for (title, ms) in [
        ("Most balanced regions", &report.most_balanced),
        ("Most concentrated regions", &report.most_concentrated),
    ] {
        if ms.is_empty() {
            continue;
        }
        header(&mut out, title);
        for m in ms.iter() {
            let _ = writeln!(
                out,
                "{}: {:.1} - {} ({:.1}%) vs {} ({:.1}%)",
                table.name_of(&m.region),
                m.margin,
                candidate_label(cands, m.winner),
                m.winner_pct,
                runner_up_label(store, m),
                m.runner_up_pct
            );
        }
    }
    out
}

//! Renders manager outcomes into the exact stdout text the operation
//! stream protocol requires. The core never builds strings itself; this
//! is the only place that does.

use std::collections::BTreeSet;

use repcrec_concurrency::{AbortReason, DumpTable, Outcome, ReadSource, WaitReason};

/// Render one outcome as the line(s) it produces. Every variant but
/// `Dump` yields exactly one line; `Dump` yields one line per site plus a
/// header.
pub fn format_outcome(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Begin { tid } => vec![format!("begin {tid}")],
        Outcome::BeginReadOnly { tid } => vec![format!("beginRO {tid}")],
        Outcome::Read { tid, var, value, source } => {
            vec![format!("{tid} reads {var}: {value} [{}]", format_source(*source))]
        }
        Outcome::Write { tid, var, value, target_sites } => {
            let sites = target_sites
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            vec![format!("{tid} writes {var}: {value} [to sites {sites}]")]
        }
        Outcome::Wait { tid, reason } => vec![format!("{tid} waits: {}", format_wait(*reason))],
        Outcome::Commit { tid, .. } => vec![format!("{tid} commits")],
        Outcome::Abort { tid, reason } => vec![format!("{tid} aborts{}", format_abort_suffix(*reason))],
        Outcome::SiteFails { site } => vec![format!("Site {site} fails")],
        Outcome::SiteRecovers { site } => vec![format!("Site {site} recovers")],
        Outcome::Dump(table) => format_dump(table),
    }
}

fn format_source(source: ReadSource) -> String {
    match source {
        ReadSource::WriteCache => "from write cache".to_string(),
        ReadSource::Site(site) => format!("from site {site}"),
    }
}

fn format_wait(reason: WaitReason) -> &'static str {
    match reason {
        WaitReason::NoSiteAvailableForRead => "no site available to serve this read",
        WaitReason::NoSiteAvailableForWrite => "no site available to accept this write",
    }
}

fn format_abort_suffix(reason: AbortReason) -> &'static str {
    match reason {
        AbortReason::SerializationCycle => " due to serialization cycle",
        AbortReason::FirstCommitterWins => " due to first-committer-wins",
        AbortReason::WriteSiteFailed => " because a site it wrote to failed",
        AbortReason::AlreadyAborted => "",
    }
}

/// One header row plus one row per site, tab-separated: `site`, `status`,
/// then one column per variable observed at any up site. A blank cell
/// means the variable isn't present at that site (down site, or a
/// non-replicated variable hosted elsewhere).
fn format_dump(table: &DumpTable) -> Vec<String> {
    let variables: BTreeSet<_> = table
        .rows
        .iter()
        .flat_map(|row| row.values.iter().map(|(var, _)| *var))
        .collect();

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    let mut header = vec!["site".to_string(), "status".to_string()];
    header.extend(variables.iter().map(|v| v.to_string()));
    lines.push(header.join("\t"));

    for row in &table.rows {
        let mut cells = vec![
            row.site.to_string(),
            if row.is_up { "UP".to_string() } else { "DOWN".to_string() },
        ];
        for var in &variables {
            let cell = row
                .values
                .iter()
                .find(|(v, _)| v == var)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default();
            cells.push(cell);
        }
        lines.push(cells.join("\t"));
    }
    lines
}

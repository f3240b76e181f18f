//! Markdown views of diff artifacts and histories.

use crate::diff::{BioChange, ChangedAnimal, DiffArtifact};
use crate::history::HistoryChain;
use crate::normalize::normalize_text;
use crate::types::{parse_capture_time, AnimalSummary, Record};
use std::fmt::Write;

/// Bio snippets in diff reports are shortened to this many characters.
const REPORT_SNIPPET_WIDTH: usize = 300;

/// Bio text in history logs is cut after this many characters.
const HISTORY_BIO_LIMIT: usize = 1200;

const PLACEHOLDER: &str = "...";

/// `Dec 02, 2025` for a snapshot label carrying a stamp, else the label.
fn date_label(label: &str) -> String {
    parse_capture_time(label)
        .map(|at| at.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| label.to_string())
}

fn or_unknown(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("?")
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

/// Collapse whitespace and cut at a word boundary so the result,
/// placeholder included, fits in `width` characters.
fn shorten(text: &str, width: usize) -> String {
    let text = normalize_text(Some(text));
    if text.chars().count() <= width {
        return text;
    }

    let budget = width.saturating_sub(PLACEHOLDER.len() + 1);
    let mut out = String::new();
    for word in text.split(' ') {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > budget {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        format!("{out} {PLACEHOLDER}")
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}…")
    }
}

fn animal_line(animal: &AnimalSummary) -> String {
    format!(
        "- [{}] {} ({}, {}, {}, {})",
        animal.animal_id,
        or_unknown(animal.name.as_deref()),
        or_unknown(animal.sex.as_deref()),
        or_unknown(animal.age_key.as_deref()),
        or_unknown(animal.size_key.as_deref()),
        or_unknown(animal.status.as_deref()),
    )
}

fn heading(out: &mut String, animal: &AnimalSummary) {
    let _ = writeln!(out, "### [{}] {}", animal.animal_id, or_unknown(animal.name.as_deref()));
}

fn section<'a, T: 'a>(
    out: &mut String,
    title: &str,
    items: impl IntoIterator<Item = &'a T>,
    mut body: impl FnMut(&mut String, &T),
) {
    let _ = writeln!(out, "## {title}");
    let mut any = false;
    for item in items {
        any = true;
        body(out, item);
    }
    if !any {
        out.push_str("None\n");
    }
    out.push('\n');
}

/// Human-readable report for one diff artifact.
pub fn render_diff(artifact: &DiffArtifact) -> String {
    let diff = &artifact.diff;
    let summary = &diff.summary;
    let mut out = String::new();

    out.push_str("# Roster Change Report\n");
    let _ = writeln!(
        out,
        "From **{}** to **{}**\n",
        date_label(&diff.old_snapshot),
        date_label(&diff.new_snapshot)
    );

    out.push_str("## Summary\n");
    let _ = writeln!(out, "- Old total: {}", summary.total_old);
    let _ = writeln!(out, "- New total: {}", summary.total_new);
    let _ = writeln!(out, "- Animals added: {}", summary.animals_added);
    let _ = writeln!(out, "- Animals removed: {}", summary.animals_removed);
    let _ = writeln!(out, "- Animals changed: {}", summary.animals_changed);
    if let Some(outcomes) = &artifact.removal_outcome_summary_simple {
        let _ = writeln!(
            out,
            "- Removed with a recorded outcome: {} of {}",
            outcomes.with_outcome, outcomes.total_removed
        );
    }
    out.push('\n');

    section(&mut out, "Animals Added", &diff.animals_added, |out, animal| {
        let _ = writeln!(out, "{}", animal_line(animal));
    });

    section(&mut out, "Animals Removed", &diff.animals_removed, |out, removed| {
        let line = animal_line(&removed.animal);
        match &removed.outcome_status {
            Some(Some(status)) => {
                let _ = writeln!(out, "{line}: {status}");
            }
            Some(None) => {
                let _ = writeln!(out, "{line}: no recorded outcome");
            }
            None => {
                let _ = writeln!(out, "{line}");
            }
        }
    });

    let field_changes = diff.animals_changed.iter().filter(|c| !c.delta.field_changes.is_empty());
    section(&mut out, "Profile Changes", field_changes, |out, changed: &ChangedAnimal| {
        heading(out, &changed.animal);
        for (field, change) in &changed.delta.field_changes {
            let _ = writeln!(
                out,
                "- **{field}**: `{}` → `{}`",
                or_dash(change.old.as_deref()),
                or_dash(change.new.as_deref())
            );
        }
        out.push('\n');
    });

    let trait_changes = diff.animals_changed.iter().filter(|c| c.delta.traits.is_some());
    section(&mut out, "Trait Changes", trait_changes, |out, changed: &ChangedAnimal| {
        heading(out, &changed.animal);
        if let Some(traits) = &changed.delta.traits {
            if !traits.characteristics_added.is_empty() {
                let _ = writeln!(out, "- **Added:** {}", traits.characteristics_added.join(", "));
            }
            if !traits.characteristics_removed.is_empty() {
                let _ = writeln!(out, "- **Removed:** {}", traits.characteristics_removed.join(", "));
            }
        }
        out.push('\n');
    });

    let bio_changes = diff.animals_changed.iter().filter(|c| c.delta.bio.is_some());
    section(&mut out, "Bio Changes", bio_changes, |out, changed: &ChangedAnimal| {
        heading(out, &changed.animal);
        if let Some(bio) = &changed.delta.bio {
            match (bio.kind, bio.delta_pct) {
                (BioChange::Changed, Some(pct)) => {
                    let _ = writeln!(out, "- **Bio changed:** ~{pct:.1}% different");
                }
                (BioChange::Added, _) => out.push_str("- **Bio added**\n"),
                (BioChange::Removed, _) => out.push_str("- **Bio removed**\n"),
                (BioChange::Changed, None) => out.push_str("- **Bio changed**\n"),
            }
            let old = shorten(&bio.old, REPORT_SNIPPET_WIDTH);
            let new = shorten(&bio.new, REPORT_SNIPPET_WIDTH);
            if !old.is_empty() {
                let _ = writeln!(out, "  - Old:\n    > {old}");
            }
            if !new.is_empty() {
                let _ = writeln!(out, "  - New:\n    > {new}");
            }
        }
        out.push('\n');
    });

    let location_changes = diff.animals_changed.iter().filter(|c| c.delta.location.is_some());
    section(&mut out, "Location Changes", location_changes, |out, changed: &ChangedAnimal| {
        if let Some(location) = &changed.delta.location {
            let _ = writeln!(
                out,
                "- [{}] {}: {} → {} ({})",
                changed.animal.animal_id,
                or_unknown(changed.animal.name.as_deref()),
                or_dash(location.location_old.as_deref()),
                or_dash(location.location_new.as_deref()),
                serde_json::to_value(location.change_type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            );
        }
    });

    out
}

fn latest_profile(out: &mut String, latest: &Record) {
    out.push_str("## Latest profile (from most recent snapshot)\n");
    let _ = writeln!(out, "- Name: **{}**", or_dash(latest.name.as_deref()));
    let _ = writeln!(out, "- Species: {}", or_dash(latest.species.as_deref()));
    let _ = writeln!(
        out,
        "- Sex / Age / Size: {} / {} / {}",
        or_dash(latest.sex.as_deref()),
        or_dash(latest.age_key.as_deref()),
        or_dash(latest.size_key.as_deref())
    );
    let _ = writeln!(out, "- Breed: {}", or_dash(latest.breed_primary_name.as_deref()));
    let _ = writeln!(out, "- Status: {}", or_dash(latest.status.as_deref()));
    let _ = writeln!(out, "- Location: {}\n", or_dash(latest.location.as_deref()));
}

/// Human-readable change log for one animal.
///
/// With `show_bio`, the old and new bio text is included for every bio
/// change.
pub fn render_history(chain: &HistoryChain, show_bio: bool) -> String {
    let (Some(first), Some(last)) = (chain.first_seen(), chain.last_seen()) else {
        return format!(
            "# Animal History\n\nNo snapshots contained animal_id `{}`.\n",
            chain.identity
        );
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Animal History: **[{}] {}**\n",
        chain.identity,
        or_unknown(first.record.name.as_deref())
    );
    let _ = writeln!(out, "- Snapshots found: **{}**", chain.snapshots_found);
    let _ = writeln!(out, "- First seen: **{}** ({})", first.timestamp, first.snapshot);
    let _ = writeln!(out, "- Last seen: **{}** ({})\n", last.timestamp, last.snapshot);

    latest_profile(&mut out, &last.record);

    out.push_str("## Change log\n");
    let _ = writeln!(out, "### {}: baseline ({})\n", first.timestamp, first.snapshot);

    for entry in chain.changes() {
        let Some(changes) = &entry.changes_from_prev else {
            continue;
        };
        let _ = writeln!(out, "### {} ({})", entry.timestamp, entry.snapshot);

        for (field, change) in &changes.field_changes {
            let _ = writeln!(
                out,
                "- **{field}**: `{}` → `{}`",
                or_dash(change.old.as_deref()),
                or_dash(change.new.as_deref())
            );
        }
        if let Some(location) = &changes.location {
            let _ = writeln!(
                out,
                "- **location**: `{}` → `{}`",
                or_dash(location.location_old.as_deref()),
                or_dash(location.location_new.as_deref())
            );
        }
        if let Some(traits) = &changes.traits {
            if !traits.characteristics_added.is_empty() {
                let _ = writeln!(out, "- **traits added**: {}", traits.characteristics_added.join(", "));
            }
            if !traits.characteristics_removed.is_empty() {
                let _ = writeln!(out, "- **traits removed**: {}", traits.characteristics_removed.join(", "));
            }
        }
        if let Some(bio) = &changes.bio {
            let kind = match bio.kind {
                BioChange::Added => "added",
                BioChange::Removed => "removed",
                BioChange::Changed => "changed",
            };
            let _ = writeln!(out, "- **bio**: {kind}");
            if show_bio {
                if !bio.old.is_empty() {
                    let _ = writeln!(out, "\n  **Old bio:**\n\n  > {}", truncate(&bio.old, HISTORY_BIO_LIMIT));
                }
                if !bio.new.is_empty() {
                    let _ = writeln!(out, "\n  **New bio:**\n\n  > {}", truncate(&bio.new, HISTORY_BIO_LIMIT));
                }
            }
        }
        out.push('\n');
    }

    out.push_str("## Restore pack\n");
    match &chain.restore_pack.latest_nonempty_bio {
        Some(bio) => {
            let _ = writeln!(out, "- Latest non-empty bio: **{}**\n\n```\n{}\n```", bio.timestamp, bio.text);
        }
        None => out.push_str("- Latest non-empty bio: none\n"),
    }
    match &chain.restore_pack.latest_nonempty_traits {
        Some(traits) => {
            let _ = writeln!(out, "- Latest non-empty traits: **{}**", traits.timestamp);
            if !traits.characteristic_keys.is_empty() {
                let _ = writeln!(out, "  - Keys: {}", traits.characteristic_keys.join(", "));
            }
            if !traits.characteristic_names.is_empty() {
                let _ = writeln!(out, "  - Names: {}", traits.characteristic_names.join(", "));
            }
        }
        None => out.push_str("- Latest non-empty traits: none\n"),
    }

    out
}

//! Classify yt-dlp `--newline` output lines and fold them into job progress.
//!
//! Lines look like:
//!
//! ```text
//! [download]   3.4% of   64.00MiB at    1.23MiB/s ETA 00:50
//! [download]  45.2% of ~  85.49MiB at    2.48MiB/s ETA 00:27 (frag 4/17)
//! [download] 100% of   64.00MiB in 00:01
//! [download] Destination: Video Title [id].webm
//! [Merger] Merging formats into "file.mkv"
//! [download] file.mkv has already been downloaded
//! ```
//!
//! Rules are tried in table order and the first match wins. Adding a format
//! means adding a row, not touching [`parse_line`].

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::job::JobProgress;

type Apply = fn(&Captures<'_>, &str, &mut JobProgress);

struct Rule {
    name: &'static str,
    regex: Regex,
    apply: Apply,
}

const RULE_TABLE: &[(&str, &str, Apply)] = &[
    (
        "progress",
        r"\[download\]\s+([\d.]+)%\s+of\s+~?\s*([\d.]+\s*\w+)(?:\s+at\s+(Unknown\s+B/s|[\d.]+\s*\w+/s))?(?:\s+ETA\s+(Unknown|[\d:]+))?(?:\s+\(.*\))?\s*$",
        apply_progress,
    ),
    (
        "complete",
        r"\[download\]\s+100(?:\.0)?%\s+of\s+~?\s*([\d.]+\s*\w+)\s+in\s+([\d:]+)",
        apply_complete,
    ),
    (
        "destination",
        r"\[(?:download|ExtractAudio)\]\s+Destination:\s+(.+)$",
        apply_destination,
    ),
    (
        "merge",
        r#"\[Merger\]\s+Merging formats into "(.+)""#,
        apply_merge,
    ),
    (
        "already-downloaded",
        r"\[download\]\s+(.+?)\s+has already been downloaded",
        apply_already_downloaded,
    ),
];

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .map(|&(name, pattern, apply)| Rule {
            name,
            regex: Regex::new(pattern).expect("output rule pattern is valid"),
            apply,
        })
        .collect()
});

/// Applies the first matching rule to `progress`. Returns true only if a
/// field actually changed (the caller should broadcast); a matching line
/// that repeats the current values returns false.
/// `target` is the target the job was submitted with, used to decide whether the
/// title is still a placeholder.
pub fn parse_line(line: &str, target: &str, progress: &mut JobProgress) -> bool {
    for rule in RULES.iter() {
        if let Some(caps) = rule.regex.captures(line) {
            let before = progress.clone();
            (rule.apply)(&caps, target, progress);
            tracing::trace!(rule = rule.name, "output line matched");
            return *progress != before;
        }
    }
    false
}

fn group<'a>(caps: &'a Captures<'_>, i: usize) -> Option<&'a str> {
    caps.get(i).map(|m| m.as_str().trim())
}

fn apply_progress(caps: &Captures<'_>, _target: &str, p: &mut JobProgress) {
    let pct = group(caps, 1).unwrap_or_default();
    p.progress_text = format!("{pct}%");
    if let Ok(v) = pct.parse::<f64>() {
        p.percent = v.clamp(0.0, 100.0);
    }
    if let Some(size) = group(caps, 2) {
        p.size = size.to_string();
    }
    if let Some(speed) = group(caps, 3) {
        p.speed = speed.to_string();
    }
    if let Some(eta) = group(caps, 4) {
        p.eta = eta.to_string();
    }
}

fn apply_complete(caps: &Captures<'_>, _target: &str, p: &mut JobProgress) {
    p.mark_complete();
    if let Some(size) = group(caps, 1) {
        p.size = size.to_string();
    }
    p.speed.clear();
    p.eta = "done".to_string();
}

fn apply_destination(caps: &Captures<'_>, target: &str, p: &mut JobProgress) {
    p.filename = group(caps, 1).unwrap_or_default().to_string();
    derive_title(target, p);
}

fn apply_merge(caps: &Captures<'_>, _target: &str, p: &mut JobProgress) {
    p.filename = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
}

fn apply_already_downloaded(caps: &Captures<'_>, target: &str, p: &mut JobProgress) {
    p.mark_complete();
    p.filename = group(caps, 1).unwrap_or_default().to_string();
    derive_title(target, p);
}

/// Only a placeholder title (still the target, or empty) is replaced.
fn derive_title(target: &str, p: &mut JobProgress) {
    if p.title == target || p.title.is_empty() {
        p.title = clean_title(&p.filename);
    }
}

/// Basename of `filename` without its extension.
pub fn clean_title(filename: &str) -> String {
    let base = filename
        .rfind(['/', '\\'])
        .map(|i| &filename[i + 1..])
        .unwrap_or(filename);
    let stem = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    };
    stem.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "https://x/1";

    fn fresh() -> JobProgress {
        JobProgress {
            title: TARGET.to_string(),
            ..JobProgress::default()
        }
    }

    #[test]
    fn progress_line_with_speed_and_eta() {
        let mut p = fresh();
        let line = "[download]  45.2% of ~  85.49MiB at 2.48MiB/s ETA 00:27";
        assert!(parse_line(line, TARGET, &mut p));
        assert_eq!(p.percent, 45.2);
        assert_eq!(p.progress_text, "45.2%");
        assert_eq!(p.size, "85.49MiB");
        assert_eq!(p.speed, "2.48MiB/s");
        assert_eq!(p.eta, "00:27");
    }

    #[test]
    fn progress_line_with_fragment_suffix() {
        let mut p = fresh();
        let line = "[download]  45.2% of ~  85.49MiB at    2.48MiB/s ETA 00:27 (frag 4/17)";
        assert!(parse_line(line, TARGET, &mut p));
        assert_eq!(p.speed, "2.48MiB/s");
        assert_eq!(p.eta, "00:27");
    }

    #[test]
    fn progress_line_without_speed_keeps_previous_speed() {
        let mut p = fresh();
        p.speed = "1.00MiB/s".into();
        assert!(parse_line("[download]   3.4% of   64.00MiB", TARGET, &mut p));
        assert_eq!(p.percent, 3.4);
        assert_eq!(p.size, "64.00MiB");
        assert_eq!(p.speed, "1.00MiB/s");
    }

    #[test]
    fn progress_line_with_unknown_speed_and_eta() {
        let mut p = fresh();
        let line = "[download]   0.0% of   10.00MiB at  Unknown B/s ETA Unknown";
        assert!(parse_line(line, TARGET, &mut p));
        assert_eq!(p.speed, "Unknown B/s");
        assert_eq!(p.eta, "Unknown");
    }

    #[test]
    fn completion_line_sets_done() {
        let mut p = fresh();
        p.speed = "2.48MiB/s".into();
        p.eta = "00:01".into();
        assert!(parse_line("[download] 100% of   64.00MiB in 00:01", TARGET, &mut p));
        assert_eq!(p.percent, 100.0);
        assert_eq!(p.progress_text, "100%");
        assert_eq!(p.size, "64.00MiB");
        assert_eq!(p.eta, "done");
        assert!(p.speed.is_empty());
    }

    #[test]
    fn destination_sets_filename_and_placeholder_title() {
        let mut p = fresh();
        let line = "[download] Destination: /dl/Some Clip [abc123].webm";
        assert!(parse_line(line, TARGET, &mut p));
        assert_eq!(p.filename, "/dl/Some Clip [abc123].webm");
        assert_eq!(p.title, "Some Clip [abc123]");
    }

    #[test]
    fn destination_does_not_overwrite_derived_title() {
        let mut p = fresh();
        assert!(parse_line("[download] Destination: first.f137.mp4", TARGET, &mut p));
        assert_eq!(p.title, "first.f137");
        assert!(parse_line("[ExtractAudio] Destination: first.mp3", TARGET, &mut p));
        assert_eq!(p.filename, "first.mp3");
        assert_eq!(p.title, "first.f137");
    }

    #[test]
    fn merge_updates_filename_only() {
        let mut p = fresh();
        p.title = "Clip".into();
        assert!(parse_line(
            r#"[Merger] Merging formats into "Clip [id].mkv""#,
            TARGET,
            &mut p
        ));
        assert_eq!(p.filename, "Clip [id].mkv");
        assert_eq!(p.title, "Clip");
    }

    #[test]
    fn merge_keeps_placeholder_title() {
        let mut p = fresh();
        assert!(parse_line(
            r#"[Merger] Merging formats into "Clip.mkv""#,
            TARGET,
            &mut p
        ));
        assert_eq!(p.title, TARGET);
    }

    #[test]
    fn already_downloaded_counts_as_complete() {
        let mut p = fresh();
        assert!(parse_line(
            "[download] myvid.mp4 has already been downloaded",
            TARGET,
            &mut p
        ));
        assert_eq!(p.percent, 100.0);
        assert_eq!(p.filename, "myvid.mp4");
        assert_eq!(p.title, "myvid");
    }

    #[test]
    fn unmatched_line_changes_nothing() {
        let mut p = fresh();
        p.size = "1MiB".into();
        let before = p.clone();
        for line in [
            "[youtube] Extracting URL: https://x/1",
            "[info] abc: Downloading 1 format(s): 248+251",
            "",
            "WARNING: something odd",
        ] {
            assert!(!parse_line(line, TARGET, &mut p), "matched {line:?}");
        }
        assert_eq!(p, before);
    }

    #[test]
    fn repeated_line_reports_no_change() {
        let mut p = fresh();
        let line = "[download]  45.2% of ~  85.49MiB at 2.48MiB/s ETA 00:27";
        assert!(parse_line(line, TARGET, &mut p));
        let after_first = p.clone();
        assert!(!parse_line(line, TARGET, &mut p));
        assert_eq!(p, after_first);
        assert!(parse_line(
            "[download]  45.3% of ~  85.49MiB at 2.48MiB/s ETA 00:27",
            TARGET,
            &mut p
        ));
    }

    #[test]
    fn clean_title_strips_dirs_and_extension() {
        assert_eq!(clean_title("/a/b/clip.final.mp4"), "clip.final");
        assert_eq!(clean_title(r"C:\x\clip.mp4"), "clip");
        assert_eq!(clean_title(".hidden"), ".hidden");
        assert_eq!(clean_title("noext"), "noext");
    }
}

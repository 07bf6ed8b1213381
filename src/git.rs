//! Driver for the external `git` executable.
//!
//! Every invocation is synchronous, captures both output streams, and is
//! bounded by a per-invocation timeout. Uses the git CLI rather than a
//! library binding so clones, forced checkouts, and log parsing behave
//! exactly as they do for a human operator.

use std::path::Path;
use std::time::Duration;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use subprocess::Exec;
use subprocess::Redirection;

use crate::graph::HistoryEntry;
use crate::graph::HistoryFile;

const CLONE_TIMEOUT: Duration = Duration::from_secs(300);
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(60);
const LOG_TIMEOUT: Duration = Duration::from_secs(60);

lazy_static! {
    static ref INSERTION_RE: Regex = Regex::new(r"(\d+) insertion").unwrap();
    static ref DELETION_RE: Regex = Regex::new(r"(\d+) deletion").unwrap();
}

/// One commit from the enumerated history.
///
/// `impact` is the sum of insertions and deletions reported by
/// `--shortstat`; commits without a summary line (e.g. merges) have zero
/// impact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub hash: String,
    pub date: String,
    pub impact: u64,
}

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

fn run_git(cwd: Option<&Path>, args: &[&str], timeout: Duration) -> Result<GitOutput> {
    let mut cmd = Exec::cmd("git")
        .args(args)
        .stdout(Redirection::Pipe)
        .stderr(Redirection::Pipe);

    if let Some(dir) = cwd {
        cmd = cmd.cwd(dir);
    }

    let mut popen = cmd.popen().context("failed to invoke git")?;
    let mut comm = popen.communicate_start(None).limit_time(timeout);

    match comm.read_string() {
        Ok((stdout, stderr)) => {
            let status = popen.wait()?;
            Ok(GitOutput {
                success: status.success(),
                stdout: stdout.unwrap_or_default(),
                stderr: stderr.unwrap_or_default(),
            })
        }
        Err(_) => {
            popen.kill().ok();
            popen.wait().ok();
            bail!("git {} timed out after {}s", args.first().unwrap_or(&""), timeout.as_secs());
        }
    }
}

/// Clone `url` into `dest` with full history, then check out `refname` if
/// one was requested.
pub fn clone_repository(url: &str, refname: Option<&str>, dest: &Path) -> Result<()> {
    let dest = dest.to_string_lossy();
    let out = run_git(None, &["clone", url, dest.as_ref()], CLONE_TIMEOUT)?;

    if !out.success {
        bail!("git clone failed: {}", out.stderr.trim());
    }

    if let Some(refname) = refname {
        let out = run_git(Some(Path::new(dest.as_ref())), &["checkout", refname], CHECKOUT_TIMEOUT)?;

        if !out.success {
            bail!("git checkout {} failed: {}", refname, out.stderr.trim());
        }
    }

    Ok(())
}

/// List every commit reachable from HEAD, newest first, with its impact.
///
/// A non-zero exit is tolerated; whatever made it to stdout is parsed.
pub fn enumerate_commits(workspace: &Path) -> Result<Vec<CommitRef>> {
    let out = run_git(
        Some(workspace),
        &["log", "--pretty=format:%H|%cd", "--shortstat"],
        LOG_TIMEOUT,
    )?;

    if !out.success {
        log::debug!("git log exited nonzero while enumerating commits");
    }

    Ok(parse_shortstat_log(&out.stdout))
}

/// Force-checkout an arbitrary commit, discarding local modifications.
///
/// Failures are logged and swallowed: the snapshot is built from whatever
/// the tree contains afterwards.
pub fn checkout_commit(workspace: &Path, hash: &str) {
    match run_git(Some(workspace), &["checkout", "-f", hash], CHECKOUT_TIMEOUT) {
        Ok(out) if !out.success => {
            log::warn!("forced checkout of {} failed; analyzing tree as-is", hash);
        }
        Err(err) => log::warn!("forced checkout of {} failed: {:#}", hash, err),
        Ok(_) => {}
    }
}

/// Collect the most recent `limit` commits from HEAD with per-file change
/// status. Any failure yields an empty list.
pub fn recent_history(workspace: &Path, limit: usize) -> Vec<HistoryEntry> {
    let count = format!("-{}", limit);
    let args = ["log", count.as_str(), "--pretty=format:%H|%s|%an|%at", "--name-status"];

    match run_git(Some(workspace), &args, LOG_TIMEOUT) {
        Ok(out) if out.success => parse_name_status_log(&out.stdout),
        Ok(_) => {
            log::warn!("git log exited nonzero while collecting history");
            Vec::new()
        }
        Err(err) => {
            log::warn!("failed to collect recent history: {:#}", err);
            Vec::new()
        }
    }
}

/// Parse `git log --pretty=format:%H|%cd --shortstat` output.
///
/// Each header line is optionally followed by blank lines and one
/// `... changed ...` summary. Missing summaries mean zero impact; missing
/// insertion or deletion counts mean zero for that side.
fn parse_shortstat_log(text: &str) -> Vec<CommitRef> {
    let lines: Vec<&str> = text.lines().collect();
    let mut commits = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;

        let Some((hash, date)) = line.split_once('|') else {
            continue;
        };

        let mut impact = 0;
        let mut j = i;

        while j < lines.len() && lines[j].trim().is_empty() {
            j += 1;
        }

        if j < lines.len() && lines[j].contains("changed") && !lines[j].contains('|') {
            impact = parse_impact(lines[j]);
            i = j + 1;
        }

        commits.push(CommitRef { hash: hash.to_string(), date: date.to_string(), impact });
    }

    commits
}

fn parse_impact(stat: &str) -> u64 {
    let insertions = INSERTION_RE
        .captures(stat)
        .and_then(|c| c[1].parse::<u64>().ok())
        .unwrap_or(0);
    let deletions = DELETION_RE
        .captures(stat)
        .and_then(|c| c[1].parse::<u64>().ok())
        .unwrap_or(0);
    insertions + deletions
}

/// Parse `git log --pretty=format:%H|%s|%an|%at --name-status` output.
///
/// Header lines carry at least three `|` separators; the lines beneath each
/// header are `<status>\t<path>` records. Rename records carry two paths and
/// collapse to the last one, keeping the first character of the status token.
fn parse_name_status_log(text: &str) -> Vec<HistoryEntry> {
    let mut history: Vec<HistoryEntry> = Vec::new();

    for line in text.trim().lines() {
        if line.matches('|').count() >= 3 {
            let mut parts = line.splitn(4, '|');
            let hash = parts.next().unwrap_or_default();
            let message = parts.next().unwrap_or_default();
            let author = parts.next().unwrap_or_default();
            let timestamp = parts.next().unwrap_or_default().parse::<u64>().unwrap_or(0);

            history.push(HistoryEntry {
                hash: hash.to_string(),
                message: message.to_string(),
                author: author.to_string(),
                timestamp,
                files: Vec::new(),
            });
        } else if let Some(current) = history.last_mut() {
            if line.trim().is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split('\t').collect();

            if parts.len() >= 2 {
                let status = parts[0].chars().next().unwrap_or('M');
                let path = parts[parts.len() - 1];
                current.files.push(HistoryFile {
                    path: path.to_string(),
                    status: status.to_string(),
                });
            }
        }
    }

    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortstat_parses_header_and_summary() {
        let text = "abc123|Mon Jul 1 2024\n\n 3 files changed, 10 insertions(+), 2 deletions(-)\n";
        let commits = parse_shortstat_log(text);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, "abc123");
        assert_eq!(commits[0].date, "Mon Jul 1 2024");
        assert_eq!(commits[0].impact, 12);
    }

    #[test]
    fn shortstat_tolerates_missing_summary_and_keeps_following_commit() {
        // Merge commits emit no summary; the next header must still be kept.
        let text = "merge1|Tue\nabc2|Mon\n\n 1 file changed, 5 insertions(+)\n";
        let commits = parse_shortstat_log(text);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "merge1");
        assert_eq!(commits[0].impact, 0);
        assert_eq!(commits[1].hash, "abc2");
        assert_eq!(commits[1].impact, 5);
    }

    #[test]
    fn shortstat_tolerates_missing_deletions_and_extra_blanks() {
        let text = "a|d1\n\n\n\n 1 file changed, 7 insertions(+)\n\nb|d2\n\n 2 files changed, 3 deletions(-)\n";
        let commits = parse_shortstat_log(text);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].impact, 7);
        assert_eq!(commits[1].impact, 3);
    }

    #[test]
    fn shortstat_of_empty_output_is_empty() {
        assert!(parse_shortstat_log("").is_empty());
    }

    #[test]
    fn name_status_parses_headers_and_files() {
        let text = "h1|add feature|Alice|1700000000\nM\tsrc/app.py\nA\tsrc/util.py\n\nh2|init|Bob|1690000000\nA\tREADME.md\n";
        let history = parse_name_status_log(text);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].hash, "h1");
        assert_eq!(history[0].message, "add feature");
        assert_eq!(history[0].author, "Alice");
        assert_eq!(history[0].timestamp, 1700000000);
        assert_eq!(history[0].files.len(), 2);
        assert_eq!(history[0].files[0].path, "src/app.py");
        assert_eq!(history[0].files[0].status, "M");
        assert_eq!(history[1].files[0].path, "README.md");
    }

    #[test]
    fn name_status_collapses_renames_to_last_path() {
        let text = "h1|rename|Alice|1700000000\nR100\told/name.py\tnew/name.py\n";
        let history = parse_name_status_log(text);
        assert_eq!(history[0].files.len(), 1);
        assert_eq!(history[0].files[0].path, "new/name.py");
        assert_eq!(history[0].files[0].status, "R");
    }

    #[test]
    fn name_status_ignores_garbage_timestamp() {
        let text = "h1|msg|Alice|not-a-number\nM\ta.py\n";
        let history = parse_name_status_log(text);
        assert_eq!(history[0].timestamp, 0);
    }
}

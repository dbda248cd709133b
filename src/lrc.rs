//! LRC (`[mm:ss.xx]text`) to timed lyric lines.

use crate::lyrics::LyricLine;

/// Seconds a line stays up when no later timestamp follows it.
const DEFAULT_LINE_SECS: f64 = 4.0;

/// Parse a `[mm:ss.xx]` or `[mm:ss]` tag at the start of `line`.
fn parse_timestamp(line: &str) -> Option<(f64, &str)> {
  let rest = line.strip_prefix('[')?;
  let (tag, text) = rest.split_once(']')?;
  let (mins, secs) = tag.split_once(':')?;
  if mins.is_empty() || !mins.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }
  let mins: u32 = mins.parse().ok()?;
  let secs: f64 = secs.parse().ok()?;
  if !(0.0..60.0).contains(&secs) {
    return None;
  }
  Some((f64::from(mins) * 60.0 + secs, text))
}

/// Convert LRC text to lyric lines. Each line ends where the next timestamp
/// starts; the last one gets a fixed duration. Metadata tags (`[ar:...]`) and
/// untimed lines are skipped, as are timestamps with empty text.
pub fn parse_lrc(input: &str) -> Vec<LyricLine> {
  let stamps: Vec<(f64, &str)> = input.lines().map(str::trim).filter_map(parse_timestamp).collect();

  stamps
    .iter()
    .enumerate()
    .filter_map(|(i, (start, text))| {
      let text = text.trim();
      if text.is_empty() {
        return None;
      }
      let end = stamps[i + 1..].iter().map(|(t, _)| *t).find(|t| t > start).unwrap_or(start + DEFAULT_LINE_SECS);
      Some(LyricLine { text: text.to_string(), start_time: *start, end_time: end })
    })
    .collect()
}

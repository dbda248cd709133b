use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::DecodeError;

/// UTF-8 encode then standard (padded) base64.
pub fn encode_base64(text: &str) -> String {
  BASE64.encode(text.as_bytes())
}

/// Decode standard base64 into a UTF-8 string. Whitespace anywhere in the
/// input is ignored, so `db64` accepts output wrapped across arguments.
pub fn decode_base64(data: &str) -> Result<String, DecodeError> {
  let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
  let bytes = BASE64.decode(cleaned.as_bytes())?;
  Ok(String::from_utf8(bytes)?)
}

/// Escape the five markup-significant characters.
pub fn escape_markup(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

/// Inverse of [`escape_markup`] for the entities it produces. Unknown
/// entities are left as-is.
pub fn unescape_markup(text: &str) -> String {
  const ENTITIES: [(&str, char); 5] = [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"'), ("&#39;", '\'')];

  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(pos) = rest.find('&') {
    out.push_str(&rest[..pos]);
    rest = &rest[pos..];
    match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
      Some((entity, c)) => {
        out.push(*c);
        rest = &rest[entity.len()..];
      }
      None => {
        out.push('&');
        rest = &rest[1..];
      }
    }
  }
  out.push_str(rest);
  out
}

/// Format a playback position as `mm:ss`.
pub fn format_clock(seconds: f64) -> String {
  let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
  format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn base64_round_trips_unicode() {
    for s in ["", "hello", "xin chào", "日本語テキスト", "emoji 🎵 ok", "a\nb\tc"] {
      assert_eq!(decode_base64(&encode_base64(s)).unwrap(), s);
    }
  }

  #[test]
  fn encode_matches_known_vector() {
    assert_eq!(encode_base64("hello world"), "aGVsbG8gd29ybGQ=");
    assert_eq!(encode_base64("é"), "w6k=");
  }

  #[test]
  fn decode_ignores_whitespace() {
    assert_eq!(decode_base64("aGVs bG8g\nd29y bGQ=").unwrap(), "hello world");
  }

  #[test]
  fn decode_rejects_garbage() {
    assert!(matches!(decode_base64("not base64!!"), Err(DecodeError::Base64(_))));
    assert!(matches!(decode_base64("abc"), Err(DecodeError::Base64(_))));
  }

  #[test]
  fn decode_rejects_invalid_utf8() {
    // 0xff 0xfe is never valid UTF-8
    assert!(matches!(decode_base64("//4="), Err(DecodeError::Utf8(_))));
  }

  #[test]
  fn escape_all_five() {
    assert_eq!(escape_markup(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
  }

  #[test]
  fn unescape_inverts_escape() {
    let s = r#"Tom & "Jerry" <3 'cheese'"#;
    assert_eq!(unescape_markup(&escape_markup(s)), s);
  }

  #[test]
  fn unescape_leaves_unknown_entities() {
    assert_eq!(unescape_markup("a &nbsp; b & c"), "a &nbsp; b & c");
  }

  #[test]
  fn clock_formatting() {
    assert_eq!(format_clock(0.0), "00:00");
    assert_eq!(format_clock(61.9), "01:01");
    assert_eq!(format_clock(-3.0), "00:00");
    assert_eq!(format_clock(f64::NAN), "00:00");
  }
}

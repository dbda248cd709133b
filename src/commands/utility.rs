use rand::Rng;

use super::{OutputLine, Reply};
use crate::codec::{decode_base64, encode_base64};

pub fn echo(args: &[String]) -> Reply {
  let text = args.join(" ");
  Reply::line(OutputLine::output(if text.is_empty() { "ECHO is on.".to_string() } else { text }))
}

pub fn b64(args: &[String]) -> Reply {
  if args.is_empty() {
    return Reply::line(OutputLine::output("Error: Empty string"));
  }
  Reply::line(OutputLine::output(encode_base64(&args.join(" "))))
}

pub fn db64(args: &[String]) -> Reply {
  if args.is_empty() {
    return Reply::line(OutputLine::output("Error: Empty string"));
  }
  match decode_base64(&args.concat()) {
    Ok(text) => Reply::line(OutputLine::output(text)),
    Err(_) => Reply::line(OutputLine::output("Error: Invalid Base64 string")),
  }
}

/// Draw a number in `[0, 1)`; with an argument, also judge the guess.
pub fn random(args: &[String], rng: &mut impl Rng) -> Reply {
  let result: f64 = rng.r#gen();
  let Some(guess) = args.first() else {
    return Reply::line(OutputLine::output(result.to_string()));
  };
  let correct = guess.parse::<f64>().is_ok_and(|g| g == result);
  Reply::lines(vec![
    OutputLine::output(if correct { "You predicted the correct number" } else { "You predicted the wrong number" }),
    OutputLine::output(format!("The correct answer is: {}", result)),
    OutputLine::output("Take a look at https://github.com/aiko-chan-ai/v8-randomness-predictor"),
  ])
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
  }

  fn text(reply: &Reply) -> Vec<&str> {
    reply.lines.iter().map(|l| l.text.as_str()).collect()
  }

  #[test]
  fn echo_joins_or_defaults() {
    assert_eq!(text(&echo(&args(&["a", "b"]))), vec!["a b"]);
    assert_eq!(text(&echo(&[])), vec!["ECHO is on."]);
  }

  #[test]
  fn b64_round_trips_through_db64() {
    let encoded = b64(&args(&["héllo", "wörld"])).lines[0].text.clone();
    assert_eq!(text(&db64(&[encoded])), vec!["héllo wörld"]);
  }

  #[test]
  fn empty_and_invalid_inputs() {
    assert_eq!(text(&b64(&[])), vec!["Error: Empty string"]);
    assert_eq!(text(&db64(&[])), vec!["Error: Empty string"]);
    assert_eq!(text(&db64(&args(&["%%%"]))), vec!["Error: Invalid Base64 string"]);
    // Valid base64, invalid UTF-8.
    assert_eq!(text(&db64(&args(&["/w=="]))), vec!["Error: Invalid Base64 string"]);
  }

  #[test]
  fn random_without_guess_prints_number() {
    let mut rng = StdRng::seed_from_u64(7);
    let reply = random(&[], &mut rng);
    let n: f64 = reply.lines[0].text.parse().unwrap();
    assert!((0.0..1.0).contains(&n));
  }

  #[test]
  fn random_judges_guess() {
    let expected: f64 = StdRng::seed_from_u64(1).r#gen();
    let right = random(&args(&[&expected.to_string()]), &mut StdRng::seed_from_u64(1));
    assert_eq!(right.lines[0].text, "You predicted the correct number");
    assert_eq!(right.lines[1].text, format!("The correct answer is: {}", expected));

    let wrong = random(&args(&["banana"]), &mut StdRng::seed_from_u64(1));
    assert_eq!(wrong.lines[0].text, "You predicted the wrong number");
    assert_eq!(wrong.lines.len(), 3);
  }
}

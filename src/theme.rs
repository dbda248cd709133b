use ratatui::style::Color;

/// A Catppuccin flavour mapped onto the roles the UI draws with.
#[derive(Debug)]
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub subtext: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub error: Color,
  pub status: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  // Markup colours
  pub green: Color,
  pub blue: Color,
  pub red: Color,
  pub pink: Color,
}

pub static THEMES: [Theme; 4] = [
  Theme {
    name: "mocha",
    bg: Color::Rgb(30, 30, 46),
    fg: Color::Rgb(205, 214, 244),
    subtext: Color::Rgb(166, 173, 200),
    muted: Color::Rgb(108, 112, 134),
    accent: Color::Rgb(203, 166, 247),
    border: Color::Rgb(69, 71, 90),
    error: Color::Rgb(243, 139, 168),
    status: Color::Rgb(249, 226, 175),
    key_fg: Color::Rgb(30, 30, 46),
    key_bg: Color::Rgb(137, 180, 250),
    green: Color::Rgb(166, 227, 161),
    blue: Color::Rgb(137, 180, 250),
    red: Color::Rgb(243, 139, 168),
    pink: Color::Rgb(245, 194, 231),
  },
  Theme {
    name: "macchiato",
    bg: Color::Rgb(36, 39, 58),
    fg: Color::Rgb(202, 211, 245),
    subtext: Color::Rgb(165, 173, 203),
    muted: Color::Rgb(110, 115, 141),
    accent: Color::Rgb(198, 160, 246),
    border: Color::Rgb(73, 77, 100),
    error: Color::Rgb(237, 135, 150),
    status: Color::Rgb(238, 212, 159),
    key_fg: Color::Rgb(36, 39, 58),
    key_bg: Color::Rgb(138, 173, 244),
    green: Color::Rgb(166, 218, 149),
    blue: Color::Rgb(138, 173, 244),
    red: Color::Rgb(237, 135, 150),
    pink: Color::Rgb(245, 189, 230),
  },
  Theme {
    name: "frappe",
    bg: Color::Rgb(48, 52, 70),
    fg: Color::Rgb(198, 208, 245),
    subtext: Color::Rgb(165, 173, 206),
    muted: Color::Rgb(115, 121, 148),
    accent: Color::Rgb(202, 158, 230),
    border: Color::Rgb(81, 87, 109),
    error: Color::Rgb(231, 130, 132),
    status: Color::Rgb(229, 200, 144),
    key_fg: Color::Rgb(48, 52, 70),
    key_bg: Color::Rgb(140, 170, 238),
    green: Color::Rgb(166, 209, 137),
    blue: Color::Rgb(140, 170, 238),
    red: Color::Rgb(231, 130, 132),
    pink: Color::Rgb(244, 184, 228),
  },
  Theme {
    name: "latte",
    bg: Color::Rgb(239, 241, 245),
    fg: Color::Rgb(76, 79, 105),
    subtext: Color::Rgb(108, 111, 133),
    muted: Color::Rgb(156, 160, 176),
    accent: Color::Rgb(136, 57, 239),
    border: Color::Rgb(188, 192, 204),
    error: Color::Rgb(210, 15, 57),
    status: Color::Rgb(223, 142, 29),
    key_fg: Color::Rgb(239, 241, 245),
    key_bg: Color::Rgb(30, 102, 245),
    green: Color::Rgb(64, 160, 43),
    blue: Color::Rgb(30, 102, 245),
    red: Color::Rgb(210, 15, 57),
    pink: Color::Rgb(234, 118, 203),
  },
];

/// Index of the theme called `name`, falling back to the first.
pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_are_unique() {
    let mut names: Vec<_> = THEMES.iter().map(|t| t.name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), THEMES.len());
  }

  #[test]
  fn lookup_by_name() {
    assert_eq!(theme_index(Some("Latte")), 3);
    assert_eq!(theme_index(Some("unknown")), 0);
    assert_eq!(theme_index(None), 0);
  }
}

//! Profile and help output.

use tracing::warn;

use super::{CommandTable, OutputLine, Reply};
use crate::codec::escape_markup;
use crate::constants::constants;
use crate::remote::{ProfileClient, Transport};

const BIO: [&str; 3] = [
  "Hewwo! I'm a student from Vietnam.",
  "I enjoy playing <green>Open-world, FPS Games, Adventure, Platformer, Rhythm </green>and <i>some lewd visual novels (shhh, don&#39;t tell anyone!)</i>",
  "I <red>love</red> programming and have a few small projects (check out my github!)",
];

fn github_link() -> String {
  format!("GitHub: https://github.com/{}", constants().github_html_user)
}

pub fn help(table: &CommandTable) -> Reply {
  let version = &constants().help_version;
  let mut parts = version.splitn(3, '.');
  let (major, minor, patch) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""), parts.next().unwrap_or(""));

  let mut lines = vec![
    OutputLine::markup(format!(
      "<b>Available Commands - Web bash v<green>{}</green>.<blue>{}</blue>.<red>{}</red></b>",
      escape_markup(major),
      escape_markup(minor),
      escape_markup(patch)
    )),
    OutputLine::markup("<dim>Type any command below and press Enter. Use <blue>Tab</blue> or <blue>→</blue> to autocomplete.</dim>"),
  ];
  let width = table.commands().iter().map(|c| c.display.chars().count()).max().unwrap_or(0);
  lines.extend(table.commands().iter().map(|c| {
    OutputLine::markup(format!(
      "{} <green>{:<width$}</green>  {}",
      escape_markup(&c.icon),
      escape_markup(c.display),
      escape_markup(c.description),
    ))
  }));
  Reply::lines(lines)
}

pub async fn info<T: Transport>(remote: &ProfileClient<T>) -> Reply {
  let html_user = &constants().github_html_user;
  match remote.user().await {
    Ok(u) => {
      let name = escape_markup(u.name.as_deref().unwrap_or(html_user));
      let mut lines = vec![OutputLine::markup(format!(
        "<b><u>{}</u></b>  <blue>@{}</blue>  ({} followers · {} following)",
        name,
        escape_markup(&html_user.to_lowercase()),
        u.followers.unwrap_or(0),
        u.following.unwrap_or(0),
      ))];
      if let Some(avatar) = u.avatar_url.as_deref().filter(|a| !a.is_empty()) {
        lines.push(OutputLine::markup(format!("<dim>{}</dim>", escape_markup(avatar))));
      }
      lines.extend(BIO.iter().map(|l| OutputLine::markup(*l)));
      Reply::lines(lines)
    }
    Err(e) => {
      warn!(err = %e, "commands: profile lookup failed");
      Reply::line(OutputLine::output(github_link()))
    }
  }
}

pub fn whoami() -> Reply {
  Reply::line(OutputLine::output(constants().github_html_user.clone()))
}

pub fn repo() -> Reply {
  Reply::line(OutputLine::output(github_link()))
}

pub fn social() -> Reply {
  let c = constants();
  Reply::lines(vec![
    OutputLine::output(format!("GitHub  → https://github.com/{}", c.github_html_user)),
    OutputLine::output(format!("Email   → {}", c.email)),
  ])
}

pub fn email() -> Reply {
  Reply::line(OutputLine::output(constants().email.clone()))
}

pub fn banner() -> Reply {
  Reply::line(OutputLine::output(constants().banner.clone()))
}

pub async fn projects<T: Transport>(remote: &ProfileClient<T>) -> Reply {
  let c = constants();
  match remote.top_repositories(c.projects_limit).await {
    Ok(repos) => {
      let profile_url = format!("https://github.com/{}", c.github_html_user);
      let mut lines = vec![OutputLine::output("Major Projects:")];
      lines.extend(repos.iter().map(|r| {
        let url = r.html_url.as_deref().filter(|u| u.starts_with("https://github.com/")).unwrap_or(&profile_url);
        OutputLine::markup(format!(
          "• <blue><u>{}</u></blue> — Stars: {}  Forks: {}  <dim>{}</dim>",
          escape_markup(r.name.as_deref().unwrap_or("")),
          r.stargazers_count.unwrap_or(0),
          r.forks_count.unwrap_or(0),
          escape_markup(url),
        ))
      }));
      lines.push(OutputLine::blank());
      lines.push(OutputLine::output(github_link()));
      Reply::lines(lines)
    }
    Err(e) => {
      warn!(err = %e, "commands: repository lookup failed");
      Reply::line(OutputLine::output(github_link()))
    }
  }
}

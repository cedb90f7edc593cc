use crate::catalog::{self, CatalogView, LinkTarget, ProfileSummary};
use crate::models::Repository;
use chrono::{DateTime, Utc};
use colored::*;

pub fn print_profile(summary: &ProfileSummary, generated_at: DateTime<Utc>, now: DateTime<Utc>) {
    println!("{}", summary.name.bold().green());
    println!("{}", summary.bio.dimmed());
    println!(
        "{} projects  ★ {} stars  (updated {})",
        summary.public_repos,
        summary.total_stars,
        catalog::format_age(generated_at, now)
    );
    println!("{}\n", "=".repeat(50).dimmed());
}

pub fn print_view(view: &CatalogView<'_>, link: LinkTarget, owner: &str, now: DateTime<Utc>) {
    if view.is_empty() {
        println!("{}", "No repositories match the current filters.".yellow());
        return;
    }

    if !view.featured.is_empty() {
        println!("{}", "Featured".bold().yellow());
        for repo in &view.featured {
            print_card(repo, link, owner, now);
        }
        println!();
    }

    for repo in &view.others {
        print_card(repo, link, owner, now);
    }
}

fn print_card(repo: &Repository, link: LinkTarget, owner: &str, now: DateTime<Utc>) {
    println!("{}", repo.name.bold());
    println!("  {}", repo.description.as_deref().unwrap_or("No description").dimmed());

    if !repo.topics.is_empty() {
        let tags: Vec<String> = repo.topics.iter().map(|t| format!("#{}", t)).collect();
        println!("  {}", tags.join(" ").cyan());
    }

    if let Some(language) = &repo.language {
        let (r, g, b) = hex_to_rgb(catalog::language_color(language));
        println!("  {} {}", "●".truecolor(r, g, b), language);
    }

    match &repo.maintainer {
        Some(maintainer) => println!("  maintained by {}", maintainer.name.magenta()),
        None => println!("  {}", "no maintainer data".dimmed()),
    }

    let updated = repo
        .pushed_at
        .map(|at| catalog::format_age(at, now))
        .unwrap_or_else(|| "never".to_string());
    println!(
        "  {}  {}  ★ {}",
        updated,
        catalog::format_size(repo.size),
        repo.stargazers_count
    );

    if let Some(url) = catalog::card_link(repo, link, owner) {
        println!("  {}", url.underline().blue());
    }
    println!();
}

/// `#rgb` or `#rrggbb`; anything else renders grey.
fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let digits = hex.trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        _ => digits.to_string(),
    };

    let channel = |i: usize| {
        expanded
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0xcc)
    };
    (channel(0), channel(2), channel(4))
}

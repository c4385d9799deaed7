//! Console rendering for the mission transcript.

use console::style;
use std::path::Path;

use crate::capability::Output;
use crate::mission::{Award, MissionRecord, Reflection};
use crate::profile::Team;
use crate::verdict::Verdict;

pub fn print_briefing(goal: &str, team: &Team) {
    println!();
    println!("{}", style("🎯 Mission Briefing").cyan().bold());
    println!("  Goal: {goal}");
    println!(
        "  Team: {} (storyteller), {} (critic)",
        team.storyteller.name, team.critic.name
    );
    println!();
}

pub fn print_output(agent_name: &str, output: &Output) {
    println!(
        "{} {}",
        style(format!("✍ {agent_name}")).green().bold(),
        style(format!("(revision {})", output.revision)).dim()
    );
    println!("{}", output.content);
    println!();
}

pub fn print_verdict(agent_name: &str, verdict: &Verdict) {
    let line = match verdict {
        Verdict::Approved => style("approved".to_string()).green(),
        Verdict::NeedsRevision { .. } => style("needs revision".to_string()).yellow(),
        Verdict::NoVerdict => style("no verdict".to_string()).red(),
    };
    println!("{} {}", style(format!("🔍 {agent_name}:")).bold(), line);
    if let Verdict::NeedsRevision { feedback } = verdict {
        println!("{}", style(feedback).dim());
    }
    println!();
}

pub fn print_debrief(debrief: &str) {
    if debrief.is_empty() {
        return;
    }
    println!("{}", style("📋 Mission Debrief").cyan().bold());
    println!("{debrief}");
    println!();
}

pub fn print_awards(awards: &[Award]) {
    if awards.is_empty() {
        return;
    }
    println!("{}", style("🏆 Awards Ceremony").cyan().bold());
    for award in awards {
        println!("  {} → {}", award.title, style(&award.recipient).bold());
    }
    println!();
}

pub fn print_reflections(reflections: &[Reflection]) {
    let spoken: Vec<&Reflection> = reflections.iter().filter(|r| !r.text.is_empty()).collect();
    if spoken.is_empty() {
        return;
    }
    println!("{}", style("💭 Reflections").cyan().bold());
    for reflection in spoken {
        println!("  {}: {}", style(&reflection.agent_name).bold(), reflection.text);
    }
    println!();
}

pub fn print_archived(record: &MissionRecord, path: &Path) {
    println!(
        "{} {} {}",
        style("📦 Mission archived:").bold(),
        record.mission_id,
        style(format!("({})", path.display())).dim()
    );
}

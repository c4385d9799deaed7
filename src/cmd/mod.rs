//! Command implementations for the hatflow binary.

use anyhow::{Context, Result};
use console::style;

use hatflow::archive::{ArchiveWriter, JsonArchiveWriter};
use hatflow::config::MissionConfig;
use hatflow::engine::{CliAgent, CliReflections, EngineConfig};
use hatflow::errors::MissionError;
use hatflow::gates::ConsoleGate;
use hatflow::mission::MissionRunner;
use hatflow::profile::{AgentProfile, DirProfileStore, ProfileStore, Team};
use hatflow::qa::QaEngine;
use hatflow::ui;

/// Run one mission end to end.
pub async fn cmd_run(config: MissionConfig, goal: &str, team_ids: &[String]) -> Result<()> {
    let store = DirProfileStore::new(&config.hats_dir);
    let roster: Vec<AgentProfile> = team_ids
        .iter()
        .map(|id| {
            store
                .get_profile(id)
                .map_err(|source| MissionError::ProfileLoad {
                    id: id.clone(),
                    source,
                })
        })
        .collect::<Result<_, _>>()?;

    let team = Team::assemble(&roster)?;
    ui::print_briefing(goal, &team);

    let engine_config = EngineConfig::default()
        .with_engine_cmd(&config.engine_cmd)
        .with_timeout(config.timeout());
    let storyteller = CliAgent::new(engine_config.clone(), team.storyteller.clone(), goal);
    let critic = CliAgent::new(engine_config.clone(), team.critic.clone(), goal);

    let gate = ConsoleGate::new(config.auto_approve);
    let reflections = CliReflections::new(engine_config);
    let archive = JsonArchiveWriter::new(&config.missions_dir);

    let runner = MissionRunner::new(
        QaEngine::new(config.max_retries),
        &gate,
        &reflections,
        &archive,
    )
    .with_produce_timeout(config.timeout());

    let record = match runner.run_mission(goal, &roster, &storyteller, &critic).await {
        Ok(record) => record,
        Err(MissionError::Archive { record, source }) => {
            eprintln!(
                "{} {source}",
                style("⚠ Mission finished but archival failed:").yellow()
            );
            *record
        }
        Err(e) => return Err(e.into()),
    };

    ui::print_output(&team.storyteller.name, &record.final_output);
    for verdict in &record.verdict_trail {
        ui::print_verdict(&team.critic.name, &verdict.verdict);
    }
    ui::print_debrief(&record.debrief);
    ui::print_awards(&record.awards);
    ui::print_reflections(&record.reflections);
    let path = config
        .missions_dir
        .join(format!("mission_{}.json", record.mission_id));
    if path.exists() {
        ui::print_archived(&record, &path);
    }

    Ok(())
}

/// List the profiles in the hats directory.
pub fn cmd_hats_list(config: &MissionConfig) -> Result<()> {
    let store = DirProfileStore::new(&config.hats_dir);
    let ids = store.list_profiles()?;
    if ids.is_empty() {
        println!("No profiles found in {}", config.hats_dir.display());
        return Ok(());
    }
    for id in ids {
        match store.get_profile(&id) {
            Ok(profile) => println!(
                "{id}  {} ({})",
                style(&profile.name).bold(),
                profile.role
            ),
            Err(e) => println!("{id}  {}", style(format!("unreadable: {e}")).red()),
        }
    }
    Ok(())
}

/// Show one profile as pretty JSON.
pub fn cmd_hats_show(config: &MissionConfig, id: &str) -> Result<()> {
    let store = DirProfileStore::new(&config.hats_dir);
    let profile = store.get_profile(id)?;
    let json = serde_json::to_string_pretty(&profile).context("Failed to render profile")?;
    println!("{json}");
    Ok(())
}

/// List archived missions, most recent first.
pub fn cmd_missions_list(config: &MissionConfig) -> Result<()> {
    let writer = JsonArchiveWriter::new(&config.missions_dir);
    let records = writer.list_records()?;
    if records.is_empty() {
        println!("No archived missions in {}", config.missions_dir.display());
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {}  {:<19}  {}",
            record.mission_id,
            record.finished_at.format("%Y-%m-%d %H:%M"),
            record.status.to_string(),
            record.goal
        );
    }
    Ok(())
}

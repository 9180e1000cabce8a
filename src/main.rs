use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use rocket_traj::io::{load_mission, CsvSink, MissionSummary};
use rocket_traj::sim::{run_mission, MissionReport};
use rocket_traj::vehicle::Mission;

#[derive(Parser)]
#[command(name = "rocket-traj", version, about = "Multi-stage rocket trajectory propagator")]
struct Cli {
    /// Mission configuration (JSON)
    config: PathBuf,

    /// Directory for the per-segment trajectory CSV files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Summary JSON path (defaults to <OUTPUT_DIR>/<name>_summary.json)
    #[arg(long, conflicts_with = "no_summary")]
    summary: Option<PathBuf>,

    /// Do not write the summary JSON
    #[arg(long)]
    no_summary: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mission = load_mission(&cli.config).with_context(|| format!("cannot load {}", cli.config.display()))?;
    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("cannot create output directory {}", cli.output_dir.display()))?;

    let report = run_mission(&mission, |label| {
        let path = cli.output_dir.join(format!("{}.csv", label.file_stem(&mission.name)));
        CsvSink::create(&path)
    })
    .with_context(|| format!("simulation of `{}` failed", mission.name))?;

    let summary = MissionSummary::from_report(&mission.name, &report);
    if !cli.no_summary {
        let path = cli
            .summary
            .clone()
            .unwrap_or_else(|| cli.output_dir.join(format!("{}_summary.json", mission.name)));
        summary
            .write_file(&path)
            .with_context(|| format!("cannot write summary {}", path.display()))?;
    }

    print_report(&mission, &report, &summary);
    Ok(())
}

fn print_report<S>(mission: &Mission, report: &MissionReport<S>, summary: &MissionSummary) {
    println!();
    println!("====================================================================");
    println!("  TRAJECTORY PROPAGATION — {}", mission.name);
    println!("====================================================================");
    println!();
    println!("  Stages");
    println!("  ──────────────────────────────────────────────────────────────────");
    for (i, stage) in mission.stages.iter().enumerate() {
        let separation = stage
            .separation_time
            .map_or_else(|| "-".to_string(), |t| format!("{t:.1} s"));
        println!(
            "  {:>2}  {:<14} mass {:>9.1} kg   start {:>7.1} s   separation {:>9}",
            stage.number,
            stage.name,
            stage.mass_initial,
            mission.stage_start_time(i),
            separation
        );
    }
    println!();

    println!("  Segments");
    println!("  ──────────────────────────────────────────────────────────────────");
    for seg in &summary.segments {
        let last = seg.last_time.map_or_else(|| "-".to_string(), |t| format!("{t:.1} s"));
        println!(
            "  {:<24} {:>8.1} s -> {:>9}   final mass {:>9.2} kg",
            seg.label, seg.start_time, last, seg.final_mass
        );
        for ev in &seg.events {
            println!(
                "      {:<10} t={:>7.1}s   mass {:>9.2} -> {:>9.2} kg",
                ev.kind.to_string().to_uppercase(),
                ev.time,
                ev.mass_before,
                ev.mass_after
            );
        }
        if let Some([lat, lon, _]) = seg.impact_llh {
            println!("      IMPACT     lat {lat:>10.5}°  lon {lon:>10.5}°");
        }
    }
    println!();

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Max altitude:  {:>10.0} m   ({:.2} km)",
        report.max_altitude,
        report.max_altitude / 1000.0
    );
    println!(
        "  Max downrange: {:>10.0} m   ({:.2} km)",
        report.max_downrange,
        report.max_downrange / 1000.0
    );
    if let Some(orbit) = &report.orbit {
        println!(
            "  Orbit:         perigee {:.1} km, apogee {:.1} km, e = {:.4}, i = {:.2}°  [{}]",
            orbit.perigee_altitude / 1000.0,
            orbit.apogee_altitude / 1000.0,
            orbit.elements.ecc,
            orbit.elements.inc.to_degrees(),
            if orbit.in_orbit { "IN ORBIT" } else { "SUBORBITAL" }
        );
    }
    println!("====================================================================");
    println!();
}

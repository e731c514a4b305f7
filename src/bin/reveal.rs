use std::{io::Write as _, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reveal", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a page headlessly and print one JSON line per eventful frame.
    Simulate(SimulateArgs),
    /// Print the resolved timeline schedule of one section.
    Schedule(ScheduleArgs),
    /// Print the stock page config as JSON.
    Config,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Page config JSON. Defaults to the stock portfolio layout.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Seconds to simulate.
    #[arg(long, default_value_t = 8.0)]
    duration: f64,

    /// Scroll cue `<seconds>:<target>`, where the target is an offset, a
    /// section kind or `top`, e.g. `3.0:1200` or `5.0:contact`. Repeatable.
    #[arg(long = "scroll", value_parser = parse_cue)]
    cues: Vec<(f64, ScrollTarget)>,
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    /// Page config JSON. Defaults to the stock portfolio layout.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Section kind, e.g. `about`.
    #[arg(long)]
    section: reveal::SectionKind,
}

#[derive(Clone, Copy, Debug)]
enum ScrollTarget {
    Offset(f64),
    Section(reveal::SectionKind),
    Top,
}

fn parse_cue(s: &str) -> Result<(f64, ScrollTarget), String> {
    let (t, target) = s
        .split_once(':')
        .ok_or_else(|| format!("expected <seconds>:<target>, got '{s}'"))?;
    let t: f64 = t.trim().parse().map_err(|e| format!("bad time '{t}': {e}"))?;
    if !t.is_finite() || t < 0.0 {
        return Err(format!("cue '{s}' is out of range"));
    }
    let target = target.trim();
    let target = if target == "top" {
        ScrollTarget::Top
    } else if let Ok(y) = target.parse::<f64>() {
        if !y.is_finite() {
            return Err(format!("cue '{s}' is out of range"));
        }
        ScrollTarget::Offset(y)
    } else {
        ScrollTarget::Section(target.parse().map_err(|e| format!("bad target: {e}"))?)
    };
    Ok((t, target))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Simulate(args) => cmd_simulate(args),
        Command::Schedule(args) => cmd_schedule(args),
        Command::Config => cmd_config(),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<reveal::PageConfig> {
    match path {
        Some(p) => reveal::PageConfig::from_path(p)
            .with_context(|| format!("load page config '{}'", p.display())),
        None => Ok(reveal::PageConfig::portfolio()),
    }
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.fps > 0, "fps must be > 0");
    anyhow::ensure!(
        args.duration.is_finite() && args.duration >= 0.0,
        "duration must be finite and >= 0"
    );

    let config = load_config(args.config.as_ref())?;
    let mut page = reveal::Page::new(config).context("build page")?;

    let mut cues = args.cues;
    cues.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut cues = cues.into_iter().peekable();

    let dt = 1.0 / f64::from(args.fps);
    let frames = (args.duration * f64::from(args.fps)).ceil() as u64;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for i in 0..frames {
        let now = i as f64 * dt;
        while let Some((_, target)) = cues.next_if(|(t, _)| *t <= now) {
            match target {
                ScrollTarget::Offset(y) => page.scroll_to(y),
                ScrollTarget::Section(kind) => page
                    .scroll_to_section(kind)
                    .with_context(|| format!("scroll cue to '{kind}'"))?,
                ScrollTarget::Top => page.scroll_to_top(),
            }
            tracing::info!(scroll_y = page.scroll_y(), at = now, "scroll cue");
        }
        let report = page.frame(dt);
        if !report.is_quiet() {
            serde_json::to_writer(&mut out, &report).context("write frame report")?;
            writeln!(out)?;
        }
    }

    page.unmount();
    Ok(())
}

#[derive(serde::Serialize)]
struct SectionSchedule {
    name: String,
    duration: f64,
    steps: Vec<reveal::timeline::ScheduledStep>,
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_ref())?;
    let layout = config
        .sections
        .iter()
        .find(|s| s.kind == args.section)
        .with_context(|| format!("no section '{}' in config", args.section))?;

    let mut scene = reveal::Scene::new();
    reveal::sections::build_elements(&mut scene, layout, config.viewport.width)?;
    let schedules: Vec<SectionSchedule> = reveal::sections::choreography(&scene, layout)?
        .into_iter()
        .map(|setup| SectionSchedule {
            name: setup.name,
            duration: setup.timeline.duration(),
            steps: setup.timeline.schedule(),
        })
        .collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &schedules).context("write schedule")?;
    writeln!(out)?;
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &reveal::PageConfig::portfolio())
        .context("write config")?;
    writeln!(out)?;
    Ok(())
}

use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{debug, info};

use dungeon_runtime::{
    BodyBlueprint, BodyError, BodyTree, PartKind, PoseModel, SwingDirection, WeaponAction,
    WeaponKind,
};

/// Fixed timestep of the headless simulation.
const TICK_SECONDS: f32 = 0.5;
const WALK_VELOCITY: f32 = 1.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read blueprint {}", options.path))?;
    let blueprint = BodyBlueprint::from_xml(&xml).context("failed to parse body XML")?;
    let mut tree = blueprint.assemble().context("failed to assemble body")?;

    let weapons = tree
        .depth_first()
        .into_iter()
        .filter(|&id| matches!(tree.get(id).map(|p| p.kind), Some(PartKind::Weapon(_))))
        .count();
    println!("Loaded body with {} parts ({weapons} weapon(s))", tree.len());
    for id in tree.depth_first() {
        let Some(part) = tree.get(id) else { continue };
        let Some(world) = tree.world_position(id) else {
            continue;
        };
        println!(
            " - {} at ({:.2}, {:.2})",
            kind_label(part.kind),
            world.x,
            world.y
        );
    }

    if options.slash {
        let total = tree
            .take_slash(Vec2::new(1.0, 0.0), 0.5, 10.0)
            .context("slash query failed")?;
        println!("Slash dealt {total:.2} damage");
    }

    if !options.summary_only {
        simulate(&mut tree, options.ticks);
    }

    let poses = PoseModel::new();
    poses.publish(&tree);
    println!("Final part poses:");
    for pose in poses.snapshot() {
        println!(
            " - {} pos=({:.2}, {:.2}) angle={:.2}",
            kind_label(pose.kind),
            pose.world_position.x,
            pose.world_position.y,
            pose.orientation
        );
    }
    Ok(())
}

fn simulate(tree: &mut BodyTree, ticks: u32) {
    info!("simulating {ticks} tick(s)");
    for tick in 1..=ticks {
        let elapsed = tick as f32 * TICK_SECONDS;
        tree.walk(WALK_VELOCITY, TICK_SECONDS);
        for kind in [WeaponKind::Sword, WeaponKind::Gun] {
            match tree.advance_weapon(0, kind, SwingDirection::Counterclockwise, elapsed) {
                Ok(WeaponAction::Fired) => println!("Weapon fired (tick {tick})"),
                Ok(action) => debug!("{kind:?} action at tick {tick}: {action:?}"),
                Err(BodyError::WeaponNotFound { .. }) => {}
                Err(err) => debug!("weapon advance failed: {err}"),
            }
        }
    }
}

fn kind_label(kind: PartKind) -> &'static str {
    match kind {
        PartKind::Body => "Body",
        PartKind::Weapon(WeaponKind::Sword) => "Sword",
        PartKind::Weapon(WeaponKind::Gun) => "Gun",
        PartKind::Appendage(_) => "Leg",
    }
}

struct CliOptions {
    path: String,
    ticks: u32,
    slash: bool,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: dungeon-runtime <body.xml> [--ticks N] [--slash] [--summary-only]"
            ));
        };
        let mut ticks = 4;
        let mut slash = false;
        let mut summary_only = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--ticks" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--ticks expects a number"))?;
                    ticks = value
                        .parse::<u32>()
                        .with_context(|| format!("invalid tick count {value}"))?;
                }
                "--slash" => slash = true,
                "--summary-only" => summary_only = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --ticks, --slash or --summary-only"
                    ));
                }
            }
        }
        Ok(Self {
            path,
            ticks,
            slash,
            summary_only,
        })
    }
}

use anyhow::{Result, bail};
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use rand::prelude::*;
use sweeper_core::*;

/// Plays random games against the rules engine and reports the outcomes.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    /// Difficulty preset: beginner, intermediate, expert or custom
    #[arg(short, long, default_value = "beginner", value_parser = parse_level)]
    level: Level,

    /// Custom board width, implies `--level custom`
    #[arg(long)]
    width: Option<Coord>,

    /// Custom board height, implies `--level custom`
    #[arg(long)]
    height: Option<Coord>,

    /// Custom mine count, implies `--level custom`
    #[arg(long)]
    mines: Option<CellCount>,

    /// Number of games to play
    #[arg(short, long, default_value_t = 100)]
    trials: u32,

    /// Force a seed instead of random
    #[arg(short, long)]
    seed: Option<u64>,
}

fn parse_level(name: &str) -> std::result::Result<Level, String> {
    Level::from_name(name).ok_or_else(|| format!("unknown level `{name}`"))
}

impl Args {
    fn custom(&self) -> Option<Difficulty> {
        if self.width.is_none() && self.height.is_none() && self.mines.is_none() {
            return None;
        }
        let fallback = Difficulty::custom_default();
        Some(Difficulty::new(
            self.width.unwrap_or(fallback.width),
            self.height.unwrap_or(fallback.height),
            self.mines.unwrap_or(fallback.mines),
        ))
    }
}

#[derive(Debug, Default)]
struct Stats {
    wins: u32,
    losses: u32,
    moves: u64,
    seconds: u64,
}

/// Clicks random covered cells until the game ends, one clock tick per move.
fn play(grid: &mut Grid, rng: &mut SmallRng) -> Result<u32> {
    let mut moves = 0;

    while !grid.is_game_over() {
        let covered: Vec<Coord2> = grid
            .cells()
            .filter(|cell| !cell.is_revealed() && !cell.is_flagged())
            .map(Cell::coords)
            .collect();
        if covered.is_empty() {
            bail!("no covered cells left but the game is not over: {grid:?}");
        }
        let coords = covered[rng.random_range(0..covered.len())];

        let outcome = grid.reveal(coords)?;
        if moves == 0 && outcome == RevealOutcome::HitMine {
            bail!("first reveal at {coords:?} hit a mine");
        }
        log::trace!("Reveal {:?}: {:?}", coords, outcome);

        moves += 1;
        grid.tick();
    }

    Ok(moves)
}

fn check_final_board(grid: &Grid) -> Result<()> {
    let consistent = match grid.result() {
        Some(GameResult::Won) => grid
            .cells()
            .all(|cell| cell.is_mine() == cell.is_flagged() && cell.is_mine() != cell.is_revealed()),
        Some(GameResult::Lost) => grid
            .cells()
            .filter(|cell| cell.is_mine())
            .all(Cell::is_revealed),
        None => false,
    };
    if !consistent {
        bail!("inconsistent final board: {grid:?}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let seed = args.seed.unwrap_or_else(rand::random);
    log::debug!("seed: {}", seed);

    let mut session = Session::new().with_seed(seed);
    match args.custom() {
        Some(custom) => {
            session.select_level(Level::Custom);
            session.set_custom(custom);
        }
        None => session.select_level(args.level),
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut stats = Stats::default();
    for trial in 0..args.trials {
        let grid = session.reset()?;
        let moves = play(grid, &mut rng)?;
        check_final_board(grid)?;

        if grid.won_game() {
            stats.wins += 1;
        } else {
            stats.losses += 1;
        }
        stats.moves += u64::from(moves);
        stats.seconds += u64::from(grid.seconds_played());
        log::debug!(
            "Trial {}: {:?} after {} moves ({})",
            trial,
            grid.result(),
            moves,
            grid.time_string()
        );
    }

    let games = u64::from(args.trials.max(1));
    println!(
        "{} on {}: {} won, {} lost, {:.1} moves and {:.1}s per game (seed {})",
        session.level(),
        session.difficulty(),
        stats.wins,
        stats.losses,
        stats.moves as f64 / games as f64,
        stats.seconds as f64 / games as f64,
        seed
    );
    Ok(())
}

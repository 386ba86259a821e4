use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::{io, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use gridworld::crossterm::event::{self, Event, KeyCode};
use gridworld::crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use gridworld::crossterm::{execute, terminal::Clear, terminal::ClearType};
use gridworld::ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use gridworld::{render_grid, render_progress, render_status, GridConfig};
use machine_learning::q_learning::{parallel_seed_sweep, LogObserver, PathResult, ValueTable};
use machine_learning::{
    create_learner, extract_path, train_batch_with, value_table_snapshot, LearnerConfig,
    LearnerHandle,
};

#[derive(Parser, Debug)]
#[command(name = "playground", about = "Train grid Q-learners and watch their greedy paths")]
struct Cli {
    /// JSON learner config. Missing fields take the 4x4 demo defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train, then print the greedy path and the value table.
    Train {
        #[arg(long, default_value_t = 1000)]
        episodes: usize,

        /// Episodes per batch; one summary line is logged per batch.
        #[arg(long, default_value_t = 100)]
        batch: usize,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Train, then animate the greedy path in the terminal. `q` quits.
    Replay {
        #[arg(long, default_value_t = 1000)]
        episodes: usize,

        #[arg(long, default_value_t = 150)]
        delay_ms: u64,
    },
    /// Train one learner per seed in parallel and report how many converge.
    Sweep {
        #[arg(long, default_value_t = 16)]
        seeds: u64,

        #[arg(long, default_value_t = 1000)]
        episodes: usize,

        /// Worker threads; defaults to one less than the CPU count.
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<LearnerConfig> {
    match path {
        Some(path) => LearnerConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(LearnerConfig::default()),
    }
}

fn train(config: LearnerConfig, episodes: usize, batch: usize) -> Result<LearnerHandle> {
    let mut handle = create_learner(config)?;
    let batch = batch.max(1);
    let mut observer = LogObserver::new(batch);

    let target = handle.episodes_trained().saturating_add(episodes);
    let mut trained = handle.episodes_trained();
    while trained < target {
        let total = train_batch_with(&mut handle, (target - trained).min(batch), &mut observer)?;
        if total == trained {
            info!("episode limit reached after {total} episodes");
            break;
        }
        trained = total;
    }
    Ok(handle)
}

fn print_path(result: &PathResult) {
    let cells: Vec<String> = result.path.iter().map(ToString::to_string).collect();
    println!("path: {}", cells.join(" -> "));
    match result.divergence {
        None => println!("reached the goal in {} moves", result.moves()),
        Some(divergence) => println!("stopped after {} moves: {divergence:?}", result.moves()),
    }
}

fn print_table(table: &ValueTable) {
    println!("{:>10} {:>8} {:>8} {:>8} {:>8}", "cell", "up", "right", "down", "left");
    for (cell, values) in table.iter() {
        println!(
            "{:>10} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
            cell.to_string(),
            values[0],
            values[1],
            values[2],
            values[3]
        );
    }
}

fn run_train(config: LearnerConfig, episodes: usize, batch: usize, json: bool) -> Result<()> {
    let handle = train(config, episodes, batch)?;
    let result = extract_path(&handle)?;
    let table = value_table_snapshot(&handle)?;

    if json {
        let output = serde_json::json!({
            "episodes": handle.episodes_trained(),
            "path": result,
            "table": table,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_path(&result);
        print_table(&table);
    }
    Ok(())
}

fn run_replay(config: LearnerConfig, episodes: usize, delay_ms: u64) -> Result<()> {
    let handle = train(config, episodes, episodes.max(1))?;
    let result = extract_path(&handle)?;
    let grid = handle.learner().grid().clone();
    let trained = handle.episodes_trained();

    let (tx, rx) = mpsc::channel();
    let steps = result.path.len();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        for cursor in 1..steps {
            if tx.send(cursor).is_err() {
                return;
            }
            thread::sleep(Duration::from_millis(delay_ms));
        }
    });

    enable_raw_mode()?;
    let outcome = animate(&grid, &result, trained, &rx);
    let restored = disable_raw_mode().and_then(|()| execute!(io::stdout(), Clear(ClearType::All)));
    outcome?;
    restored?;
    print_path(&result);
    Ok(())
}

/// Draws the grid until `q` is pressed, moving the agent along `result.path`
/// as cursor positions arrive on `rx`. Expects raw mode to be on.
fn animate(
    grid: &GridConfig,
    result: &PathResult,
    trained: usize,
    rx: &mpsc::Receiver<usize>,
) -> io::Result<()> {
    let mut stdout = io::stdout();
    let backend = CrosstermBackend::new(&mut stdout);
    let mut terminal = Terminal::new(backend)?;
    execute!(io::stdout(), Clear(ClearType::All))?;

    let mut cursor = 0;
    loop {
        terminal.draw(|f| {
            let layout = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(36)])
                .split(f.area());
            let [board_area, side] = [layout[0], layout[1]];
            let side = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(3)])
                .split(side);

            let board = Paragraph::new(render_grid(grid, &result.path, cursor))
                .block(Block::default().borders(Borders::ALL).title("Grid"));
            let status = Paragraph::new(render_status(result.complete, result.moves(), trained))
                .block(Block::default().borders(Borders::ALL).title("Status"));
            let progress = Paragraph::new(render_progress(cursor, result.moves()))
                .block(Block::default().borders(Borders::ALL).title("Replay"));
            f.render_widget(board, board_area);
            f.render_widget(status, side[0]);
            f.render_widget(progress, side[1]);
        })?;

        while let Ok(next) = rx.try_recv() {
            cursor = next;
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press && key.code == KeyCode::Char('q') {
                    return Ok(());
                }
            }
        }
    }
}

fn run_sweep(config: LearnerConfig, seeds: u64, episodes: usize, threads: Option<usize>) -> Result<()> {
    let threads = threads.unwrap_or_else(|| num_cpus::get().saturating_sub(1).max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("building the sweep thread pool")?;
    info!("sweeping {seeds} seeds on {threads} threads");

    let seeds: Vec<u64> = (0..seeds).collect();
    let report = pool.install(|| parallel_seed_sweep(&config, &seeds, episodes))?;

    for outcome in &report.outcomes {
        match outcome.divergence {
            None => println!("seed {:>4}: goal in {} moves", outcome.seed, outcome.moves),
            Some(divergence) => println!(
                "seed {:>4}: {divergence:?} after {} moves",
                outcome.seed, outcome.moves
            ),
        }
    }
    println!("converged: {:.1}%", report.convergence_rate() * 100.0);
    if let Some(mean) = report.mean_moves() {
        println!("mean path length: {mean:.2}");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Train { episodes, batch, json } => run_train(config, episodes, batch, json),
        Command::Replay { episodes, delay_ms } => run_replay(config, episodes, delay_ms),
        Command::Sweep { seeds, episodes, threads } => run_sweep(config, seeds, episodes, threads),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_stops_at_the_episode_limit() {
        let config = LearnerConfig {
            episode_limit: Some(25),
            seed: Some(1),
            ..Default::default()
        };
        let handle = train(config, 100, 10).unwrap();
        assert_eq!(handle.episodes_trained(), 25);
    }

    #[test]
    fn training_runs_every_requested_episode() {
        let config = LearnerConfig { seed: Some(1), ..Default::default() };
        let handle = train(config, 95, 10).unwrap();
        assert_eq!(handle.episodes_trained(), 95);
    }
}

use anyhow::{anyhow, Context, Result};
use gridsweep::{Board, BoardConfig};
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Mutex,
};
use structopt::StructOpt;

mod events;
mod ui;

#[derive(Debug, structopt::StructOpt)]
struct Opt {
    /// The number of rows in the grid.
    #[structopt(short, long, default_value = "9")]
    rows: usize,

    /// The number of columns in the grid.
    #[structopt(short, long, default_value = "9")]
    columns: usize,

    /// The total number of mines in the grid.
    #[structopt(short, long, default_value = "10")]
    mines: usize,

    /// The width of each cell.
    #[structopt(short = "-w", long, default_value = "5")]
    cell_width: usize,

    /// The height of each cell.
    #[structopt(short = "-H", long, default_value = "3")]
    cell_height: usize,

    /// Seed for mine placement, for reproducible games.
    #[structopt(short, long)]
    seed: Option<u64>,

    /// Write debug logs to this file.
    #[structopt(long, parse(from_os_str))]
    log_file: Option<PathBuf>,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn main() -> Result<()> {
    let Opt {
        rows,
        columns,
        mines,
        cell_width,
        cell_height,
        seed,
        log_file,
    } = Opt::from_args();

    if let Some(path) = &log_file {
        init_logging(path)?;
    }

    if cell_width < 3 || cell_height < 3 {
        return Err(anyhow!(
            "cells must be at least 3x3, got {}x{}",
            cell_width,
            cell_height
        ));
    }

    let config = BoardConfig::builder()
        .rows(rows)
        .columns(columns)
        .mines(mines)
        .build();
    let board = match seed {
        Some(seed) => Board::seeded(config, seed),
        None => Board::new(config),
    }
    .context("invalid board configuration")?;

    ui::Ui::builder()
        .board(board)
        .cell_width(cell_width)
        .cell_height(cell_height)
        .build()
        .run()
        .context("sweep failed")
}

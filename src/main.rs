use std::sync::Arc;

use clap::{Parser, Subcommand};

use tengen::board::Board;
use tengen::constants::{DEFAULT_PLAYOUT_CNT, N};
use tengen::gtp::GtpEngine;
use tengen::hash::Zobrist;
use tengen::mcts::{Uct, UctConfig};
use tengen::vertex::Vertex;

#[derive(Parser)]
#[command(name = "tengen", version, about = "Monte Carlo tree search Go engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Speak GTP on stdin/stdout (for use with a Go GUI or referee)
    Gtp {
        /// Simulations per generated move
        #[arg(long, default_value_t = DEFAULT_PLAYOUT_CNT)]
        playouts: usize,
        /// Seed for all engine randomness
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Self-play a demo game, printing each position
    Demo {
        /// Maximum number of moves to generate
        #[arg(long, default_value_t = 20)]
        moves: usize,
        /// Simulations per generated move
        #[arg(long, default_value_t = 2000)]
        playouts: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Gtp { playouts, seed } => {
            let config = UctConfig { playout_cnt: playouts, seed, ..Default::default() };
            let stdin = std::io::stdin();
            GtpEngine::new(config).run(stdin.lock(), std::io::stdout())
        }
        Command::Demo { moves, playouts, seed } => demo(moves, playouts, seed),
    }
}

fn demo(moves: usize, playouts: usize, seed: u64) -> anyhow::Result<()> {
    let config = UctConfig { playout_cnt: playouts, seed, ..Default::default() };
    let mut board = Board::new(Arc::new(Zobrist::new(seed)));
    let mut uct = Uct::new(config);

    println!("self-play demo on {N}x{N}, {playouts} playouts per move\n");
    for move_no in 1..=moves {
        let pl = board.act_player();
        let v = uct.genmove(&board, pl);
        if v == Vertex::RESIGN {
            println!("move {move_no}: {pl:?} resigns");
            break;
        }
        if !board.try_play(pl, v) {
            board.try_play(pl, Vertex::PASS);
        }
        println!("move {move_no}: {pl:?} {}", v.to_gtp());
        print!("{board}");
        eprint!("{}", uct.root_summary());
        if board.both_players_passed() {
            break;
        }
    }
    let score = board.tt_score();
    if score > 0 {
        println!("result: B+{:.1}", score as f32 - 0.5);
    } else {
        println!("result: W+{:.1}", 0.5 - score as f32);
    }
    Ok(())
}

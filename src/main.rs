use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use farkle_env::game::{CommitMode, Stake, TurnPhase};
use farkle_env::service::{
    simulate, spawn_host, GameConfig, GameSession, HostError, HostHandle, PacingConfig,
    PlayerId, RevealEvent, RevealPlan, Snapshot,
};

// ============================================================================
// 命令列參數
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "farkle", about = "Two-player dice scoring game")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 在終端機對戰（玩家 1 由人操作）
    Play {
        /// beggar / peasant / knight / king
        #[arg(long, conflicts_with = "target")]
        stake: Option<Stake>,
        #[arg(long)]
        target: Option<i64>,
        /// 玩家 2 由電腦操作
        #[arg(long)]
        agent: bool,
        #[arg(long)]
        seed: Option<u64>,
        /// 電腦玩家展示不等待
        #[arg(long)]
        instant: bool,
    },
    /// 電腦對電腦批次模擬
    Simulate {
        #[arg(long, default_value_t = 1000)]
        games: usize,
        #[arg(long, conflicts_with = "target")]
        stake: Option<Stake>,
        #[arg(long)]
        target: Option<i64>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// 環境變數為底，命令列參數覆蓋
fn resolve_config(stake: Option<Stake>, target: Option<i64>, seed: Option<u64>) -> Result<GameConfig> {
    let mut config = GameConfig::from_env();
    if let Some(stake) = stake {
        config.target_score = stake.target_score();
    }
    if let Some(target) = target {
        config.target_score = target;
    }
    config.seed = match seed {
        Some(seed) => seed,
        None if std::env::var("FARKLE_SEED").is_ok() => config.seed,
        None => rand::random(),
    };
    config.validate().context("invalid game configuration")
}

// ============================================================================
// 終端機對戰
// ============================================================================

fn render(snapshot: &Snapshot) {
    println!();
    println!(
        "round {} | target {} | player 1: {} | player 2: {}",
        snapshot.round, snapshot.target_score, snapshot.totals[0], snapshot.totals[1]
    );
    println!(
        "{} to act | round score {} | dice left {}",
        snapshot.active, snapshot.round_score, snapshot.remaining_dice
    );
    if snapshot.phase == TurnPhase::SelectionPending {
        let dice: Vec<String> = snapshot
            .pool
            .iter()
            .enumerate()
            .map(|(idx, face)| {
                if snapshot.kept_mask & (1 << idx) != 0 {
                    format!("[{face}]")
                } else {
                    format!(" {face} ")
                }
            })
            .collect();
        println!("dice: {}", dice.join(" "));
        println!(
            "selected {:?} -> {}{}",
            snapshot.selected,
            snapshot.preview_score,
            if snapshot.selection_valid { "" } else { " (not all scoring)" }
        );
    }
}

fn prompt(snapshot: &Snapshot) {
    let actions = &snapshot.actions;
    let mut options = Vec::new();
    if actions.roll {
        options.push("r = roll");
    }
    if actions.toggle.iter().any(|&t| t) {
        options.push("1-6 = toggle die");
    }
    if actions.continue_turn {
        options.push("c = keep and roll on");
    }
    if actions.end_turn {
        options.push("e = keep and bank");
    }
    options.push("a = abandon turn");
    options.push("q = quit");
    println!("{}", options.join(", "));
}

fn describe(event: &RevealEvent) -> String {
    match event {
        RevealEvent::Rolled { pool } => format!("rolled {pool:?}"),
        RevealEvent::Busted => "no scoring dice, round score lost".to_string(),
        RevealEvent::Selected { position, face, preview_score } => {
            format!("keeps die {} ({face}), {preview_score} points so far", position + 1)
        }
        RevealEvent::Committed { mode: _, hot_dice: true } => "all dice scored, rolling six again".to_string(),
        RevealEvent::Committed { mode: CommitMode::Continue, .. } => "chooses to continue".to_string(),
        RevealEvent::Committed { mode: CommitMode::End, .. } => "chooses to end the turn".to_string(),
    }
}

/// 電腦玩家一步，結果逐顆顯示
async fn agent_step(handle: &HostHandle, pacing: &PacingConfig, rng: &mut StdRng) -> Result<()> {
    let step = handle.agent_act().await?;
    let plan = RevealPlan::from_step(&step);
    let mut events = plan.paced(pacing, rng);
    while let Some((delay, event)) = events.next().await {
        tokio::time::sleep(delay).await;
        println!("{}: {}", step.player, describe(&event));
    }
    Ok(())
}

/// 人類玩家的一行指令；回傳 false 表示離開
async fn human_command(handle: &HostHandle, line: &str) -> Result<bool> {
    let line = line.trim();
    let result = match line {
        "q" | "quit" => return Ok(false),
        "r" | "roll" => handle.roll().await.map(|roll| {
            println!("rolled {:?}", roll.pool);
            if roll.bust {
                println!("no scoring dice, round score lost");
            }
        }),
        "c" | "continue" => handle.commit(CommitMode::Continue).await.map(|report| {
            println!("kept {:?} for {}, round score {}", report.outcome.kept, report.outcome.gained, report.round_score);
        }),
        "e" | "end" => handle.commit(CommitMode::End).await.map(|report| {
            println!("kept {:?} for {}, round score {}", report.outcome.kept, report.outcome.gained, report.round_score);
            if report.outcome.hot_dice {
                println!("all dice scored, roll six again");
            }
        }),
        "a" | "abandon" => handle.abandon().await.map(|report| {
            println!("{} abandons the turn", report.player);
        }),
        other => match other.parse::<usize>() {
            Ok(n) if (1..=6).contains(&n) => handle.toggle_keep(n - 1).await.map(|_| ()),
            _ => {
                println!("unknown command `{other}`");
                return Ok(true);
            }
        },
    };

    match result {
        Ok(()) => Ok(true),
        Err(HostError::Engine(err)) => {
            println!("not allowed: {err}");
            Ok(true)
        }
        Err(err) => Err(err.into()),
    }
}

async fn play(config: GameConfig, pacing: PacingConfig) -> Result<()> {
    info!(target_score = config.target_score, seed = config.seed, agent = config.opponent_is_agent, "starting game");
    let mut reveal_rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let (handle, task) = spawn_host(GameSession::new(config));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = handle.snapshot().await?;
        if let Some(winner) = snapshot.winner {
            println!(
                "{winner} wins with {} points",
                snapshot.totals[winner.index()]
            );
            break;
        }
        if snapshot.aborted {
            bail!("game aborted after an internal error");
        }
        if snapshot.active_is_agent {
            agent_step(&handle, &pacing, &mut reveal_rng).await?;
            continue;
        }

        render(&snapshot);
        prompt(&snapshot);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !human_command(&handle, &line).await? {
            break;
        }
    }

    drop(handle);
    let session = task.await.context("host task failed")?;
    let totals = session.totals();
    info!(
        turns = session.turns_played(),
        total_one = totals[0],
        total_two = totals[1],
        "game closed"
    );
    Ok(())
}

// ============================================================================
// 入口
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match args.command {
        Command::Play { stake, target, agent, seed, instant } => {
            let mut config = resolve_config(stake, target, seed)?;
            config.opponent_is_agent |= agent;
            let pacing = if instant {
                PacingConfig::instant()
            } else {
                PacingConfig::from_env().validate()?
            };
            play(config, pacing).await
        }
        Command::Simulate { games, stake, target, seed } => {
            let config = resolve_config(stake, target, seed)?;
            if games == 0 {
                warn!("nothing to simulate");
                return Ok(());
            }
            let stats = tokio::task::spawn_blocking(move || simulate(&config, games)).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            println!(
                "player 1 win rate {:.3}, player 2 win rate {:.3}",
                stats.win_rate(PlayerId::One),
                stats.win_rate(PlayerId::Two)
            );
            Ok(())
        }
    }
}

//! 基于统计模板与 MRF 的脑部 DTI 病灶分割命令行工具.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod cmd;
mod error;
mod result;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 输出更多日志 (可重复).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// 只输出警告与错误日志.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// 并行线程数.
    #[arg(long, global = true, default_value_t = utils::cpus())]
    threads: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 单轮统计判定.
    Sdp(cmd::Sdp),

    /// 先验标签邻域传播.
    Lsdp(cmd::Lsdp),

    /// k-means + MRF 松弛.
    Mrf(cmd::Mrf),

    /// sigmoid 增强 + 聚类分割.
    Cluster(cmd::Cluster),
}

impl Command {
    fn run(&self) -> error::ToolResult<()> {
        match self {
            Command::Sdp(c) => c.run(),
            Command::Lsdp(c) => c.run(),
            Command::Mrf(c) => c.run(),
            Command::Cluster(c) => c.run(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    utils::init_logger(cli.verbose, cli.quiet);

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
    {
        log::warn!("Failed to configure {} worker threads: {e}", cli.threads);
    }

    match cli.command.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("lesion-track: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

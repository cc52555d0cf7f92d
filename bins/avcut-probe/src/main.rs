//! avcut-probe - H.264 码流探测工具
//!
//! 读取 avcC 配置记录与 AVCC 格式的样本, 输出 SPS/PPS 摘要以及每个 slice 的 header 长度.

mod logging;
mod report;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

/// avcut H.264 码流探测工具
#[derive(Parser, Debug)]
#[command(name = "avcut-probe", version, about = "H.264 参数集与 slice header 探测工具")]
struct Cli {
    /// 配置记录 (avcC) 文件路径
    #[arg(short, long)]
    config: PathBuf,

    /// 长度前缀格式的样本文件路径
    #[arg(short, long)]
    sample: Option<PathBuf>,

    /// NAL 长度字段字节数, 默认取配置记录中的值
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    length_size: Option<u8>,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志详细程度 (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// 日志文件目录, 不指定时只输出到控制台
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<()> {
    let report = report::probe_files(
        &cli.config,
        cli.sample.as_deref(),
        cli.length_size.map(usize::from),
    )?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init("avcut-probe", cli.verbose, cli.log_dir.as_deref()) {
        eprintln!("错误: {err:#}");
        process::exit(1);
    }

    if let Err(err) = run(&cli) {
        eprintln!("错误: {err:#}");
        process::exit(1);
    }
}

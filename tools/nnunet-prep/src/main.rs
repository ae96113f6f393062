//! 将骨骼 CT 分割语料整理为 nnU-Net 原始数据集, 或校验已有的数据集目录.

mod result;
mod runner;

use bone_berry::consts::{DEFAULT_CASE_PREFIX, DEFAULT_DATASET_NAME, DEFAULT_MODALITY};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "nnunet-prep", version, about)]
struct Cli {
    /// 日志详细程度. `-v` 为 debug, `-vv` 为 trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 遍历语料, 合并标签并写出数据集.
    Assemble(AssembleArgs),

    /// 校验已有数据集目录的完整性.
    Verify(VerifyArgs),
}

/// 内置的标签预设.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum Preset {
    /// 骨盆-大腿: 8 个固定标签, 只处理 `Pelvis-Thighs` 病例.
    PelvisThighs,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// 输出根目录. 缺省时读取 `$BONE_OUTPUT_DIR`, 再退化为 `$HOME/dataset/nnUNet_raw`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// 数据集目录名.
    #[arg(long, default_value = DEFAULT_DATASET_NAME)]
    dataset_name: String,
}

impl OutputArgs {
    fn task_dir(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(utils::loader::output_dir_from_env_or_home)
            .join(&self.dataset_name)
    }
}

#[derive(Args, Debug)]
struct AssembleArgs {
    /// 语料根目录. 缺省时读取 `$BONE_CORPUS_DIR`, 再退化为 `$HOME/dataset/CV Dataset`.
    #[arg(long)]
    corpus: Option<PathBuf>,

    #[command(flatten)]
    out: OutputArgs,

    /// 病例 id 前缀.
    #[arg(long, default_value = DEFAULT_CASE_PREFIX)]
    prefix: String,

    /// 标签预设.
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// 允许的标签名, 可重复. 与预设同时给出时取并集.
    #[arg(long = "allow", value_name = "LABEL")]
    allow: Vec<String>,

    /// 只处理名称包含该子串的病例. 覆盖预设中的病例过滤.
    #[arg(long, value_name = "TEXT")]
    case_contains: Option<String>,

    /// 扫描模态.
    #[arg(long, default_value = DEFAULT_MODALITY)]
    modality: String,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// 数据集目录. 缺省为 `<output>/<dataset-name>`.
    task_dir: Option<PathBuf>,

    #[command(flatten)]
    out: OutputArgs,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("cannot initialise logger: {e}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Assemble(args) => runner::assemble(runner::config_from(args)),
        Command::Verify(args) => {
            let dir = args.task_dir.unwrap_or_else(|| args.out.task_dir());
            runner::verify(&dir)
        }
    }
}

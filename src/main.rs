// ==========================================
// 城市地理数据导入 - 命令行主入口
// ==========================================
// 职责: 读取 .env 与命令行参数,调用 ImportApi,打印运行统计与汇总
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_city_import::api::{
    ensure_sqlite_path, get_default_db_path, ImportApi, RunRequest, DB_PATH_ENV,
};
use geo_city_import::config::ConfigManager;
use geo_city_import::domain::{DatasetSummary, RunStatistics};
use geo_city_import::logging;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "geo-city-import")]
#[command(author, version, about = "城市地理数据分批导入工具")]
struct Cli {
    /// SQLite 数据库路径（默认位于用户数据目录）
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<String>,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 导入一段行区间
    Run(RunArgs),

    /// 打印库内数据汇总
    Summary,

    /// 查看某数据源最近一次运行
    Status {
        #[arg(long, env = "GEO_CITY_SOURCE")]
        source: String,
    },

    /// 管理 config_kv 中的默认运行参数
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// 数据文件（.xlsx / .xls / .csv）
    #[arg(long, env = "GEO_CITY_SOURCE")]
    source: String,

    /// 起始行偏移（不含表头,0 起）
    #[arg(long)]
    start: Option<usize>,

    /// 结束行偏移（不包含）; 缺省为数据源末尾
    #[arg(long)]
    end: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    min_population: Option<i64>,

    /// 批次间停顿（毫秒）
    #[arg(long)]
    throttle_ms: Option<u64>,

    /// 本次最多处理的批次数
    #[arg(long)]
    max_batches: Option<usize>,

    /// 每隔多少批次输出一次里程碑（0 关闭）
    #[arg(long)]
    milestone_every: Option<usize>,

    /// 从上次运行的 final_offset 继续
    #[arg(long, conflicts_with = "reset")]
    resume: bool,

    /// 导入前清空 cities 表
    #[arg(long)]
    reset: bool,

    /// CSV 分隔符（单个 ASCII 字符）
    #[arg(long)]
    delimiter: Option<char>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 设置配置值
    Set { key: String, value: String },
    /// 打印全部配置（JSON）
    Show,
}

impl RunArgs {
    fn into_request(self) -> Result<RunRequest> {
        let csv_delimiter = match self.delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => anyhow::bail!("CSV 分隔符必须是 ASCII 字符: {:?}", c),
            None => None,
        };

        Ok(RunRequest {
            source_path: self.source,
            start_offset: self.start,
            end_offset: self.end,
            batch_size: self.batch_size,
            min_population: self.min_population,
            throttle_ms: self.throttle_ms,
            max_batches: self.max_batches,
            milestone_every: self.milestone_every,
            resume: self.resume,
            reset: self.reset,
            csv_delimiter,
        })
    }
}

fn print_statistics(stats: &RunStatistics) {
    println!("==================================================");
    println!("运行 {} : {}", stats.run_id, stats.state);
    println!("区间: [{}, {})  最终偏移: {}", stats.start_offset, stats.end_offset, stats.final_offset);
    println!(
        "批次: {}  读取: {}  新增: {}  跳过: {}",
        stats.batches, stats.processed, stats.inserted, stats.skipped
    );
    println!(
        "数据集进度: {}/{} ({:.1}%)",
        stats.final_offset,
        stats.source_rows,
        stats.dataset_progress_percent()
    );
    if let Some(reason) = &stats.abort_reason {
        println!("中止原因: {}", reason);
        println!("续跑: --start {} 或 --resume", stats.final_offset);
    }
}

fn print_summary(summary: &DatasetSummary) {
    println!("==================================================");
    println!(
        "城市总数: {}  国家数: {}  区域数: {}",
        summary.total_cities, summary.total_countries, summary.total_regions
    );
    println!("城市数最多的国家:");
    for (country, count) in &summary.top_countries {
        println!("  {:<32} {}", country, count);
    }
    println!("人口最多的城市:");
    for city in &summary.largest_cities {
        println!(
            "  {:<32} {:<24} {}",
            city.name,
            city.country,
            city.population.unwrap_or_default()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    ensure_sqlite_path(&db_path)?;
    info!(version = geo_city_import::VERSION, db = %db_path, "{}", geo_city_import::APP_NAME);

    let api = ImportApi::new(db_path.clone());

    match cli.command {
        Command::Run(args) => {
            let request = args.into_request()?;

            // Ctrl-C: 当前批次提交后停止
            let stop = api.stop_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到 Ctrl-C,当前批次完成后停止");
                    stop.request_stop();
                }
            });

            let stats = api.run(request).await.context("导入未能开始")?;
            print_statistics(&stats);

            let summary = api.summary().await.context("汇总查询失败")?;
            print_summary(&summary);

            if !stats.is_completed() {
                std::process::exit(2);
            }
        }
        Command::Summary => {
            let summary = api.summary().await.context("汇总查询失败")?;
            print_summary(&summary);
        }
        Command::Status { source } => match api.last_run(&source)? {
            Some(stats) => print_statistics(&stats),
            None => println!("没有该数据源的运行记录: {}", source),
        },
        Command::Config { action } => {
            let manager = ConfigManager::new(&db_path)?;
            match action {
                ConfigAction::Set { key, value } => {
                    manager.set_config_value(&key, &value)?;
                    println!("{} = {}", key, value);
                }
                ConfigAction::Show => println!("{}", manager.get_config_snapshot()?),
            }
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{BackendOptions, CorpusOptions, MatchOptions, Opts};
use crate::extractor::CachedExtractor;
use crate::orchestrator::Orchestrator;
use crate::report::Report;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub corpus: CorpusOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    #[command(flatten)]
    pub backend: BackendOptions,
    /// 并发处理查询的线程数，0 表示使用全部 CPU
    #[arg(short = 'j', long, value_name = "N", default_value_t = 0)]
    pub threads: usize,
    /// 报告保存路径
    #[arg(short, long, value_name = "FILE", default_value = "resultados_biometria.txt")]
    pub output: PathBuf,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
    /// 不缓存参考图片的描述符，每个查询都重新提取
    #[arg(long)]
    pub no_cache: bool,
}

impl SubCommandExtend for SearchCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let config = self.corpus.to_search_config(self.matching.ratio, self.threads);
        let knn = self.backend.matcher()?;
        let pb = ProgressBar::new(config.queries.len() as u64).with_style(pb_style());

        let report = if self.no_cache {
            Orchestrator::new(config, self.backend.extractor()?, knn).progress(pb).run()?
        } else {
            let extractor = CachedExtractor::new(self.backend.extractor()?);
            let orchestrator = Orchestrator::new(config, extractor, knn).progress(pb);
            let report = orchestrator.run()?;
            info!("共提取 {} 张参考图片的特征", orchestrator.extractor().len());
            report
        };

        report
            .save(&self.output)
            .with_context(|| format!("无法写入报告 {}", self.output.display()))?;
        info!("报告已保存到 {}", self.output.display());

        print_report(&report, self.output_format)
    }
}

fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?)
        }
        OutputFormat::Table => {
            print!("{}", report.to_table());
            eprint!("{}", report.omissions());
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}

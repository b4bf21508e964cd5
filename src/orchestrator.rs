use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::unbounded;
use indicatif::ProgressBar;
use log::{info, warn};

use crate::descriptor;
use crate::extractor::FeatureExtractor;
use crate::knn::NearestNeighbors;
use crate::matcher::RATIO_THRESHOLD;
use crate::partition::{Partition, suffix_regex};
use crate::report::{QueryFailure, Report, format_row};
use crate::resolver::{QueryReportRow, resolve_query};

/// 一次批量搜索的配置
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// 查询描述符文件所在目录
    pub biometrics_dir: PathBuf,
    /// 查询文件名，同时作为报告中的查询标识
    pub queries: Vec<String>,
    /// 按顺序搜索的分区目录
    pub partitions: Vec<PathBuf>,
    /// 逗号分隔的图片后缀名
    pub suffix: String,
    pub ratio: f32,
    /// 线程数，0 表示使用全部 CPU
    pub threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            biometrics_dir: PathBuf::from("Banco/biometria"),
            queries: (1..=8).map(|i| format!("file{}.txt", i)).collect(),
            partitions: (1..=4).map(|i| PathBuf::from(format!("Banco/BD{}", i))).collect(),
            suffix: "tif".to_string(),
            ratio: RATIO_THRESHOLD,
            threads: 0,
        }
    }
}

/// 单个查询的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Row(QueryReportRow),
    Failed(QueryFailure),
}

pub struct Orchestrator<E, K> {
    config: SearchConfig,
    extractor: E,
    knn: K,
    pb: ProgressBar,
}

impl<E: FeatureExtractor, K: NearestNeighbors> Orchestrator<E, K> {
    pub fn new(config: SearchConfig, extractor: E, knn: K) -> Self {
        Self { config, extractor, knn, pb: ProgressBar::hidden() }
    }

    /// 设置用于显示实时进度的进度条，每个查询完成后立即输出一行
    pub fn progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    /// 输出一个查询的实时结果
    ///
    /// 进度条被隐藏时（stderr 不是终端）`pb.println` 不会输出任何内容，
    /// 此时直接写到 stderr。
    fn print_live(&self, outcome: &QueryOutcome) {
        let line = match outcome {
            QueryOutcome::Row(row) => format_row(row),
            QueryOutcome::Failed(f) => format!("{}: {}", f.query, f.reason),
        };
        if self.pb.is_hidden() {
            eprintln!("{}", line);
        } else {
            self.pb.println(line);
        }
        self.pb.inc(1);
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// 打开所有分区，不存在的分区会被跳过
    fn open_partitions(&self) -> Result<(Vec<Partition>, Vec<String>)> {
        let re_suf = suffix_regex(&self.config.suffix)?;
        let mut partitions = vec![];
        let mut skipped = vec![];
        for path in &self.config.partitions {
            match Partition::open(path, &re_suf) {
                Ok(partition) => partitions.push(partition),
                Err(e) => {
                    warn!("跳过分区: {}", e);
                    skipped.push(path.display().to_string());
                }
            }
        }
        Ok((partitions, skipped))
    }

    /// 读取并搜索单个查询，任何错误都只影响该查询
    pub fn process(&self, query: &str, partitions: &[Partition]) -> QueryOutcome {
        let path = self.config.biometrics_dir.join(query);
        let descriptors = match descriptor::load(&path) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                warn!("无法处理查询 {}: {}", query, e);
                return QueryOutcome::Failed(QueryFailure {
                    query: query.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        if descriptors.is_empty() {
            warn!("查询 {} 不包含任何描述符", query);
        }
        QueryOutcome::Row(resolve_query(
            query,
            &descriptors,
            partitions,
            &self.extractor,
            &self.knn,
            self.config.ratio,
        ))
    }

    /// 并发处理所有查询
    ///
    /// 每个查询一个任务，完成后通过 channel 交给当前线程统一输出进度，
    /// 最终报告按查询提交顺序排列，与完成顺序无关。
    pub fn run(&self) -> Result<Report> {
        let start = Instant::now();

        let (partitions, skipped_partitions) = self.open_partitions()?;
        let threads = match self.config.threads {
            0 => num_cpus::get(),
            n => n,
        };
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        info!("使用 {} 个线程处理 {} 个查询", threads, self.config.queries.len());

        let queries = &self.config.queries;
        let partitions = &partitions;
        let pb = &self.pb;
        pb.set_length(queries.len() as u64);

        let mut slots: Vec<Option<QueryOutcome>> = vec![None; queries.len()];
        let (tx, rx) = unbounded();
        pool.in_place_scope(|s| {
            for (idx, query) in queries.iter().enumerate() {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let outcome = self.process(query, partitions);
                    // 接收端只会在所有发送端释放后结束，这里不会失败
                    let _ = tx.send((idx, outcome));
                });
            }
            drop(tx);

            for (idx, outcome) in rx.iter() {
                self.print_live(&outcome);
                slots[idx] = Some(outcome);
            }
        });
        pb.finish_and_clear();

        let mut report =
            Report { skipped_partitions, elapsed: start.elapsed(), ..Default::default() };
        for outcome in slots.into_iter().flatten() {
            match outcome {
                QueryOutcome::Row(row) => report.rows.push(row),
                QueryOutcome::Failed(f) => report.failures.push(f),
            }
        }
        Ok(report)
    }
}

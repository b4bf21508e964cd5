use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::*;
use crate::extractor::{FeatureExtractor, SidecarExtractor};
use crate::knn::{BruteForceMatcher, NearestNeighbors};
use crate::matcher::RATIO_THRESHOLD;
use crate::orchestrator::SearchConfig;

#[derive(Parser, Debug, Clone)]
pub struct BackendOptions {
    /// 参考图片的特征提取方式
    #[arg(long, value_enum, default_value_t = ExtractorKind::default())]
    pub extractor: ExtractorKind,
    /// 最近邻搜索方式
    #[arg(long, value_enum, default_value_t = MatcherKind::Brute)]
    pub matcher: MatcherKind,
    /// FLANN KD 树数量
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub flann_trees: i32,
    /// FLANN 搜索时的检查次数
    #[arg(long, value_name = "N", default_value_t = 32)]
    pub flann_checks: i32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// 使用 OpenCV SIFT 从图片中提取
    Sift,
    /// 读取图片旁预先计算好的 `<图片>.txt`
    Sidecar,
}

impl Default for ExtractorKind {
    fn default() -> Self {
        if cfg!(feature = "opencv") { Self::Sift } else { Self::Sidecar }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// 精确 L2 暴力搜索
    Brute,
    /// OpenCV FLANN KD 树
    Flann,
}

impl BackendOptions {
    pub fn extractor(&self) -> Result<Box<dyn FeatureExtractor>> {
        match self.extractor {
            ExtractorKind::Sidecar => Ok(Box::new(SidecarExtractor)),
            #[cfg(feature = "opencv")]
            ExtractorKind::Sift => Ok(Box::new(crate::vision::SiftExtractor)),
            #[cfg(not(feature = "opencv"))]
            ExtractorKind::Sift => anyhow::bail!("SIFT 需要启用 opencv 特性编译"),
        }
    }

    pub fn matcher(&self) -> Result<Box<dyn NearestNeighbors>> {
        match self.matcher {
            MatcherKind::Brute => Ok(Box::new(BruteForceMatcher)),
            #[cfg(feature = "opencv")]
            MatcherKind::Flann => {
                Ok(Box::new(crate::vision::FlannMatcher::new(self.flann_trees, self.flann_checks)))
            }
            #[cfg(not(feature = "opencv"))]
            MatcherKind::Flann => anyhow::bail!("FLANN 需要启用 opencv 特性编译"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct MatchOptions {
    /// 比率测试阈值，最近距离小于次近距离乘以该值时才认为匹配有效
    #[arg(long, value_name = "RATIO", default_value_t = RATIO_THRESHOLD, value_parser = parse_ratio)]
    pub ratio: f32,
}

#[derive(Parser, Debug, Clone)]
pub struct CorpusOptions {
    /// 查询描述符文件所在目录
    #[arg(short = 'b', long, value_name = "DIR", default_value = "Banco/biometria")]
    pub biometrics_dir: PathBuf,
    /// 查询文件名，多个用逗号分隔
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "file1.txt,file2.txt,file3.txt,file4.txt,file5.txt,file6.txt,file7.txt,file8.txt"
    )]
    pub queries: Vec<String>,
    /// 按顺序搜索的分区目录，多个用逗号分隔
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "Banco/BD1,Banco/BD2,Banco/BD3,Banco/BD4"
    )]
    pub partitions: Vec<PathBuf>,
    /// 参考图片的后缀名，多个用逗号分隔
    #[arg(short, long, default_value = "tif")]
    pub suffix: String,
}

impl CorpusOptions {
    pub fn to_search_config(&self, ratio: f32, threads: usize) -> SearchConfig {
        SearchConfig {
            biometrics_dir: self.biometrics_dir.clone(),
            queries: self.queries.clone(),
            partitions: self.partitions.clone(),
            suffix: self.suffix.clone(),
            ratio,
            threads,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "fpsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 在所有分区中搜索每个查询的最佳匹配，并输出报告
    Search(SearchCommand),
    /// 比较一个描述符文件与一张参考图片
    Match(MatchCommand),
    /// 提取图片特征并保存为描述符文件
    Extract(ExtractCommand),
}

fn parse_ratio(s: &str) -> Result<f32, String> {
    let ratio: f32 = s.parse().map_err(|e| format!("无效的比率: {}", e))?;
    if !(ratio > 0. && ratio <= 1.) {
        return Err(format!("比率应在 (0, 1] 之间: {}", s));
    }
    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Opts::command().debug_assert();
    }

    #[test]
    fn search_defaults_match_corpus_layout() {
        let opts = Opts::try_parse_from(["fpsearch", "search"]).unwrap();
        let SubCommand::Search(cmd) = opts.subcmd else { panic!("expected search") };
        let config = cmd.corpus.to_search_config(cmd.matching.ratio, cmd.threads);
        let default = SearchConfig::default();
        assert_eq!(config.queries, default.queries);
        assert_eq!(config.partitions, default.partitions);
        assert_eq!(config.biometrics_dir, default.biometrics_dir);
        assert_eq!(config.suffix, default.suffix);
        assert_eq!(config.ratio, RATIO_THRESHOLD);
    }

    #[test]
    fn comma_separated_lists() {
        let opts =
            Opts::try_parse_from(["fpsearch", "search", "-q", "a.txt,b.txt", "-p", "X/A,X/B,X/C"])
                .unwrap();
        let SubCommand::Search(cmd) = opts.subcmd else { panic!("expected search") };
        assert_eq!(cmd.corpus.queries, vec!["a.txt", "b.txt"]);
        assert_eq!(cmd.corpus.partitions.len(), 3);
    }

    #[test]
    fn ratio_range() {
        assert_eq!(parse_ratio("0.8"), Ok(0.8));
        assert!(parse_ratio("0").is_err());
        assert!(parse_ratio("1.5").is_err());
        assert!(parse_ratio("abc").is_err());
    }
}

use std::path::PathBuf;

use log::debug;
use serde::Serialize;

use crate::descriptor::DescriptorMatrix;
use crate::extractor::FeatureExtractor;
use crate::knn::NearestNeighbors;
use crate::partition::{Partition, scan_partition};

/// 没有任何分区产生匹配时报告中显示的内容
pub const NO_MATCH: &str = "Nenhuma correspondência encontrada";

/// 报告中的一行，对应一个查询在所有分区中的最佳结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReportRow {
    pub query: String,
    /// 最佳匹配所在分区，没有匹配时为 None
    pub partition: Option<String>,
    pub image: Option<PathBuf>,
    pub accepted: usize,
    pub percentage: f32,
}

impl QueryReportRow {
    pub fn no_match(query: impl Into<String>) -> Self {
        Self { query: query.into(), partition: None, image: None, accepted: 0, percentage: 0. }
    }

    pub fn is_match(&self) -> bool {
        self.image.is_some()
    }

    /// 图片的文件名，没有匹配时为 [`NO_MATCH`]
    pub fn image_name(&self) -> String {
        match &self.image {
            Some(path) => path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
            None => NO_MATCH.to_string(),
        }
    }
}

/// 依次扫描所有分区，选出匹配数最多的结果，并列时保留排在前面的分区
pub fn resolve_query(
    query_id: &str,
    descriptors: &DescriptorMatrix,
    partitions: &[Partition],
    extractor: &dyn FeatureExtractor,
    knn: &dyn NearestNeighbors,
    ratio: f32,
) -> QueryReportRow {
    let mut best: Option<QueryReportRow> = None;
    for partition in partitions {
        let Some(result) = scan_partition(descriptors, partition, extractor, knn, ratio) else {
            debug!("{}: 分区 {} 没有匹配", query_id, partition.name());
            continue;
        };
        if best.as_ref().is_none_or(|b| result.accepted > b.accepted) {
            best = Some(QueryReportRow {
                query: query_id.to_string(),
                partition: Some(partition.name().to_string()),
                image: Some(result.image),
                accepted: result.accepted,
                percentage: result.percentage,
            });
        }
    }
    best.unwrap_or_else(|| QueryReportRow::no_match(query_id))
}

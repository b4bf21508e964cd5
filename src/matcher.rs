use std::path::PathBuf;

use serde::Serialize;

use crate::descriptor::DescriptorMatrix;
use crate::error::MatchError;
use crate::knn::NearestNeighbors;

/// Lowe 比率测试的默认阈值
pub const RATIO_THRESHOLD: f32 = 0.75;

/// 统计通过比率测试的匹配数量
///
/// 对 query 中每个向量，在 reference 中找到最近的两个向量，距离为 d1 <= d2，
/// 当 d1 < ratio * d2 时认为该匹配有效。
/// reference 少于两个向量时无法进行比率测试，直接返回 0。
pub fn count_good_matches(
    query: &DescriptorMatrix,
    reference: &DescriptorMatrix,
    knn: &dyn NearestNeighbors,
    ratio: f32,
) -> Result<usize, MatchError> {
    if query.is_empty() || reference.len() < 2 {
        return Ok(0);
    }
    if query.dim() != reference.dim() {
        return Err(MatchError::DimensionMismatch { query: query.dim(), train: reference.dim() });
    }
    let matches = knn.knn2(query, reference)?;
    Ok(matches.into_iter().filter(|&(d1, d2)| d1 < ratio * d2).count())
}

/// 匹配数占查询描述符数量的百分比，查询为空时没有意义，返回 None
pub fn percentage(accepted: usize, total: usize) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some(accepted as f32 * 100. / total as f32)
}

/// 一张参考图片的匹配结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub image: PathBuf,
    pub accepted: usize,
    pub percentage: f32,
}

impl MatchResult {
    pub fn new(image: PathBuf, accepted: usize, total: usize) -> Option<Self> {
        percentage(accepted, total).map(|percentage| Self { image, accepted, percentage })
    }
}

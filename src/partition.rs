use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::descriptor::DescriptorMatrix;
use crate::error::PartitionError;
use crate::extractor::FeatureExtractor;
use crate::knn::NearestNeighbors;
use crate::matcher::{MatchResult, count_good_matches};

/// 根据逗号分隔的后缀名列表构造不区分大小写的匹配规则
pub fn suffix_regex(suffix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?i)({})$", suffix.replace(',', "|")))
}

/// 一个参考图片分区（数据库目录）
#[derive(Debug, Clone)]
pub struct Partition {
    name: String,
    images: Vec<PathBuf>,
}

impl Partition {
    /// 扫描目录下（不递归）后缀匹配的图片，按路径字典序排列
    pub fn open(path: impl AsRef<Path>, re_suf: &Regex) -> Result<Self, PartitionError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(PartitionError::NotFound(path.to_path_buf()));
        }

        let mut images = vec![];
        for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
            let entry = entry
                .map_err(|source| PartitionError::Io { path: path.to_path_buf(), source })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matched = entry
                .path()
                .extension()
                .is_some_and(|ext| re_suf.is_match(&ext.to_string_lossy()));
            if matched {
                images.push(entry.into_path());
            }
        }
        // 目录遍历顺序不固定，排序后并列时的选择才是确定的
        images.sort();

        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        info!("分区 {}: {} 张图片", name, images.len());

        Ok(Self { name, images })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }
}

/// 在分区中寻找与查询最相似的图片
///
/// 只有匹配数严格大于当前最佳值时才会替换，因此并列时保留排序靠前的图片。
/// 分区为空、查询为空或所有图片匹配数均为 0 时返回 None。
/// 单张图片提取或匹配失败只会跳过该图片。
pub fn scan_partition(
    query: &DescriptorMatrix,
    partition: &Partition,
    extractor: &dyn FeatureExtractor,
    knn: &dyn NearestNeighbors,
    ratio: f32,
) -> Option<MatchResult> {
    if query.is_empty() {
        return None;
    }

    let mut best: Option<(usize, &PathBuf)> = None;
    for image in partition.images() {
        let accepted = extractor
            .detect_and_describe(image)
            .and_then(|des| count_good_matches(query, &des, knn, ratio));
        let accepted = match accepted {
            Ok(n) => n,
            Err(e) => {
                warn!("跳过图片 {}: {}", image.display(), e);
                continue;
            }
        };
        debug!("{}: {} 个匹配", image.display(), accepted);
        if accepted > best.map_or(0, |(n, _)| n) {
            best = Some((accepted, image));
        }
    }

    best.and_then(|(accepted, image)| MatchResult::new(image.clone(), accepted, query.len()))
}

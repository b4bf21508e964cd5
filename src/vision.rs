//! 基于 OpenCV 的特征提取与近邻搜索

use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use opencv::core::{DMatch, KeyPoint, Mat, Ptr, Vector};
use opencv::prelude::*;
use opencv::{features2d, flann, imgcodecs};

use crate::descriptor::DescriptorMatrix;
use crate::error::MatchError;
use crate::extractor::FeatureExtractor;
use crate::knn::NearestNeighbors;

thread_local! {
    // SIFT 实例不能跨线程共享，每个线程各自创建一个
    static SIFT: RefCell<Option<Ptr<features2d::SIFT>>> = const { RefCell::new(None) };
}

/// 以灰度模式读取图片
pub fn imread(path: &Path) -> Result<Mat, MatchError> {
    let filename = path.to_string_lossy();
    let image = imgcodecs::imread(&filename, imgcodecs::IMREAD_GRAYSCALE)?;
    if image.empty() {
        return Err(MatchError::Backend(format!("无法解码图片: {}", filename).into()));
    }
    Ok(image)
}

/// 使用默认参数的 SIFT 计算图片的描述符
pub fn detect_and_compute(image: &Mat) -> Result<DescriptorMatrix, MatchError> {
    let descriptors = SIFT.with(|cell| -> opencv::Result<Mat> {
        let mut cell = cell.borrow_mut();
        let mut sift = match cell.take() {
            Some(sift) => sift,
            None => features2d::SIFT::create_def()?,
        };
        let mask = Mat::default();
        let mut kps = Vector::<KeyPoint>::new();
        let mut des = Mat::default();
        let result = sift.detect_and_compute(image, &mask, &mut kps, &mut des, false);
        *cell = Some(sift);
        result.map(|_| des)
    })?;
    mat_to_matrix(&descriptors)
}

/// 将 CV_32F 的 Mat 转换为描述符矩阵
pub fn mat_to_matrix(mat: &Mat) -> Result<DescriptorMatrix, MatchError> {
    if mat.rows() == 0 {
        return Ok(DescriptorMatrix::empty());
    }
    let data = mat.data_typed::<f32>()?.to_vec();
    DescriptorMatrix::from_flat(mat.cols() as usize, data)
        .ok_or_else(|| MatchError::Backend("描述符矩阵尺寸错误".into()))
}

/// 将描述符矩阵转换为 CV_32F 的 Mat
pub fn matrix_to_mat(matrix: &DescriptorMatrix) -> Result<Mat, MatchError> {
    let data = matrix
        .as_flat()
        .ok_or_else(|| MatchError::Backend("描述符矩阵不连续".into()))?;
    let mat = Mat::new_rows_cols_with_data(matrix.len() as i32, matrix.dim() as i32, data)?;
    Ok(mat.try_clone()?)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SiftExtractor;

impl FeatureExtractor for SiftExtractor {
    fn detect_and_describe(&self, image: &Path) -> Result<Arc<DescriptorMatrix>, MatchError> {
        let image = imread(image)?;
        Ok(Arc::new(detect_and_compute(&image)?))
    }
}

/// 使用 KD 树索引的 FLANN 近似近邻搜索
#[derive(Debug, Clone, Copy)]
pub struct FlannMatcher {
    trees: i32,
    checks: i32,
}

impl FlannMatcher {
    pub fn new(trees: i32, checks: i32) -> Self {
        Self { trees, checks }
    }

    fn build(&self) -> opencv::Result<features2d::FlannBasedMatcher> {
        let index_params =
            Ptr::new(flann::IndexParams::from(flann::KDTreeIndexParams::new(self.trees)?));
        let search_params = Ptr::new(flann::SearchParams::new_1(self.checks, 0.0, true)?);
        features2d::FlannBasedMatcher::new(&index_params, &search_params)
    }
}

impl Default for FlannMatcher {
    fn default() -> Self {
        Self::new(5, 32)
    }
}

impl NearestNeighbors for FlannMatcher {
    fn knn2(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
    ) -> Result<Vec<(f32, f32)>, MatchError> {
        if query.dim() != train.dim() {
            return Err(MatchError::DimensionMismatch { query: query.dim(), train: train.dim() });
        }
        let des1 = matrix_to_mat(query)?;
        let des2 = matrix_to_mat(train)?;

        // FlannBasedMatcher 不能跨线程共享，每次调用单独创建
        let flann = self.build()?;
        let mut matches = Vector::<Vector<DMatch>>::new();
        let mask = Mat::default();
        flann.knn_train_match(&des1, &des2, &mut matches, 2, &mask, false)?;

        let mut result = Vec::with_capacity(matches.len());
        for match_ in matches.iter() {
            if match_.len() != 2 {
                result.push((f32::INFINITY, f32::INFINITY));
                continue;
            }
            let (m, n) = (match_.get(0)?, match_.get(1)?);
            result.push((m.distance, n.distance));
        }
        Ok(result)
    }
}

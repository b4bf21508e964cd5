use ndarray::ArrayView1;

use crate::descriptor::DescriptorMatrix;
use crate::error::MatchError;

/// 最近邻搜索能力
pub trait NearestNeighbors: Send + Sync {
    /// 为 query 中的每个向量在 train 中查找最近的两个向量，返回两者的距离 (d1, d2)，d1 <= d2
    ///
    /// 调用方需保证 train 至少包含两个向量，且两者维度一致。
    fn knn2(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
    ) -> Result<Vec<(f32, f32)>, MatchError>;
}

impl<T: NearestNeighbors + ?Sized> NearestNeighbors for Box<T> {
    fn knn2(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
    ) -> Result<Vec<(f32, f32)>, MatchError> {
        (**self).knn2(query, train)
    }
}

/// 精确的 L2 暴力搜索
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForceMatcher;

impl NearestNeighbors for BruteForceMatcher {
    fn knn2(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
    ) -> Result<Vec<(f32, f32)>, MatchError> {
        if query.dim() != train.dim() {
            return Err(MatchError::DimensionMismatch { query: query.dim(), train: train.dim() });
        }
        Ok(query.rows().map(|q| knn2_l2(q, train)).collect())
    }
}

#[inline(always)]
pub fn l2_squared(va: ArrayView1<f32>, vb: ArrayView1<f32>) -> f32 {
    va.iter().zip(vb.iter()).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// 计算向量 va 与 train 中所有向量的 L2 距离，返回最小的两个距离
///
/// train 中不足两个向量时，缺失的距离为 f32::INFINITY
pub fn knn2_l2(va: ArrayView1<f32>, train: &DescriptorMatrix) -> (f32, f32) {
    // 比较时使用距离的平方，最后再开方
    let (mut d1, mut d2) = (f32::INFINITY, f32::INFINITY);
    for vb in train.rows() {
        let d = l2_squared(va, vb);
        if d < d1 {
            d2 = d1;
            d1 = d;
        } else if d < d2 {
            d2 = d;
        }
    }
    (d1.sqrt(), d2.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f32]]) -> DescriptorMatrix {
        DescriptorMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn knn2_returns_sorted_distances() {
        let train = matrix(&[&[0., 4.], &[0., 1.], &[0., 2.]]);
        let (d1, d2) = knn2_l2(matrix(&[&[0., 0.]]).rows().next().unwrap(), &train);
        assert_eq!(d1, 1.);
        assert_eq!(d2, 2.);
    }

    #[test]
    fn knn2_euclidean() {
        let train = matrix(&[&[3., 4.], &[6., 8.]]);
        let query = matrix(&[&[0., 0.], &[6., 8.]]);
        let result = BruteForceMatcher.knn2(&query, &train).unwrap();
        assert_eq!(result, vec![(5., 10.), (0., 5.)]);
    }

    #[test]
    fn knn2_duplicate_nearest() {
        let train = matrix(&[&[1., 1.], &[1., 1.], &[5., 5.]]);
        let query = matrix(&[&[1., 1.]]);
        assert_eq!(BruteForceMatcher.knn2(&query, &train).unwrap(), vec![(0., 0.)]);
    }

    #[test]
    fn knn2_single_train_vector() {
        let train = matrix(&[&[1., 0.]]);
        let (d1, d2) = knn2_l2(matrix(&[&[0., 0.]]).rows().next().unwrap(), &train);
        assert_eq!(d1, 1.);
        assert!(d2.is_infinite());
    }

    #[test]
    fn knn2_dimension_mismatch() {
        let train = matrix(&[&[1., 0.], &[0., 1.]]);
        let query = matrix(&[&[1., 0., 0.]]);
        assert!(matches!(
            BruteForceMatcher.knn2(&query, &train),
            Err(MatchError::DimensionMismatch { query: 3, train: 2 })
        ));
    }
}

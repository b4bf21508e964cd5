use std::path::PathBuf;

use thiserror::Error;

/// 读取特征描述符文件时的错误
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// 文件不存在
    #[error("文件不存在: {}", .0.display())]
    NotFound(PathBuf),

    /// 其他 IO 错误
    #[error("读取 {} 失败: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 某一行中出现了无法解析为浮点数的值
    #[error("{}:{line}: 无法解析数值 {token:?}", .path.display())]
    Parse { path: PathBuf, line: usize, token: String },

    /// 某一行的向量长度与前面的行不一致
    #[error("{}:{line}: 向量维度为 {found}，应为 {expected}", .path.display())]
    InconsistentDimension { path: PathBuf, line: usize, expected: usize, found: usize },
}

impl DescriptorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// 打开图片分区时的错误
#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("分区目录不存在: {}", .0.display())]
    NotFound(PathBuf),

    #[error("扫描分区 {} 失败: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// 特征提取或近邻搜索时的错误
#[derive(Error, Debug)]
pub enum MatchError {
    /// 两组描述符的维度不同，无法比较
    #[error("描述符维度不一致: 查询为 {query}，参考为 {train}")]
    DimensionMismatch { query: usize, train: usize },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// 由视觉库返回的错误
    #[error("视觉库错误: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for MatchError {
    fn from(err: opencv::Error) -> Self {
        Self::Backend(Box::new(err))
    }
}

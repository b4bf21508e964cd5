use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::Path;

use log::debug;
use ndarray::prelude::*;

use crate::error::DescriptorError;

/// 一组等长的 f32 特征描述符，每行一个向量
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorMatrix(Array2<f32>);

impl DescriptorMatrix {
    pub fn empty() -> Self {
        Self(Array2::zeros((0, 0)))
    }

    /// 从按行展开的数据构造矩阵，数据长度必须是 dim 的整数倍
    pub fn from_flat(dim: usize, data: Vec<f32>) -> Option<Self> {
        if dim == 0 {
            return data.is_empty().then(Self::empty);
        }
        if data.len() % dim != 0 {
            return None;
        }
        let rows = data.len() / dim;
        Array2::from_shape_vec((rows, dim), data).ok().map(Self)
    }

    /// 从若干行构造矩阵，各行长度不一致时返回 None
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Option<Self> {
        let dim = rows.first().map_or(0, |r| r.as_ref().len());
        if rows.iter().any(|r| r.as_ref().len() != dim) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.as_ref().iter().copied()).collect();
        Self::from_flat(dim, data)
    }

    /// 向量数量
    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 向量维度
    pub fn dim(&self) -> usize {
        self.0.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = ArrayView1<'_, f32>> {
        self.0.outer_iter()
    }

    /// 按行展开的连续数据
    pub fn as_flat(&self) -> Option<&[f32]> {
        self.0.as_slice()
    }
}

/// 读取文本格式的描述符文件：每行一个向量，数值之间以空白分隔
///
/// 空行会被忽略，因此空文件得到一个空矩阵。
pub fn load(path: impl AsRef<Path>) -> Result<DescriptorMatrix, DescriptorError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DescriptorError::NotFound(path.to_path_buf()),
        _ => DescriptorError::Io { path: path.to_path_buf(), source: e },
    })?;
    let matrix = parse(path, &text)?;
    debug!("读取描述符 {}: {}x{}", path.display(), matrix.len(), matrix.dim());
    Ok(matrix)
}

fn parse(path: &Path, text: &str) -> Result<DescriptorMatrix, DescriptorError> {
    let mut dim = None;
    let mut data = vec![];

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let start = data.len();
        for token in line.split_ascii_whitespace() {
            let value = token.parse::<f32>().map_err(|_| DescriptorError::Parse {
                path: path.to_path_buf(),
                line: line_no,
                token: token.to_string(),
            })?;
            data.push(value);
        }
        let found = data.len() - start;
        if found == 0 {
            continue;
        }
        match dim {
            None => dim = Some(found),
            Some(expected) if expected != found => {
                return Err(DescriptorError::InconsistentDimension {
                    path: path.to_path_buf(),
                    line: line_no,
                    expected,
                    found,
                });
            }
            Some(_) => {}
        }
    }

    // 每行长度都已校验过，这里不会失败
    Ok(DescriptorMatrix::from_flat(dim.unwrap_or(0), data).unwrap_or_else(DescriptorMatrix::empty))
}

/// 以与 [`load`] 相同的格式写入描述符文件
pub fn save(path: impl AsRef<Path>, matrix: &DescriptorMatrix) -> Result<(), DescriptorError> {
    let path = path.as_ref();
    let mut text = String::with_capacity(matrix.len() * matrix.dim() * 4);
    for row in matrix.rows() {
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            let _ = write!(text, "{}", v);
        }
        text.push('\n');
    }
    std::fs::write(path, text)
        .map_err(|source| DescriptorError::Io { path: path.to_path_buf(), source })
}

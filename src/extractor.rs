use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::debug;

use crate::descriptor::{self, DescriptorMatrix};
use crate::error::MatchError;

/// 特征提取能力：读取一张参考图片并计算其局部特征描述符
pub trait FeatureExtractor: Send + Sync {
    fn detect_and_describe(&self, image: &Path) -> Result<Arc<DescriptorMatrix>, MatchError>;
}

impl<T: FeatureExtractor + ?Sized> FeatureExtractor for Box<T> {
    fn detect_and_describe(&self, image: &Path) -> Result<Arc<DescriptorMatrix>, MatchError> {
        (**self).detect_and_describe(image)
    }
}

/// 从图片旁的 `<图片文件名>.txt` 中读取预先计算好的描述符
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarExtractor;

impl SidecarExtractor {
    pub fn sidecar_path(image: &Path) -> PathBuf {
        let mut name = image.as_os_str().to_os_string();
        name.push(".txt");
        PathBuf::from(name)
    }
}

impl FeatureExtractor for SidecarExtractor {
    fn detect_and_describe(&self, image: &Path) -> Result<Arc<DescriptorMatrix>, MatchError> {
        Ok(Arc::new(descriptor::load(Self::sidecar_path(image))?))
    }
}

/// 缓存每张图片的描述符，同一次运行中每张参考图片只提取一次
pub struct CachedExtractor<E> {
    inner: E,
    cache: RwLock<HashMap<PathBuf, Arc<DescriptorMatrix>>>,
}

impl<E: FeatureExtractor> CachedExtractor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner, cache: RwLock::new(HashMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: FeatureExtractor> FeatureExtractor for CachedExtractor<E> {
    fn detect_and_describe(&self, image: &Path) -> Result<Arc<DescriptorMatrix>, MatchError> {
        if let Some(des) = self.cache.read().ok().and_then(|c| c.get(image).cloned()) {
            return Ok(des);
        }
        // 多个线程可能同时计算同一张图片，结果相同，保留先写入的即可
        let des = self.inner.detect_and_describe(image)?;
        debug!("提取特征 {}: {}", image.display(), des.len());
        match self.cache.write() {
            Ok(mut cache) => Ok(cache.entry(image.to_path_buf()).or_insert(des).clone()),
            Err(_) => Ok(des),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting(AtomicUsize);

    impl FeatureExtractor for Counting {
        fn detect_and_describe(&self, _: &Path) -> Result<Arc<DescriptorMatrix>, MatchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(DescriptorMatrix::from_rows(&[[1f32, 2.]]).unwrap()))
        }
    }

    #[test]
    fn cache_extracts_once_per_image() {
        let cached = CachedExtractor::new(Counting(AtomicUsize::new(0)));
        for _ in 0..3 {
            cached.detect_and_describe(Path::new("a.tif")).unwrap();
            cached.detect_and_describe(Path::new("b.tif")).unwrap();
        }
        assert_eq!(cached.inner.0.load(Ordering::SeqCst), 2);
        assert_eq!(cached.len(), 2);
    }

    #[test]
    fn sidecar_path_appends_txt() {
        assert_eq!(
            SidecarExtractor::sidecar_path(Path::new("Banco/BD1/101_1.tif")),
            PathBuf::from("Banco/BD1/101_1.tif.txt")
        );
    }

    #[test]
    fn sidecar_missing_file() {
        let err = SidecarExtractor.detect_and_describe(Path::new("/nonexistent/1.tif")).unwrap_err();
        assert!(matches!(err, MatchError::Descriptor(e) if e.is_not_found()));
    }
}

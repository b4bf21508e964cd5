use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{BackendOptions, Opts};
use crate::descriptor;

#[derive(Parser, Debug, Clone)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub backend: BackendOptions,
    /// 图片路径
    pub image: PathBuf,
    /// 描述符保存路径，每行一个向量
    pub output: PathBuf,
}

impl SubCommandExtend for ExtractCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let extractor = self.backend.extractor()?;
        let des = extractor.detect_and_describe(&self.image)?;
        descriptor::save(&self.output, &des)?;
        info!("{}: 保存 {} 个描述符到 {}", self.image.display(), des.len(), self.output.display());
        Ok(())
    }
}

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{BackendOptions, MatchOptions, Opts};
use crate::descriptor;
use crate::matcher::{count_good_matches, percentage};

#[derive(Parser, Debug, Clone)]
pub struct MatchCommand {
    #[command(flatten)]
    pub matching: MatchOptions,
    #[command(flatten)]
    pub backend: BackendOptions,
    /// 查询描述符文件
    pub descriptors: PathBuf,
    /// 参考图片
    pub image: PathBuf,
}

impl SubCommandExtend for MatchCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let query = descriptor::load(&self.descriptors)?;
        let extractor = self.backend.extractor()?;
        let knn = self.backend.matcher()?;

        let reference = extractor.detect_and_describe(&self.image)?;
        let accepted = count_good_matches(&query, &reference, &knn, self.matching.ratio)?;

        println!("查询描述符: {}", query.len());
        println!("参考描述符: {}", reference.len());
        println!("有效匹配  : {}", accepted);
        match percentage(accepted, query.len()) {
            Some(p) => println!("相似度    : {:.2}%", p),
            None => println!("相似度    : -"),
        }
        Ok(())
    }
}

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::resolver::QueryReportRow;

/// 无法处理的查询及原因
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub query: String,
    pub reason: String,
}

/// 一次批量搜索的完整结果，行按查询提交顺序排列
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub rows: Vec<QueryReportRow>,
    pub failures: Vec<QueryFailure>,
    /// 不存在或无法读取的分区
    pub skipped_partitions: Vec<String>,
    #[serde(rename = "time", serialize_with = "as_secs")]
    pub elapsed: Duration,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

pub fn header() -> String {
    format!(
        "{:<10} | {:<15} | {:<25} | Similaridade",
        "Biometria", "Banco de Dados", "Imagem Correspondente"
    )
}

pub fn separator() -> String {
    format!("{} | {} | {} | {}", "-".repeat(10), "-".repeat(15), "-".repeat(25), "-".repeat(12))
}

pub fn format_row(row: &QueryReportRow) -> String {
    format!(
        "{:<10} | {:<15} | {:<25} | {:.2}%",
        row.query,
        row.partition.as_deref().unwrap_or("-"),
        row.image_name(),
        row.percentage
    )
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format!("Tempo total de execução: {:.2} segundos", elapsed.as_secs_f64())
}

impl Report {
    /// 以表格形式输出，末尾附带总耗时
    pub fn to_table(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{}", header());
        let _ = writeln!(s, "{}", separator());
        for row in &self.rows {
            let _ = writeln!(s, "{}", format_row(row));
        }
        let _ = writeln!(s, "{}", separator());
        let _ = writeln!(s, "{}", format_elapsed(self.elapsed));
        s
    }

    /// 被跳过的分区和无法处理的查询，每项一行
    pub fn omissions(&self) -> String {
        let mut s = String::new();
        for partition in &self.skipped_partitions {
            let _ = writeln!(s, "[SKIP] 分区不存在: {}", partition);
        }
        for failure in &self.failures {
            let _ = writeln!(s, "[ERR] {}: {}", failure.query, failure.reason);
        }
        s
    }

    /// 保存表格，缺失的分区和查询列在表格之后
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_table() + &self.omissions())
    }
}

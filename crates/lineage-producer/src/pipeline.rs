use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use lineage_core::Dataset;

use crate::JobError;

/// 结果文件名，与分布式写出时的首个分片同名。
pub const SUMMARY_FILE: &str = "part-00000.csv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Employee {
    pub name: String,
    pub age: u32,
    pub role: String,
}

impl Employee {
    fn new(name: &str, age: u32, role: &str) -> Self {
        Self {
            name: name.to_owned(),
            age,
            role: role.to_owned(),
        }
    }
}

/// 演示作业的四行输入数据。
pub fn sample_employees() -> Vec<Employee> {
    vec![
        Employee::new("Alice", 25, "Engineer"),
        Employee::new("Bob", 30, "Manager"),
        Employee::new("Charlie", 35, "Analyst"),
        Employee::new("Diana", 28, "Developer"),
    ]
}

pub fn older_than(rows: &[Employee], age: u32) -> Vec<Employee> {
    rows.iter().filter(|row| row.age > age).cloned().collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoleSummary {
    pub role: String,
    pub count: usize,
    pub avg_age: f64,
}

/// 按角色统计人数与平均年龄，结果按角色名排序。
pub fn summarize_by_role(rows: &[Employee]) -> Vec<RoleSummary> {
    let mut groups: BTreeMap<&str, (usize, u64)> = BTreeMap::new();
    for row in rows {
        let (count, total) = groups.entry(row.role.as_str()).or_default();
        *count += 1;
        *total += u64::from(row.age);
    }
    groups
        .into_iter()
        .map(|(role, (count, total))| RoleSummary {
            role: role.to_owned(),
            count,
            avg_age: total as f64 / count as f64,
        })
        .collect()
}

/// 汇总结果的写出位置。
///
/// 带 `scheme://` 前缀（`file://` 除外）的路径视为远端对象存储，只在血缘事件里登记，
/// 不实际写出；其余按本地目录处理。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputLocation {
    Local(PathBuf),
    Remote(String),
}

impl OutputLocation {
    pub fn parse(raw: &str) -> Self {
        if let Some(path) = raw.strip_prefix("file://") {
            return Self::Local(PathBuf::from(path));
        }
        if raw.contains("://") {
            Self::Remote(raw.to_owned())
        } else {
            Self::Local(PathBuf::from(raw))
        }
    }

    /// 血缘事件中的输出数据集。远端路径以 `scheme://bucket` 为命名空间。
    pub fn dataset(&self) -> Dataset {
        match self {
            Self::Local(path) => Dataset::new("file", path.display().to_string()),
            Self::Remote(uri) => {
                let (scheme, rest) = uri.split_once("://").unwrap_or(("", uri.as_str()));
                let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
                Dataset::new(
                    format!("{scheme}://{bucket}"),
                    key.trim_end_matches('/').to_owned(),
                )
            }
        }
    }
}

/// 以 CSV（带表头）写出汇总；覆盖已有结果。远端位置返回 `Ok(None)`。
pub fn write_summary(
    location: &OutputLocation,
    rows: &[RoleSummary],
) -> Result<Option<PathBuf>, JobError> {
    let OutputLocation::Local(dir) = location else {
        return Ok(None);
    };
    let target = dir.join(SUMMARY_FILE);
    fs::create_dir_all(dir).map_err(|source| write_error(dir, source))?;
    fs::write(&target, render_csv(rows)).map_err(|source| write_error(&target, source))?;
    Ok(Some(target))
}

fn write_error(path: &Path, source: std::io::Error) -> JobError {
    JobError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn render_csv(rows: &[RoleSummary]) -> String {
    let mut out = String::from("role,count,avg_age\n");
    for row in rows {
        let _ = writeln!(out, "{},{},{}", csv_field(&row.role), row.count, row.avg_age);
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

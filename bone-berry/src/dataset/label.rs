use super::rules::{Conventions, Role};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 病例中的单个骨骼标签文件. 只记录元信息, 不加载体素.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BoneLabel {
    name: String,
    path: PathBuf,
}

impl BoneLabel {
    /// 创建骨骼标签记录.
    #[inline]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// 骨骼名 (去掉编号后缀).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 文件路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 列出 `dir` 下直接包含的所有骨骼标签文件, 按文件名升序排列.
pub fn list_labels(dir: &Path, conventions: &Conventions) -> io::Result<Vec<BoneLabel>> {
    let mut labels = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        // 跟随符号链接.
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            log::debug!("skipping non UTF-8 file name {path:?}");
            continue;
        };
        if conventions.matches(Role::LabelFile, file_name) {
            let label = BoneLabel::new(conventions.label_name(file_name), &path);
            labels.push((file_name.to_string(), label));
        }
    }
    labels.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(labels.into_iter().map(|(_, l)| l).collect())
}

/// `dir` 下是否直接包含骨骼标签文件.
pub fn has_labels(dir: &Path, conventions: &Conventions) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_label = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| conventions.matches(Role::LabelFile, n));
        if is_label {
            return Ok(true);
        }
    }
    Ok(false)
}

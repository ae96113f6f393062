//! 语料目录遍历: 受试者 -> 变换后标签目录 -> 病例.
//!
//! 遍历顺序即目录列举顺序, 不保证全局有序. 类别 id 的分配不依赖这里的顺序.

use super::label::{has_labels, list_labels, BoneLabel};
use super::rules::{Conventions, Role};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 语料根目录下的一个受试者.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subject {
    name: String,
    root: PathBuf,
}

impl Subject {
    /// 受试者名, 即目录名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 受试者目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// 一个病例 (分割实例) 目录及其标签文件列表.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaseFolder {
    name: String,
    path: PathBuf,
    subject: Subject,
    labels: Vec<BoneLabel>,
}

impl CaseFolder {
    /// 直接创建病例记录. `labels` 的顺序即合并时的写入顺序.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        subject: &Subject,
        labels: Vec<BoneLabel>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            subject: subject.clone(),
            labels,
        }
    }

    /// 病例名, 即目录名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 病例目录.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 所属受试者.
    #[inline]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// 标签文件, 按文件名升序.
    #[inline]
    pub fn labels(&self) -> &[BoneLabel] {
        &self.labels
    }

    /// 病例中出现的骨骼名集合.
    pub fn label_names(&self) -> BTreeSet<&str> {
        self.labels.iter().map(BoneLabel::name).collect()
    }
}

#[inline]
fn dir_name(path: &Path) -> Option<String> {
    path.file_name()?.to_str().map(str::to_string)
}

/// 语料遍历器.
#[derive(Clone, Copy, Debug)]
pub struct Discoverer<'c> {
    conventions: &'c Conventions,
}

impl<'c> Discoverer<'c> {
    /// 按 `conventions` 创建遍历器.
    #[inline]
    pub fn new(conventions: &'c Conventions) -> Self {
        Self { conventions }
    }

    /// 列出 `corpus_root` 下的所有直接子目录作为受试者.
    pub fn subjects(&self, corpus_root: &Path) -> io::Result<Vec<Subject>> {
        let mut ans = vec![];
        for entry in fs::read_dir(corpus_root)? {
            let root = entry?.path();
            // `Path::is_dir` 跟随符号链接.
            if !root.is_dir() {
                continue;
            }
            if let Some(name) = dir_name(&root) {
                ans.push(Subject { name, root });
            }
        }
        Ok(ans)
    }

    /// 递归查找受试者目录中所有的变换后标签目录.
    pub fn transformed_folders(&self, subject: &Subject) -> Vec<PathBuf> {
        WalkDir::new(subject.root())
            .min_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    log::debug!("walk error under {}: {err}", subject.root().display());
                    None
                }
            })
            .filter(|e| e.file_type().is_dir())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| self.conventions.matches(Role::TransformedLabels, n))
            })
            .map(|e| e.into_path())
            .collect()
    }

    /// 列出变换后标签目录中的病例目录.
    ///
    /// 优先返回名称符合病例约定的直接子目录; 若没有这样的子目录,
    /// 但该目录直接包含标签文件, 则把它自身当作唯一的病例.
    pub fn case_dirs(&self, transformed: &Path) -> io::Result<Vec<PathBuf>> {
        let mut ans = vec![];
        for entry in fs::read_dir(transformed)? {
            let path = entry?.path();
            let is_case = path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.conventions.matches(Role::Case, n));
            if is_case {
                ans.push(path);
            }
        }
        if ans.is_empty() && has_labels(transformed, self.conventions)? {
            ans.push(transformed.to_owned());
        }
        Ok(ans)
    }

    /// 列出受试者的所有病例. 无法读取的目录会被记录并跳过.
    pub fn cases(&self, subject: &Subject) -> Vec<CaseFolder> {
        let mut ans = vec![];
        for transformed in self.transformed_folders(subject) {
            let dirs = match self.case_dirs(&transformed) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("cannot list {}: {e}", transformed.display());
                    continue;
                }
            };
            for dir in dirs {
                let Some(name) = dir_name(&dir) else {
                    continue;
                };
                match list_labels(&dir, self.conventions) {
                    Ok(labels) => ans.push(CaseFolder::new(name, dir, subject, labels)),
                    Err(e) => log::warn!("cannot list labels in {}: {e}", dir.display()),
                }
            }
        }
        ans
    }

    /// 遍历整个语料, 返回所有病例.
    pub fn discover(&self, corpus_root: &Path) -> io::Result<Vec<CaseFolder>> {
        let mut ans = vec![];
        for subject in self.subjects(corpus_root)? {
            let cases = self.cases(&subject);
            log::debug!("subject {}: {} case(s)", subject.name(), cases.len());
            ans.extend(cases);
        }
        Ok(ans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};

    fn touch(p: &Path) {
        create_dir_all(p.parent().unwrap()).unwrap();
        File::create(p).unwrap();
    }

    #[test]
    fn test_discover_layouts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        // 受试者 A: 嵌套的变换目录 + 两个病例子目录.
        let t = root.join("A/SMIR.A/SMIR.A_Segs_Transformed");
        touch(&t.join("SMIR.A.Pelvis-Thighs_Segmentation/Hip_L_label2.nii.gz"));
        touch(&t.join("SMIR.A.Pelvis-Thighs_Segmentation/Femur_L_label1.nii.gz"));
        touch(&t.join("SMIR.A.Knee_Segmentation/Patella_L_label5.nii.gz"));
        create_dir_all(t.join("notes")).unwrap();

        // 受试者 B: 标签直接放在变换目录中.
        touch(&root.join("B/B_Segs_Transformed/Sacrum_label7.nii.gz"));

        // 受试者 C: 没有任何标签.
        create_dir_all(root.join("C/C_Segs_Transformed/empty")).unwrap();

        // 根目录下的文件不是受试者.
        touch(&root.join("README.txt"));

        let conv = Conventions::default();
        let d = Discoverer::new(&conv);
        assert_eq!(d.subjects(root).unwrap().len(), 3);

        let mut cases = d.discover(root).unwrap();
        cases.sort_by(|a, b| a.name().cmp(b.name()));
        let names: Vec<_> = cases.iter().map(CaseFolder::name).collect();
        assert_eq!(
            names,
            ["B_Segs_Transformed", "SMIR.A.Knee_Segmentation", "SMIR.A.Pelvis-Thighs_Segmentation"]
        );

        let pelvis = &cases[2];
        assert_eq!(pelvis.subject().name(), "A");
        // 标签按文件名排序.
        let labels: Vec<_> = pelvis.labels().iter().map(BoneLabel::name).collect();
        assert_eq!(labels, ["Femur_L", "Hip_L"]);
        assert_eq!(cases[0].label_names().into_iter().collect::<Vec<_>>(), ["Sacrum"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("store");
        let root = tmp.path().join("corpus");
        create_dir_all(&root).unwrap();

        // 受试者目录本身是链接.
        touch(&store.join("S01/S01_Segs_Transformed/Study_Segmentation/Sacrum_label7.nii.gz"));
        symlink(store.join("S01"), root.join("S01")).unwrap();

        // 变换目录与病例目录是链接, 标签文件也是链接.
        touch(&store.join("masks/femur.nii.gz"));
        touch(&store.join("cases/Knee_Segmentation/Patella_L_label5.nii.gz"));
        let t = root.join("S02/S02_Segs_Transformed");
        create_dir_all(t.join("Hip_Segmentation")).unwrap();
        symlink(
            store.join("masks/femur.nii.gz"),
            t.join("Hip_Segmentation/Femur_L_label1.nii.gz"),
        )
        .unwrap();
        symlink(store.join("cases/Knee_Segmentation"), t.join("Knee_Segmentation")).unwrap();

        let conv = Conventions::default();
        let d = Discoverer::new(&conv);
        assert_eq!(d.subjects(&root).unwrap().len(), 2);

        let mut cases = d.discover(&root).unwrap();
        cases.sort_by(|a, b| a.name().cmp(b.name()));
        let names: Vec<_> = cases.iter().map(CaseFolder::name).collect();
        assert_eq!(names, ["Hip_Segmentation", "Knee_Segmentation", "Study_Segmentation"]);
        let labels: Vec<_> = cases.iter().map(|c| c.labels().len()).collect();
        assert_eq!(labels, [1, 1, 1]);
    }
}

//! 由病例定位其原始扫描文件.

use super::discover::CaseFolder;
use super::rules::{Conventions, Role};
use crate::error::{CaseError, VolumeError};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 原始扫描定位器.
///
/// 病例名去掉病例标记后得到基本名, 候选目录名依次为:
///
/// 1. 基本名本身;
/// 2. 基本名在第一个分隔符之前的前缀.
///
/// 对每个候选名, 先查看受试者目录下的同名直接子目录, 再递归查找整个受试者目录.
/// 找到的第一个目录即原始扫描目录, 其中文件名升序最小的合格原始扫描文件被选中.
#[derive(Clone, Copy, Debug)]
pub struct RawResolver<'c> {
    conventions: &'c Conventions,
}

impl<'c> RawResolver<'c> {
    /// 按 `conventions` 创建定位器.
    #[inline]
    pub fn new(conventions: &'c Conventions) -> Self {
        Self { conventions }
    }

    /// 候选原始扫描目录名.
    pub fn candidates(&self, case_name: &str) -> Vec<String> {
        let base = self.conventions.case_base_name(case_name);
        let mut ans = vec![base.to_string()];
        if let Some((prefix, _)) = base.split_once(self.conventions.separator()) {
            if !prefix.is_empty() && prefix != base {
                ans.push(prefix.to_string());
            }
        }
        ans
    }

    /// 在受试者目录中查找病例的原始扫描目录.
    pub fn study_dir(&self, case: &CaseFolder) -> Result<PathBuf, CaseError> {
        let subject_root = case.subject().root();
        for cand in self.candidates(case.name()) {
            let direct = subject_root.join(&cand);
            if direct.is_dir() {
                return Ok(direct);
            }
            if let Some(found) = find_dir_named(subject_root, &cand) {
                return Ok(found);
            }
        }
        Err(CaseError::MissingRawVolume {
            case: case.name().to_string(),
        })
    }

    /// 在原始扫描目录中选出原始扫描文件. 多个候选时取文件名升序最小者.
    pub fn raw_file(&self, study_dir: &Path) -> Result<PathBuf, CaseError> {
        let load_err = |e: std::io::Error| CaseError::VolumeLoad {
            path: study_dir.to_owned(),
            source: VolumeError::Io(e),
        };

        let mut best: Option<(String, PathBuf)> = None;
        for entry in fs::read_dir(study_dir).map_err(load_err)? {
            let path = entry.map_err(load_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if !self.conventions.matches(Role::RawFile, &name) {
                continue;
            }
            if best.as_ref().map_or(true, |(b, _)| name < *b) {
                best = Some((name, path));
            }
        }
        best.map(|(_, p)| p).ok_or_else(|| CaseError::NoRawFile {
            dir: study_dir.to_owned(),
        })
    }

    /// 定位病例的原始扫描文件.
    pub fn resolve(&self, case: &CaseFolder) -> Result<PathBuf, CaseError> {
        let dir = self.study_dir(case)?;
        log::debug!("case {}: raw study directory {}", case.name(), dir.display());
        self.raw_file(&dir)
    }
}

/// 递归查找 `root` 下第一个名为 `name` 的目录. 同层按文件名排序以保证结果稳定.
fn find_dir_named(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_dir() && e.file_name().to_str() == Some(name))
        .map(|e| e.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::discover::Subject;
    use crate::dataset::Discoverer;
    use std::fs::{create_dir_all, File};

    fn touch(p: &Path) {
        create_dir_all(p.parent().unwrap()).unwrap();
        File::create(p).unwrap();
    }

    fn only_subject(root: &Path, conv: &Conventions) -> Subject {
        Discoverer::new(conv).subjects(root).unwrap().remove(0)
    }

    #[test]
    fn test_candidates() {
        let conv = Conventions::default();
        let r = RawResolver::new(&conv);
        assert_eq!(
            r.candidates("SMIR.Body.0042.Pelvis-Thighs_Segmentation"),
            ["SMIR.Body.0042.Pelvis-Thighs", "SMIR.Body.0042.Pelvis"]
        );
        assert_eq!(r.candidates("Study_Segmentation"), ["Study"]);
        assert_eq!(r.candidates("-lead_Segmentation"), ["-lead"]);
    }

    #[test]
    fn test_resolve_exact_then_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let s = tmp.path().join("S01");
        // 精确名称的目录位于深层.
        touch(&s.join("ct/raw/SMIR.S01.Pelvis-Thighs/b.nrrd"));
        touch(&s.join("ct/raw/SMIR.S01.Pelvis-Thighs/a.nrrd"));
        touch(&s.join("ct/raw/SMIR.S01.Pelvis-Thighs/a_Segmentation.seg.nrrd"));
        // 截断名称的目录是直接子目录, 但精确名称优先.
        touch(&s.join("SMIR.S01.Pelvis/c.nrrd"));

        let conv = Conventions::default();
        let subject = only_subject(tmp.path(), &conv);
        let case = CaseFolder::new(
            "SMIR.S01.Pelvis-Thighs_Segmentation",
            s.join("x"),
            &subject,
            vec![],
        );
        let raw = RawResolver::new(&conv).resolve(&case).unwrap();
        assert_eq!(raw, s.join("ct/raw/SMIR.S01.Pelvis-Thighs/a.nrrd"));

        let knee = CaseFolder::new("SMIR.S01.Pelvis-Knee_Segmentation", s.join("y"), &subject, vec![]);
        let raw = RawResolver::new(&conv).resolve(&knee).unwrap();
        assert_eq!(raw, s.join("SMIR.S01.Pelvis/c.nrrd"));
    }

    #[test]
    fn test_resolve_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let s = tmp.path().join("S02");
        touch(&s.join("Study/only_Segmentation.nrrd"));
        touch(&s.join("Study/notes.txt"));

        let conv = Conventions::default();
        let subject = only_subject(tmp.path(), &conv);
        let r = RawResolver::new(&conv);

        let no_file = CaseFolder::new("Study_Segmentation", s.join("a"), &subject, vec![]);
        assert!(matches!(r.resolve(&no_file), Err(CaseError::NoRawFile { .. })));

        let missing = CaseFolder::new("Other_Segmentation", s.join("b"), &subject, vec![]);
        assert!(matches!(
            r.resolve(&missing),
            Err(CaseError::MissingRawVolume { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_through_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("store");
        touch(&store.join("scan.nrrd"));
        touch(&store.join("Deep/z.nrrd"));

        let s = tmp.path().join("corpus/S03");
        create_dir_all(s.join("Study")).unwrap();
        create_dir_all(s.join("ct")).unwrap();
        symlink(store.join("scan.nrrd"), s.join("Study/a.nrrd")).unwrap();
        symlink(store.join("Deep"), s.join("ct/Deep")).unwrap();

        let conv = Conventions::default();
        let subject = only_subject(&tmp.path().join("corpus"), &conv);
        let r = RawResolver::new(&conv);

        let direct = CaseFolder::new("Study_Segmentation", s.join("a"), &subject, vec![]);
        assert_eq!(r.resolve(&direct).unwrap(), s.join("Study/a.nrrd"));

        let nested = CaseFolder::new("Deep_Segmentation", s.join("b"), &subject, vec![]);
        assert_eq!(r.resolve(&nested).unwrap(), s.join("ct/Deep/z.nrrd"));
    }
}

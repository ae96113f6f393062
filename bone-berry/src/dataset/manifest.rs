//! 输出数据集的目录结构与描述文件 `dataset.json`.

use super::vocab::Vocabulary;
use crate::consts::{
    BACKGROUND_ID, BACKGROUND_NAME, FILE_ENDING, IMAGES_TR, LABELS_TR, MANIFEST_NAME,
};
use crate::error::VerifyError;
use crate::ClassId;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 一个存活病例的输出文件对.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManifestEntry {
    /// 病例 id, 例如 `PELVISTHIGHS_001`.
    pub case_id: String,

    /// 图像文件.
    pub image: PathBuf,

    /// 标签文件.
    pub label: PathBuf,
}

/// 输出数据集目录:
///
/// ```text
/// <root>/
///   imagesTr/<CASE_ID>_0000.nii.gz
///   labelsTr/<CASE_ID>.nii.gz
///   dataset.json
/// ```
#[derive(Clone, Debug)]
pub struct DatasetLayout {
    root: PathBuf,
    file_ending: String,
}

impl DatasetLayout {
    /// 以默认文件格式创建.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_ending: FILE_ENDING.to_string(),
        }
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 文件格式后缀.
    #[inline]
    pub fn file_ending(&self) -> &str {
        &self.file_ending
    }

    /// 训练图像目录.
    #[inline]
    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_TR)
    }

    /// 训练标签目录.
    #[inline]
    pub fn labels_dir(&self) -> PathBuf {
        self.root.join(LABELS_TR)
    }

    /// 描述文件路径.
    #[inline]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    /// 单通道图像文件路径.
    pub fn image_file(&self, case_id: &str) -> PathBuf {
        self.images_dir()
            .join(format!("{case_id}_0000{}", self.file_ending))
    }

    /// 标签文件路径.
    pub fn label_file(&self, case_id: &str) -> PathBuf {
        self.labels_dir().join(format!("{case_id}{}", self.file_ending))
    }

    /// 病例 `case_id` 对应的输出文件对.
    pub fn entry(&self, case_id: &str) -> ManifestEntry {
        ManifestEntry {
            case_id: case_id.to_string(),
            image: self.image_file(case_id),
            label: self.label_file(case_id),
        }
    }

    /// 按需创建 `imagesTr/` 与 `labelsTr/`.
    pub fn create_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.images_dir())?;
        fs::create_dir_all(self.labels_dir())
    }

    /// 写出描述文件, 返回其路径.
    pub fn write_manifest(&self, manifest: &DatasetManifest) -> io::Result<PathBuf> {
        let path = self.manifest_path();
        let text = manifest.to_json_pretty().map_err(io::Error::from)?;
        fs::write(&path, text)?;
        Ok(path)
    }

    /// 校验数据集目录是否可以交给训练框架使用.
    ///
    /// 文件个数为 0 时报错; 图像数、标签数与 `numTraining` 不一致只记录在结果中.
    pub fn verify(&self) -> Result<VerifySummary, VerifyError> {
        let (images_dir, labels_dir, manifest) =
            (self.images_dir(), self.labels_dir(), self.manifest_path());
        for p in [&images_dir, &labels_dir, &manifest] {
            if !p.exists() {
                return Err(VerifyError::Missing(p.clone()));
            }
        }

        let declared: ManifestSummary = serde_json::from_str(&fs::read_to_string(&manifest)?)?;
        let images = count_with_ending(&images_dir, &declared.file_ending)?;
        let labels = count_with_ending(&labels_dir, &declared.file_ending)?;
        if images == 0 || labels == 0 {
            return Err(VerifyError::Empty { images, labels });
        }
        Ok(VerifySummary {
            images,
            labels,
            num_training: declared.num_training,
            classes: declared.labels.len(),
        })
    }
}

fn count_with_ending(dir: &Path, ending: &str) -> io::Result<usize> {
    let mut n = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|s| s.ends_with(ending))
        {
            n += 1;
        }
    }
    Ok(n)
}

/// 数据集校验结果.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VerifySummary {
    /// 图像文件数.
    pub images: usize,

    /// 标签文件数.
    pub labels: usize,

    /// 描述文件声明的训练病例数.
    pub num_training: usize,

    /// 描述文件中的类别数 (含背景).
    pub classes: usize,
}

impl VerifySummary {
    /// 三个计数是否一致.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.images == self.labels && self.labels == self.num_training
    }
}

/// `dataset.json` 中的类别表. 背景在最前, 其余按 id 升序.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassMap(Vec<(String, ClassId)>);

impl From<&Vocabulary> for ClassMap {
    fn from(vocab: &Vocabulary) -> Self {
        let mut ans = vec![(BACKGROUND_NAME.to_string(), BACKGROUND_ID)];
        ans.extend(vocab.iter().map(|(n, id)| (n.to_string(), id)));
        ans.sort_by_key(|(_, id)| *id);
        Self(ans)
    }
}

impl ClassMap {
    /// 按写出顺序遍历 `(名称, id)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ClassId)> {
        self.0.iter().map(|(n, id)| (n.as_str(), *id))
    }
}

impl Serialize for ClassMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, id) in &self.0 {
            map.serialize_entry(name, id)?;
        }
        map.end()
    }
}

/// 数据集描述, 即 `dataset.json` 的内容.
#[derive(Clone, Debug, Serialize)]
pub struct DatasetManifest {
    channel_names: BTreeMap<String, String>,
    labels: ClassMap,
    #[serde(rename = "numTraining")]
    num_training: usize,
    file_ending: String,
}

impl DatasetManifest {
    /// 单通道描述. `num_training` 为存活病例数.
    pub fn new(vocab: &Vocabulary, modality: &str, num_training: usize, file_ending: &str) -> Self {
        Self {
            channel_names: BTreeMap::from([("0".to_string(), modality.to_string())]),
            labels: ClassMap::from(vocab),
            num_training,
            file_ending: file_ending.to_string(),
        }
    }

    /// 类别表.
    #[inline]
    pub fn labels(&self) -> &ClassMap {
        &self.labels
    }

    /// 训练病例数.
    #[inline]
    pub fn num_training(&self) -> usize {
        self.num_training
    }

    /// 以 4 空格缩进序列化.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json 只输出合法 UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// 校验时从描述文件中读取的字段.
#[derive(Debug, Deserialize)]
struct ManifestSummary {
    labels: BTreeMap<String, ClassId>,
    #[serde(rename = "numTraining")]
    num_training: usize,
    file_ending: String,
}

//! 两阶段数据集组装流水线.
//!
//! 1. 普查 ([`Assembler::survey`]): 遍历整个语料, 只读取标签文件列表, 构建冻结的类别表;
//! 2. 组装 ([`Assembler::assemble`]): 逐个病例定位原始扫描、合并标签并写出, 最后写出描述文件.
//!
//! 第二阶段只以不可变引用使用第一阶段产生的类别表. 单个病例的失败不会影响其他病例.

use crate::consts::{
    DEFAULT_CASE_PREFIX, DEFAULT_DATASET_NAME, DEFAULT_MODALITY, PELVIS_THIGHS_CASE,
    PELVIS_THIGHS_LABELS,
};
use crate::data::{GridAttr, NiftiWrite, RawScan};
use crate::dataset::{
    CaseFolder, Conventions, DatasetLayout, DatasetManifest, Discoverer, LabelFilter,
    ManifestEntry, RawResolver, Vocabulary,
};
use crate::error::{AssembleError, CaseError, CaseWarning};
use crate::merge::LabelMerger;
use itertools::Itertools;
use std::path::{Path, PathBuf};

mod report;

pub use report::{CaseFailure, RunReport};

/// 组装配置.
#[derive(Clone, Debug)]
pub struct AssembleConfig {
    /// 语料根目录.
    pub corpus_root: PathBuf,

    /// 输出数据集目录, 即 `<output>/<数据集名>`.
    pub task_dir: PathBuf,

    /// 命名约定.
    pub conventions: Conventions,

    /// 标签过滤模式.
    pub filter: LabelFilter,

    /// 只处理名称包含该子串的病例. 其余病例被静默跳过.
    pub case_filter: Option<String>,

    /// 病例 id 前缀.
    pub case_prefix: String,

    /// 扫描模态.
    pub modality: String,
}

impl AssembleConfig {
    /// 不过滤任何标签和病例的默认配置.
    pub fn new(corpus_root: impl Into<PathBuf>, task_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_root: corpus_root.into(),
            task_dir: task_dir.into(),
            conventions: Conventions::default(),
            filter: LabelFilter::Unrestricted,
            case_filter: None,
            case_prefix: DEFAULT_CASE_PREFIX.to_string(),
            modality: DEFAULT_MODALITY.to_string(),
        }
    }

    /// 骨盆-大腿数据集预设: 8 个固定标签, 只处理骨盆-大腿病例,
    /// 输出到 `<output_root>/Dataset001_PelvisThighs`.
    pub fn pelvis_thighs(corpus_root: impl Into<PathBuf>, output_root: &Path) -> Self {
        Self::new(corpus_root, output_root.join(DEFAULT_DATASET_NAME))
            .with_filter(LabelFilter::AllowList(PELVIS_THIGHS_LABELS.clone()))
            .with_case_filter(Some(PELVIS_THIGHS_CASE.to_string()))
    }

    /// 替换标签过滤模式.
    #[inline]
    pub fn with_filter(mut self, filter: LabelFilter) -> Self {
        self.filter = filter;
        self
    }

    /// 替换病例名过滤子串.
    #[inline]
    pub fn with_case_filter(mut self, case_filter: Option<String>) -> Self {
        self.case_filter = case_filter;
        self
    }

    /// 替换命名约定.
    #[inline]
    pub fn with_conventions(mut self, conventions: Conventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// 替换病例 id 前缀.
    #[inline]
    pub fn with_case_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.case_prefix = prefix.into();
        self
    }

    /// 替换扫描模态.
    #[inline]
    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = modality.into();
        self
    }

    /// 病例是否通过病例名过滤.
    #[inline]
    pub fn selects(&self, case: &CaseFolder) -> bool {
        self.case_filter
            .as_deref()
            .map_or(true, |s| case.name().contains(s))
    }
}

/// 普查结果: 待处理病例与冻结的类别表.
#[derive(Clone, Debug)]
pub struct Survey {
    /// 通过病例名过滤的病例, 按发现顺序.
    pub cases: Vec<CaseFolder>,

    /// 全局类别表.
    pub vocabulary: Vocabulary,

    /// 被病例名过滤跳过的病例数.
    pub skipped: usize,
}

/// 数据集组装器.
#[derive(Debug)]
pub struct Assembler {
    config: AssembleConfig,
    layout: DatasetLayout,
}

impl Assembler {
    /// 按配置创建组装器.
    pub fn new(config: AssembleConfig) -> Self {
        let layout = DatasetLayout::new(&config.task_dir);
        Self { config, layout }
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &AssembleConfig {
        &self.config
    }

    /// 输出目录结构.
    #[inline]
    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// 第一阶段: 遍历语料并构建类别表. 不读取任何体素数据.
    pub fn survey(&self) -> Result<Survey, AssembleError> {
        let root = &self.config.corpus_root;
        log::info!("surveying corpus {}", root.display());
        let all = Discoverer::new(&self.config.conventions)
            .discover(root)
            .map_err(|source| AssembleError::CorpusUnreadable {
                path: root.clone(),
                source,
            })?;

        let total = all.len();
        let cases: Vec<CaseFolder> = all.into_iter().filter(|c| self.config.selects(c)).collect();
        let skipped = total - cases.len();
        let vocabulary = Vocabulary::scan(&cases, &self.config.filter);
        log::info!(
            "found {} case(s) ({skipped} skipped by name), {} class(es): {}",
            cases.len(),
            vocabulary.len(),
            vocabulary.iter().map(|(n, id)| format!("{n}={id}")).join(", ")
        );
        Ok(Survey {
            cases,
            vocabulary,
            skipped,
        })
    }

    /// 第二阶段: 逐个病例合并并写出, 最后写出描述文件.
    ///
    /// 没有任何存活病例时返回 [`AssembleError::NoSurvivingCases`], 且不写出描述文件.
    pub fn assemble(&self, survey: &Survey) -> Result<RunReport, AssembleError> {
        self.layout
            .create_dirs()
            .map_err(|source| AssembleError::OutputDir {
                path: self.layout.root().to_owned(),
                source,
            })?;

        let resolver = RawResolver::new(&self.config.conventions);
        let merger = LabelMerger::new(&survey.vocabulary);
        let mut report = RunReport::new(survey.vocabulary.clone(), survey.skipped);

        for case in &survey.cases {
            let case_id = format!("{}_{:03}", self.config.case_prefix, report.entries.len() + 1);
            match self.process_case(case, &case_id, &resolver, &merger, &mut report.warnings) {
                Ok(entry) => {
                    log::info!("saved {} as {case_id}", case.name());
                    report.entries.push(entry);
                }
                Err(error) => {
                    log::warn!(
                        "skipping case {} of {}: {error}",
                        case.name(),
                        case.subject().name()
                    );
                    report.failures.push(CaseFailure {
                        subject: case.subject().name().to_string(),
                        case: case.name().to_string(),
                        error,
                    });
                }
            }
        }

        if report.entries.is_empty() {
            log::error!("no training cases created");
            return Err(AssembleError::NoSurvivingCases {
                report: Box::new(report),
            });
        }

        let manifest = DatasetManifest::new(
            &survey.vocabulary,
            &self.config.modality,
            report.entries.len(),
            self.layout.file_ending(),
        );
        let path = self
            .layout
            .write_manifest(&manifest)
            .map_err(|source| AssembleError::Manifest {
                path: self.layout.manifest_path(),
                source,
            })?;
        log::info!(
            "wrote {} with {} training case(s)",
            path.display(),
            manifest.num_training()
        );
        report.manifest_path = Some(path);
        Ok(report)
    }

    /// 依次执行两个阶段.
    pub fn run(&self) -> Result<RunReport, AssembleError> {
        let survey = self.survey()?;
        self.assemble(&survey)
    }

    fn process_case(
        &self,
        case: &CaseFolder,
        case_id: &str,
        resolver: &RawResolver,
        merger: &LabelMerger,
        warnings: &mut Vec<CaseWarning>,
    ) -> Result<ManifestEntry, CaseError> {
        if let Some(shortfall) = self.config.filter.shortfall(&case.label_names()) {
            return Err(CaseError::NoLabelsForCase(shortfall));
        }

        let raw_path = resolver.resolve(case)?;
        let scan = RawScan::open(&raw_path).map_err(|source| CaseError::VolumeLoad {
            path: raw_path.clone(),
            source,
        })?;
        if !scan.affine_issues().is_empty() {
            let w = CaseWarning::AffineCompute {
                path: raw_path.clone(),
                detail: scan.affine_issues().join("; "),
            };
            log::warn!("{w}");
            warnings.push(w);
        }

        let outcome = merger.merge(case.labels(), scan.grid())?;
        log::debug!(
            "case {}: merged {} label(s), {} resampled",
            case.name(),
            outcome.used.len(),
            outcome.resampled
        );

        let entry = self.layout.entry(case_id);
        scan.save(&entry.image).map_err(|source| CaseError::Write {
            path: entry.image.clone(),
            source,
        })?;
        outcome
            .volume
            .save(&entry.label)
            .map_err(|source| CaseError::Write {
                path: entry.label.clone(),
                source,
            })?;
        Ok(entry)
    }
}

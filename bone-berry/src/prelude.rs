//! 🦴欢迎光临🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{ClassId, Idx3d};

pub use crate::data::{
    Affine, BoneMask, ClassVolume, ElemWidth, GridAttr, MergedVolume, NiftiWrite, NrrdVolume,
    RawScan, ReferenceGrid,
};

pub use crate::consts::{BACKGROUND_ID, FILE_ENDING, PELVIS_THIGHS_LABELS};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{
    self, BoneLabel, CaseFolder, Conventions, DatasetLayout, LabelFilter, Vocabulary,
};

pub use crate::error::{AssembleError, CaseError, CaseWarning, VerifyError, VolumeError};
pub use crate::merge::{LabelMerger, MaskSource};
pub use crate::pipeline::{AssembleConfig, Assembler, RunReport, Survey};

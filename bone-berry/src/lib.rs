#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 将多受试者、多文件的骨骼 CT 分割语料组装成可直接训练的数据集:
//! 原始扫描与全局类别一致的多类别标签一一配对, 并附带描述类别表的 `dataset.json`.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 所有三维数组均按 nifti 原生的 `(x, y, z)` 顺序存储, NRRD 的 `sizes` 顺序与之相同.
//! 2. 库内的错误都通过 `Result` 返回; 只有违反文档中标明的前置条件时程序才会 panic.
//!
//! # 流程
//!
//! ### 语料遍历 ✅
//!
//! 受试者 -> 变换后标签目录 -> 病例目录. 所有名称判断都由一张声明式约定表完成.
//!
//! 实现位于 `bone-berry/src/dataset/{rules, discover}.rs`.
//!
//! ### 原始扫描定位 ✅
//!
//! 由病例名推导原始扫描目录名 (精确名, 以及在第一个分隔符处截断的名字),
//! 先查直接子目录, 再递归查找.
//!
//! 实现位于 `bone-berry/src/dataset/resolve.rs`.
//!
//! ### 全局类别表 ✅
//!
//! 在任何合并开始之前完整扫描一遍语料, 按骨骼名字典序分配 `1..N`, 0 为背景.
//! 支持允许列表过滤; 过滤模式下病例的标签名集合必须与允许列表完全一致.
//!
//! 实现位于 `bone-berry/src/dataset/vocab.rs`.
//!
//! ### 标签合并与空间对齐 ✅
//!
//! 标签形状与参考网格不一致时按最近邻重采样, 再裁剪或补零到精确形状.
//! 重叠体素以最后绘制者为准.
//!
//! 实现位于 `bone-berry/src/merge` 与 `bone-berry/src/data/resample.rs`.
//!
//! ### 输出与校验 ✅
//!
//! `imagesTr/`, `labelsTr/` 与 `dataset.json`; 以及对已有数据集目录的完整性校验.
//!
//! 实现位于 `bone-berry/src/dataset/manifest.rs` 与 `bone-berry/src/pipeline`.
//!
//! ### NRRD 读取 ✅
//!
//! raw / gzip / ascii 编码, 任意整数与浮点类型, 大小端. 空间信息转换为仿射矩阵.
//!
//! 实现位于 `bone-berry/src/data/nrrd.rs`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 类别 id. 0 为背景.
pub type ClassId = u32;

/// 体数据结构与读写.
pub mod data;

pub mod consts;

pub mod dataset;

pub mod error;

pub mod merge;

pub mod pipeline;

pub mod prelude;

pub use data::{Affine, BoneMask, GridAttr, MergedVolume, NiftiWrite, RawScan, ReferenceGrid};
pub use error::{AssembleError, CaseError, CaseWarning, LabelShortfall, VerifyError, VolumeError};
pub use pipeline::{AssembleConfig, Assembler, RunReport};

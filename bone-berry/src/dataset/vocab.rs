//! 全局类别表.

use super::discover::CaseFolder;
use crate::consts::BACKGROUND_ID;
use crate::data::ElemWidth;
use crate::error::LabelShortfall;
use crate::ClassId;
use std::collections::{BTreeMap, BTreeSet};

/// 标签过滤模式.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LabelFilter {
    /// 收集语料中出现的所有骨骼名.
    #[default]
    Unrestricted,

    /// 只收集允许列表中的骨骼名. 病例的标签名集合必须与允许列表完全相同才会被合并.
    AllowList(BTreeSet<String>),
}

impl LabelFilter {
    /// 由任意名称集合构建允许列表.
    pub fn allow<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowList(names.into_iter().map(Into::into).collect())
    }

    /// 骨骼名 `name` 能否进入类别表.
    #[inline]
    pub fn accepts_name(&self, name: &str) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::AllowList(set) => set.contains(name),
        }
    }

    /// 检查病例的标签名集合是否满足过滤要求. 满足时返回 `None`.
    ///
    /// 这里只检查允许列表的精确匹配; 与类别表的交集是否为空由合并阶段判断.
    pub fn shortfall(&self, case_names: &BTreeSet<&str>) -> Option<LabelShortfall> {
        let Self::AllowList(set) = self else {
            return None;
        };
        let missing: Vec<String> = set
            .iter()
            .filter(|n| !case_names.contains(n.as_str()))
            .cloned()
            .collect();
        let extra: Vec<String> = case_names
            .iter()
            .filter(|n| !set.contains(**n))
            .map(|n| n.to_string())
            .collect();
        if missing.is_empty() && extra.is_empty() {
            None
        } else {
            Some(LabelShortfall::NotExactAllowList { missing, extra })
        }
    }
}

/// 全局类别表: 骨骼名到类别 id 的映射.
///
/// id 从 1 开始按骨骼名的字典序连续分配, 0 保留给背景. 类别表一经构建即不再改变,
/// 在合并阶段以不可变引用传入.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Vocabulary {
    ids: BTreeMap<String, ClassId>,
}

impl Vocabulary {
    /// 由名称集合构建. 重复名称只计一次.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let ids = names
            .into_iter()
            .zip(BACKGROUND_ID + 1..)
            .collect::<BTreeMap<_, _>>();
        Self { ids }
    }

    /// 扫描所有病例的标签文件列表 (不读取体素) 构建类别表.
    pub fn scan<'a, I>(cases: I, filter: &LabelFilter) -> Self
    where
        I: IntoIterator<Item = &'a CaseFolder>,
    {
        Self::from_names(
            cases
                .into_iter()
                .flat_map(|c| c.labels().iter().map(|l| l.name()))
                .filter(|n| filter.accepts_name(n)),
        )
    }

    /// 查询骨骼名的类别 id.
    #[inline]
    pub fn id(&self, name: &str) -> Option<ClassId> {
        self.ids.get(name).copied()
    }

    /// 骨骼名是否在类别表中.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// 类别个数 (不含背景).
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// 类别表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 最大类别 id. 空表时为背景 id.
    #[inline]
    pub fn max_id(&self) -> ClassId {
        self.ids.values().copied().max().unwrap_or(BACKGROUND_ID)
    }

    /// 按 id 升序遍历 `(骨骼名, id)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ClassId)> {
        // 名称字典序与 id 顺序一致.
        self.ids.iter().map(|(n, id)| (n.as_str(), *id))
    }

    /// 容纳所有类别 id 的最窄整数类型.
    #[inline]
    pub fn elem_width(&self) -> ElemWidth {
        ElemWidth::for_max_id(self.max_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Conventions, Discoverer};
    use std::fs::{create_dir_all, File};
    use std::path::Path;

    #[test]
    fn test_lexicographic_ids() {
        let v = Vocabulary::from_names(["Sacrum", "Femur_L", "Hip_L", "Femur_L"]);
        let pairs: Vec<_> = v.iter().collect();
        assert_eq!(pairs, [("Femur_L", 1), ("Hip_L", 2), ("Sacrum", 3)]);
        assert_eq!(v.max_id(), 3);
        assert_eq!(v.id("Background"), None);
        assert_eq!(v.elem_width(), ElemWidth::U8);
        assert_eq!(Vocabulary::default().max_id(), BACKGROUND_ID);
    }

    #[test]
    fn test_wide_vocabulary() {
        let v = Vocabulary::from_names((0..300).map(|i| format!("bone{i:03}")));
        assert_eq!(v.max_id(), 300);
        assert_eq!(v.id("bone299"), Some(300));
        assert_eq!(v.elem_width(), ElemWidth::U16);
    }

    #[test]
    fn test_shortfall() {
        let f = LabelFilter::allow(["Femur_L", "Hip_L"]);
        assert_eq!(f.shortfall(&["Hip_L", "Femur_L"].into()), None);
        assert_eq!(
            f.shortfall(&["Femur_L", "Hip_L", "Patella_L"].into()),
            Some(LabelShortfall::NotExactAllowList {
                missing: vec![],
                extra: vec!["Patella_L".to_string()],
            })
        );
        assert_eq!(
            f.shortfall(&["Femur_L"].into()),
            Some(LabelShortfall::NotExactAllowList {
                missing: vec!["Hip_L".to_string()],
                extra: vec![],
            })
        );
        assert_eq!(LabelFilter::Unrestricted.shortfall(&BTreeSet::new()), None);
    }

    fn touch(p: &Path) {
        create_dir_all(p.parent().unwrap()).unwrap();
        File::create(p).unwrap();
    }

    #[test]
    fn test_scan_is_order_independent() {
        let tmp = tempfile::tempdir().unwrap();
        let t = tmp.path().join("S/S_Segs_Transformed");
        touch(&t.join("a_Segmentation/Sacrum_label3.nii.gz"));
        touch(&t.join("a_Segmentation/Hip_R_label2.nii.gz"));
        touch(&t.join("b_Segmentation/Femur_L_label1.nii.gz"));
        touch(&t.join("b_Segmentation/Rib_1_label9.nii.gz"));

        let conv = Conventions::default();
        let mut cases = Discoverer::new(&conv).discover(tmp.path()).unwrap();
        let forward = Vocabulary::scan(&cases, &LabelFilter::Unrestricted);
        cases.reverse();
        let backward = Vocabulary::scan(&cases, &LabelFilter::Unrestricted);
        assert_eq!(forward, backward);
        assert_eq!(forward.id("Femur_L"), Some(1));
        assert_eq!(forward.id("Sacrum"), Some(4));

        let filtered = Vocabulary::scan(&cases, &LabelFilter::allow(["Sacrum", "Femur_L", "Tibia"]));
        assert_eq!(filtered.iter().collect::<Vec<_>>(), [("Femur_L", 1), ("Sacrum", 2)]);
        assert!(!filtered.contains("Tibia"));
    }
}

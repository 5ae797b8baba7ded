//! Cause-of-death vocabulary for the SIM micro-data.
//!
//! Deaths are bucketed by the ICD chapter label printed in `capcid_cau`, and
//! flagged as amenable to primary care when the `cid_cau` code belongs to the
//! Alfradique et al. (2009) list.

use once_cell::sync::Lazy;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CauseCategory {
    Perinatal,
    Congenital,
    IllDefined,
    Infectious,
    Respiratory,
    Endocrine,
    External,
    Nervous,
    Circulatory,
    Blood,
    Digestive,
    SensoryMusculoskeletalGenitourinary,
    Neoplasm,
}

impl CauseCategory {
    pub const ALL: [CauseCategory; 13] = [
        CauseCategory::Perinatal,
        CauseCategory::Congenital,
        CauseCategory::IllDefined,
        CauseCategory::Infectious,
        CauseCategory::Respiratory,
        CauseCategory::Endocrine,
        CauseCategory::External,
        CauseCategory::Nervous,
        CauseCategory::Circulatory,
        CauseCategory::Blood,
        CauseCategory::Digestive,
        CauseCategory::SensoryMusculoskeletalGenitourinary,
        CauseCategory::Neoplasm,
    ];

    /// Chapter label exactly as it appears in the micro-data.
    pub fn chapter_label(self) -> &'static str {
        match self {
            CauseCategory::Perinatal => "Perinatal period conditions",
            CauseCategory::Congenital => "Congenital malformations",
            CauseCategory::IllDefined => "Not well defined",
            CauseCategory::Infectious => "Infectious and parasitic diseases",
            CauseCategory::Respiratory => "Respiratory system diseases",
            CauseCategory::Endocrine => "Endocrine/nutrit./metabolic diseases",
            CauseCategory::External => "External causes",
            CauseCategory::Nervous => "Nervous system diseases",
            CauseCategory::Circulatory => "Circulatory system diseases",
            CauseCategory::Blood => "Blood diseases",
            CauseCategory::Digestive => "Digestive system diseases",
            CauseCategory::SensoryMusculoskeletalGenitourinary => {
                "Eye/ear/skin/musculosk./genitourinary system"
            }
            CauseCategory::Neoplasm => "Neoplasms",
        }
    }

    /// Indicator column counting deaths of this category.
    pub fn column(self) -> &'static str {
        match self {
            CauseCategory::Perinatal => "im_perinat",
            CauseCategory::Congenital => "im_cong",
            CauseCategory::IllDefined => "im_illdef",
            CauseCategory::Infectious => "im_infec",
            CauseCategory::Respiratory => "im_resp",
            CauseCategory::Endocrine => "im_endoc",
            CauseCategory::External => "im_exter",
            CauseCategory::Nervous => "im_nerv",
            CauseCategory::Circulatory => "im_circ",
            CauseCategory::Blood => "im_blood",
            CauseCategory::Digestive => "im_digest",
            CauseCategory::SensoryMusculoskeletalGenitourinary => "im_eye",
            CauseCategory::Neoplasm => "im_neop",
        }
    }

    /// Short name used in summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            CauseCategory::Perinatal => "Perinatal",
            CauseCategory::Congenital => "Congenital",
            CauseCategory::IllDefined => "Ill-defined",
            CauseCategory::Infectious => "Infectious",
            CauseCategory::Respiratory => "Respiratory",
            CauseCategory::Endocrine => "Endocrine",
            CauseCategory::External => "External",
            CauseCategory::Nervous => "Nervous",
            CauseCategory::Circulatory => "Circulatory",
            CauseCategory::Blood => "Blood",
            CauseCategory::Digestive => "Digestive",
            CauseCategory::SensoryMusculoskeletalGenitourinary => "Sensory/musculoskeletal/genitourinary",
            CauseCategory::Neoplasm => "Neoplasms",
        }
    }

    /// Exact match on the chapter label; anything else is uncategorized.
    pub fn from_chapter(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.chapter_label() == label)
    }
}

/// Alfradique et al. (2009), "Internações por condições sensíveis à atenção primária".
static AMENABLE_ICD: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "A361", "A362", "A369", "A370", "A371", "A379", "A170", "B162", "B169", "G000", "B268",
        "B269", "B069", "B052", "B059", "A33", "A35", "A190", "A192", "A198", "A199", "I00",
        "I010", "I011", "I018", "I019", "A513", "A519", "A522", "A527", "A530", "A539", "A151",
        "A153", "A162", "A86", "A000", "A001", "A009", "A010", "A011", "A020", "A021", "A022",
        "A028", "A029", "A030", "A039", "A040", "A041", "A042", "A043", "A044", "A045", "A046",
        "A047", "A048", "A049", "A050", "A052", "A059", "A060", "A061", "A066", "A069", "A070",
        "A072", "A073", "A078", "A079", "A080", "A081", "A082", "A083", "A084", "A085", "A09",
        "D500", "D508", "D509", "E40", "E41", "E42", "E43", "E440", "E441", "E45", "E46", "E512",
        "E519", "E52", "E538", "E550", "E560", "E561", "E569", "E616", "E619", "E630", "E631",
        "E638", "E639", "E640", "E641", "E649", "J029", "J039", "J060", "J068", "J069", "J00",
        "H660", "H662", "H663", "H664", "H669", "J310", "J010", "J019", "J158", "J159", "J181",
        "J14", "J13", "J153", "J154", "J450", "J451", "J459", "J46", "J200", "J201", "J203",
        "J204", "J205", "J207", "J208", "J209", "J210", "J218", "J219", "J40", "J410", "J411",
        "J42", "J438", "J439", "J440", "J441", "J448", "J449", "J47", "I110", "I119", "I10",
        "I209", "I248", "I249", "I500", "I501", "I509", "J81", "I633", "I638", "I639", "I64",
        "I670", "I671", "I672", "I674", "I677", "I678", "I679", "I690", "I691", "I692", "I694",
        "I698", "G459", "E100", "E101", "E140", "E141", "E109", "E119", "E149", "E142", "E145",
        "E156", "E147", "E148", "G400", "G401", "G402", "G403", "G404", "G405", "G406", "G407",
        "G408", "G409", "G410", "G411", "G418", "G419", "N10", "N111", "N118", "N119", "N12",
        "N390", "N394", "N398", "N399", "L010", "L011", "L020", "L021", "L022", "L023", "L024",
        "L028", "L029", "L030", "L031", "L032", "L033", "L038", "L039", "L040", "L048", "L049",
        "N709", "N735", "N738", "N739", "N760", "N764", "K251", "K254", "K255", "K256", "K259",
        "K261", "K265", "K269", "K274", "K921", "K922", "A500", "A501", "A502", "A504", "A505",
        "A509", "A350",
    ]
    .into_iter()
    .collect()
});

/// Whether a diagnosis code is in the amenable-to-primary-care list (exact match).
pub fn is_amenable(icd: &str) -> bool {
    AMENABLE_ICD.contains(icd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_lookup_is_exact() {
        assert_eq!(
            CauseCategory::from_chapter("Perinatal period conditions"),
            Some(CauseCategory::Perinatal)
        );
        assert_eq!(
            CauseCategory::from_chapter("Eye/ear/skin/musculosk./genitourinary system"),
            Some(CauseCategory::SensoryMusculoskeletalGenitourinary)
        );
        assert_eq!(CauseCategory::from_chapter("perinatal period conditions"), None);
        assert_eq!(CauseCategory::from_chapter("Pregnancy childbirth and puerperium"), None);
    }

    #[test]
    fn columns_are_unique() {
        let cols: HashSet<_> = CauseCategory::ALL.iter().map(|c| c.column()).collect();
        assert_eq!(cols.len(), 13);
    }

    #[test]
    fn amenable_codes() {
        assert!(is_amenable("A09"));
        assert!(!is_amenable("J189"));
        assert!(is_amenable("J181"));
        assert!(!is_amenable("P07"));
        assert!(!is_amenable("a09"));
        assert!(AMENABLE_ICD.len() > 250);
    }
}

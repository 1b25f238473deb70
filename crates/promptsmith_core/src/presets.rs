//! crates/promptsmith_core/src/presets.rs
//!
//! The fixed catalog of input templates. The last four are Pro-only.

use crate::domain::{Preset, PresetId};

const CATALOG: &[Preset] = &[
    Preset {
        id: PresetId::General,
        label: "General",
        description: "Turn any rough idea into a clear, reusable prompt.",
        template: "I want help with: ",
        pro_only: false,
    },
    Preset {
        id: PresetId::Writing,
        label: "Writing",
        description: "Drafting, rewriting, and editing text.",
        template: "Help me write a piece about ",
        pro_only: false,
    },
    Preset {
        id: PresetId::Coding,
        label: "Coding",
        description: "Implementing, debugging, or reviewing code.",
        template: "I need code that ",
        pro_only: false,
    },
    Preset {
        id: PresetId::Study,
        label: "Study",
        description: "Explaining a topic and quizzing me on it.",
        template: "Teach me about ",
        pro_only: false,
    },
    Preset {
        id: PresetId::Marketing,
        label: "Marketing",
        description: "Campaign copy, positioning, and audience messaging.",
        template: "Create marketing copy for ",
        pro_only: true,
    },
    Preset {
        id: PresetId::BusinessPlan,
        label: "Business plan",
        description: "Structured plans with goals, risks, and milestones.",
        template: "Build a business plan for ",
        pro_only: true,
    },
    Preset {
        id: PresetId::Research,
        label: "Research",
        description: "Literature-style briefs with sources to check.",
        template: "Research and summarize ",
        pro_only: true,
    },
    Preset {
        id: PresetId::Career,
        label: "Career",
        description: "Resumes, interview prep, and career moves.",
        template: "Help me prepare for ",
        pro_only: true,
    },
];

pub fn catalog() -> &'static [Preset] {
    CATALOG
}

pub fn find(id: PresetId) -> Option<&'static Preset> {
    CATALOG.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlanTier;

    #[test]
    fn every_id_has_exactly_one_preset() {
        let ids = [
            PresetId::General,
            PresetId::Writing,
            PresetId::Coding,
            PresetId::Study,
            PresetId::Marketing,
            PresetId::BusinessPlan,
            PresetId::Research,
            PresetId::Career,
        ];
        for id in ids {
            assert_eq!(catalog().iter().filter(|p| p.id == id).count(), 1, "{:?}", id);
        }
    }

    #[test]
    fn free_plan_sees_only_ungated_presets() {
        let free: Vec<_> = catalog()
            .iter()
            .filter(|p| p.is_available(PlanTier::Free))
            .collect();
        assert_eq!(free.len(), 4);
        assert!(free.iter().all(|p| !p.pro_only));
        assert!(catalog().iter().all(|p| p.is_available(PlanTier::Pro)));
    }

    #[test]
    fn gated_preset_is_unavailable_on_free() {
        let research = find(PresetId::Research).unwrap();
        assert!(!research.is_available(PlanTier::Free));
        assert!(research.is_available(PlanTier::Pro));
    }
}

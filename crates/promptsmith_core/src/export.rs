//! crates/promptsmith_core/src/export.rs
//!
//! Bulk copy and download renderings of the history.

use crate::domain::HistoryEntry;

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// One text block per entry, in the order given.
pub fn export_text(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn render_block(entry: &HistoryEntry) -> String {
    let mut lines = vec![format!(
        "Date: {}",
        entry.created_at.format("%Y-%m-%d %H:%M UTC")
    )];
    if let Some(preset) = entry.preset_id {
        lines.push(format!("Preset: {}", preset.as_str()));
    }
    if entry.saved {
        lines.push("Saved: yes".to_string());
    }
    lines.push(format!("Input: {}", entry.input_text));
    lines.push(String::new());
    lines.push(entry.output_text.clone());
    if !entry.follow_ups.is_empty() {
        lines.push(String::new());
        lines.push("Follow-up questions:".to_string());
        lines.extend(entry.follow_ups.iter().map(|q| format!("- {}", q)));
    }
    lines.join("\n")
}

/// The full history array, pretty-printed with the persisted field names.
pub fn export_json(entries: &[HistoryEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NormalizedResult, PresetId};
    use chrono::{TimeZone, Utc};

    fn sample() -> HistoryEntry {
        let mut entry = HistoryEntry::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            Some(PresetId::BusinessPlan),
            "open a bakery".to_string(),
            &NormalizedResult {
                prompt_text: "Role: Consultant".to_string(),
                follow_up_questions: vec!["Which city?".to_string()],
            },
        );
        entry.saved = true;
        entry
    }

    #[test]
    fn text_block_lists_every_part() {
        let text = export_text(&[sample()]);
        assert_eq!(
            text,
            "Date: 2024-05-01 09:30 UTC\nPreset: business-plan\nSaved: yes\nInput: open a bakery\n\n\
             Role: Consultant\n\nFollow-up questions:\n- Which city?"
        );
    }

    #[test]
    fn blocks_are_separated_by_a_rule() {
        let text = export_text(&[sample(), sample()]);
        assert_eq!(text.matches("\n\n---\n\n").count(), 1);
        assert_eq!(export_text(&[]), "");
    }

    #[test]
    fn json_export_uses_persisted_field_names() {
        let json = export_json(&[sample()]).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"followUps\""));
        assert!(json.contains("\"presetId\": \"business-plan\""));
        assert!(json.starts_with('['));
    }
}

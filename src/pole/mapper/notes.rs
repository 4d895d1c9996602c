use std::sync::LazyLock;

use regex::Regex;

use crate::pole::mapper::model::GuyAttachment;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ANCHOR\s+(\d+)'(?:\s*(\d+)")?\s+([NSEW]{1,2})\b"#).expect("valid regex")
});

static SIZED_GUY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:GUY\s+)?(\d+/\d+"\s*EHS|[\d.]+"\s*EHS)\s*(?:GUY\s+)?(\d+)'(?:\s*(\d+)")?\s+([NSEW]{1,2})\b"#,
    )
    .expect("valid regex")
});

static GENERIC_GUY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d+)'(?:\s*(\d+)")?\s+([NSEW]{1,2})\b"#).expect("valid regex")
});

/// Extracts guy wires from make-ready notes.
///
/// Recognized forms, tried in this order:
/// `ANCHOR 10' W`, `GUY 3/8" EHS 20' S` or `5/16" EHS GUY 15' N`, and a bare
/// `15'6" NW`. A lead/direction pair is reported once, with the size of the
/// first form that named it.
pub fn extract_guys(note: &str) -> Vec<GuyAttachment> {
    let note = note.to_uppercase();
    let mut guys: Vec<GuyAttachment> = Vec::new();

    for caps in ANCHOR_RE.captures_iter(&note) {
        let lead = lead_text(&caps[1], caps.get(2).map(|m| m.as_str()));
        push_unique(&mut guys, lead, &caps[3], None);
    }

    for caps in SIZED_GUY_RE.captures_iter(&note) {
        let lead = lead_text(&caps[2], caps.get(3).map(|m| m.as_str()));
        let size = caps[1].trim().to_string();
        push_unique(&mut guys, lead, &caps[4], Some(size));
    }

    for caps in GENERIC_GUY_RE.captures_iter(&note) {
        let lead = lead_text(&caps[1], caps.get(2).map(|m| m.as_str()));
        push_unique(&mut guys, lead, &caps[3], None);
    }

    guys
}

fn lead_text(feet: &str, inches: Option<&str>) -> String {
    match inches {
        Some(inches) => format!("{feet}'{inches}\""),
        None => format!("{feet}'"),
    }
}

fn push_unique(guys: &mut Vec<GuyAttachment>, lead: String, direction: &str, size: Option<String>) {
    let direction = direction.trim();
    if guys
        .iter()
        .any(|guy| guy.lead == lead && guy.direction == direction)
    {
        return;
    }
    guys.push(GuyAttachment {
        lead,
        direction: direction.to_string(),
        size,
    });
}

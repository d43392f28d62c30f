//! Class names embedded by Ultralytics in exported ONNX models.

use inference_common::coco_classes;

/// Parses the `names` metadata entry, a Python dict literal such as
/// `{0: 'person', 1: 'bicycle'}`. Indices missing from the dict get a
/// `class<N>` placeholder. Returns `None` if nothing could be parsed.
pub fn parse_names(raw: &str) -> Option<Vec<String>> {
    let mut entries: Vec<(usize, String)> = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            chars.next();
            continue;
        }
        let mut digits = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            digits.push(d);
            chars.next();
        }
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ':') {
            chars.next();
        }
        let Some(quote) = chars.next_if(|c| *c == '\'' || *c == '"') else {
            continue;
        };
        let mut name = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        name.push(escaped);
                    }
                }
                c if c == quote => break,
                c => name.push(c),
            }
        }
        if let Ok(idx) = digits.parse() {
            entries.push((idx, name));
        }
    }

    let len = entries.iter().map(|(idx, _)| idx + 1).max()?;
    let mut names: Vec<String> = (0..len).map(|i| format!("class{i}")).collect();
    for (idx, name) in entries {
        names[idx] = name;
    }
    Some(names)
}

/// The COCO names as owned strings.
pub fn coco_names() -> Vec<String> {
    coco_classes::NAMES.iter().map(|s| s.to_string()).collect()
}

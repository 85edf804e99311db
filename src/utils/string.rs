//! Text helpers shared by logging and the CLI

/// Single-line preview of free text for logs and listings.
///
/// Collapses runs of whitespace (including newlines) to one space and cuts on
/// a character boundary, appending an ellipsis when anything was dropped.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let kept: String = collapsed.chars().take(max_chars).collect();
        format!("{}…", kept.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_untouched() {
        assert_eq!(preview("réviser le chapitre 3", 40), "réviser le chapitre 3");
    }

    #[test]
    fn test_preview_collapses_whitespace() {
        assert_eq!(preview("  faire\n\nles   exercices ", 40), "faire les exercices");
    }

    #[test]
    fn test_preview_cuts_on_char_boundary() {
        // 'é' is two bytes; slicing by bytes here would panic
        let text = "éééééééééé";
        assert_eq!(preview(text, 3), "ééé…");
    }

    #[test]
    fn test_preview_trims_before_ellipsis() {
        assert_eq!(preview("une dissertation longue", 4), "une…");
    }

    #[test]
    fn test_preview_empty() {
        assert_eq!(preview("", 5), "");
    }
}
